//! Brick courses: running-bond pattern, row partitioning, and the texture atlas.

mod atlas;
mod partition;

use rand::Rng;

pub use atlas::{AtlasSpec, BrickAtlas, BRICK_RGBA, MAX_ATLAS_SIDE, MORTAR_PX, MORTAR_RGBA};
pub use partition::partition_row;

/// Per-row running-bond offsets: `true` starts the row half a unit in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern(Vec<bool>);

impl Pattern {
    pub fn new(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    /// Draws one fair bit per row.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, rows: u32) -> Self {
        Self((0..rows).map(|_| rng.gen_bool(0.5)).collect())
    }

    /// Whether `row` is offset by half a unit. Rows past the end wrap around.
    pub fn is_offset(&self, row: u32) -> bool {
        if self.0.is_empty() {
            return false;
        }
        self.0[row as usize % self.0.len()]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One contiguous span of unit cells within a row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrickRun {
    pub column: u32,
    pub row: u32,
    /// Distance from the column's left edge, in units, including the bond offset.
    pub start_offset_units: f32,
    pub width_units: u32,
}

/// Partitions one row of one column and lays the runs out left to right.
pub fn row_runs<R: Rng + ?Sized>(
    rng: &mut R,
    column: u32,
    row: u32,
    pattern: &Pattern,
    row_cells: u32,
    max_run_length: u32,
) -> Vec<BrickRun> {
    let mut cursor = if pattern.is_offset(row) { 0.5 } else { 0.0 };
    partition_row(rng, row_cells, max_run_length)
        .into_iter()
        .map(|width_units| {
            let run = BrickRun {
                column,
                row,
                start_offset_units: cursor,
                width_units,
            };
            cursor += width_units as f32;
            run
        })
        .collect()
}
