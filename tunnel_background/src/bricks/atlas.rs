//! Shared brick texture: one column of courses per sector, painted once.

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use rand::Rng;

use super::{row_runs, BrickRun, Pattern};

/// Grout between painted bricks, in pixels on every side.
pub const MORTAR_PX: u32 = 1;
pub const MORTAR_RGBA: [u8; 4] = [46, 40, 38, 255];
pub const BRICK_RGBA: [u8; 4] = [156, 74, 52, 255];
/// Largest atlas side accepted, in pixels.
pub const MAX_ATLAS_SIDE: u32 = 8192;

/// Dimensions of the atlas to paint.
#[derive(Clone, Copy, Debug)]
pub struct AtlasSpec {
    pub sector_count: u32,
    pub row_count: u32,
    /// Pixels per unit cell.
    pub unit_px: u32,
    pub max_run_length: u32,
}

impl AtlasSpec {
    /// Width of one sector's column. Sized from the maximum run length, not
    /// from the longest run actually drawn.
    pub fn column_width(&self) -> u32 {
        self.max_run_length
            .saturating_sub(1)
            .saturating_mul(self.unit_px)
    }

    pub fn width(&self) -> u32 {
        self.sector_count.saturating_mul(self.column_width())
    }

    pub fn height(&self) -> u32 {
        self.row_count.saturating_mul(self.unit_px)
    }

    /// `(width, height)` if neither overflows nor exceeds [`MAX_ATLAS_SIDE`].
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let column = self.max_run_length.checked_sub(1)?.checked_mul(self.unit_px)?;
        let width = self.sector_count.checked_mul(column)?;
        let height = self.row_count.checked_mul(self.unit_px)?;
        (width <= MAX_ATLAS_SIDE && height <= MAX_ATLAS_SIDE).then_some((width, height))
    }
}

/// RGBA8 raster of brick courses, row-major.
#[derive(Clone, Debug)]
pub struct BrickAtlas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl BrickAtlas {
    /// Paints every column, partitioning each (column, row) cell afresh.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, spec: &AtlasSpec, pattern: &Pattern) -> Self {
        let mut atlas = Self::filled(spec.width(), spec.height(), MORTAR_RGBA);
        let row_cells = spec.max_run_length.saturating_sub(1);

        for column in 0..spec.sector_count {
            for row in 0..spec.row_count {
                for run in row_runs(rng, column, row, pattern, row_cells, spec.max_run_length) {
                    atlas.paint_run(spec, &run);
                }
            }
        }
        atlas
    }

    fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    fn paint_run(&mut self, spec: &AtlasSpec, run: &BrickRun) {
        let unit = spec.unit_px as f32;
        let column_left = run.column * spec.column_width();
        let column_right = column_left + spec.column_width();

        let left = column_left as f32 + run.start_offset_units * unit;
        let right = left + run.width_units as f32 * unit;
        let x0 = (left.round() as u32 + MORTAR_PX).max(column_left);
        let x1 = (right.round() as u32).saturating_sub(MORTAR_PX).min(column_right);
        let y0 = run.row * spec.unit_px + MORTAR_PX;
        let y1 = ((run.row + 1) * spec.unit_px).saturating_sub(MORTAR_PX);

        self.fill_rect(x0, y0, x1, y1, BRICK_RGBA);
    }

    /// Fills `[x0, x1) x [y0, y1)`, clipped to the atlas.
    fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgba: [u8; 4]) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let i = self.index(x, y);
                self.pixels[i..i + 4].copy_from_slice(&rgba);
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[i..i + 4]);
        Some(rgba)
    }

    /// Hands the pixels to Bevy as an sRGB texture.
    pub fn into_image(self) -> Image {
        Image::new(
            Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            self.pixels,
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        )
    }
}
