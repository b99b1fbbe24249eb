//! Tunnel layout: sectors around the axis, row sections along it, one brick per run.

use std::f32::consts::TAU;
use std::f64::consts::PI;

use bevy::prelude::*;
use rand::Rng;

use crate::bricks::{row_runs, AtlasSpec, BrickRun, Pattern, MAX_ATLAS_SIDE};
use crate::config::TunnelSettings;
use crate::error::TunnelError;
use crate::render::VolumeFactory;

/// Shortened from the run's full width to leave a joint.
pub const BRICK_GAP: f32 = 1.0;
/// Radial relief before jitter.
pub const BRICK_HEIGHT: f32 = 4.0;
pub const BRICK_HEIGHT_JITTER: f32 = 1.0;
/// Extent along the tunnel axis.
pub const BRICK_DEPTH: f32 = 8.0;
/// Max tilt about the tunnel axis, radians.
pub const BRICK_TILT: f32 = 0.03;

/// Rows this far in front of the camera before they wrap to the far end.
const CAMERA_CLEARANCE_ROWS: f32 = 2.0;

/// Distance from the centre of a regular `sides`-gon to the midpoint of a side
/// of length `side`.
pub fn apothem(side: f64, sides: u32) -> f64 {
    side / (2.0 * (PI / sides as f64).tan())
}

/// Validated geometry derived from [`TunnelSettings`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TunnelGeometry {
    pub sector_count: u32,
    pub row_count: u32,
    pub unit_size: f32,
    pub max_run_length: u32,
    /// Unit cells per row: one less than the longest run.
    pub row_cells: u32,
    pub row_width: f32,
    pub radius: f32,
    pub angular_step: f32,
    /// Axial length of the whole tunnel; scroll positions wrap at this.
    pub period: f32,
}

impl TunnelGeometry {
    pub fn new(settings: &TunnelSettings) -> Result<Self, TunnelError> {
        if settings.sector_count < 3 {
            return Err(TunnelError::TooFewSectors(settings.sector_count));
        }
        if settings.row_count == 0 {
            return Err(TunnelError::NonPositive { field: "row_count" });
        }
        if !(settings.unit_size.is_finite() && settings.unit_size > 0.0) {
            return Err(TunnelError::NonPositive { field: "unit_size" });
        }
        if settings.max_run_length < 2 {
            return Err(TunnelError::RunTooShort(settings.max_run_length));
        }
        if !settings.scroll_step.is_finite() {
            return Err(TunnelError::NonFinite {
                field: "scroll_step",
            });
        }
        if !settings.rotation_speed.is_finite() {
            return Err(TunnelError::NonFinite {
                field: "rotation_speed",
            });
        }

        let row_cells = settings.max_run_length - 1;
        let row_width = row_cells as f32 * settings.unit_size;
        let geometry = Self {
            sector_count: settings.sector_count,
            row_count: settings.row_count,
            unit_size: settings.unit_size,
            max_run_length: settings.max_run_length,
            row_cells,
            row_width,
            radius: apothem(row_width as f64, settings.sector_count) as f32,
            angular_step: TAU / settings.sector_count as f32,
            period: settings.row_count as f32 * settings.unit_size,
        };
        // Also bounds sector and row counts, so later products cannot overflow.
        if geometry.atlas_spec().dimensions().is_none() {
            return Err(TunnelError::AtlasTooLarge {
                max: MAX_ATLAS_SIDE,
            });
        }
        Ok(geometry)
    }

    pub fn sector_rotation(&self, index: u32) -> Quat {
        Quat::from_rotation_z(self.angular_step * index as f32)
    }

    pub fn row_base_z(&self, row: u32) -> f32 {
        row as f32 * self.unit_size
    }

    /// Where the root sits on the axis so the camera at the origin looks into it.
    pub fn root_z(&self) -> f32 {
        -(self.period - CAMERA_CLEARANCE_ROWS * self.unit_size)
    }

    pub fn atlas_spec(&self) -> AtlasSpec {
        AtlasSpec {
            sector_count: self.sector_count,
            row_count: self.row_count,
            unit_px: (self.unit_size.round() as u32).max(1),
            max_run_length: self.max_run_length,
        }
    }
}

#[derive(Component)]
pub struct TunnelRoot;

/// One angular slice of the tunnel.
#[derive(Component, Clone, Copy, Debug)]
pub struct SectorNode {
    pub index: u32,
}

/// One course of bricks within a sector. Only `Transform::translation.z`
/// changes after spawn.
#[derive(Component, Clone, Copy, Debug)]
pub struct RowSection {
    pub sector: u32,
    pub row: u32,
    pub base_z: f32,
}

#[derive(Component, Clone, Copy, Debug)]
pub struct Brick {
    pub run: BrickRun,
    pub size: Vec3,
}

/// Entities produced by [`build_tunnel`].
pub struct TunnelLayout {
    pub root: Entity,
    pub row_sections: Vec<Entity>,
}

/// Spawns the tunnel hierarchy under `parent`.
///
/// Every (sector, row) gets its own partition, independent of the one painted
/// into the atlas for the same cell.
#[allow(clippy::too_many_arguments)]
pub fn build_tunnel<R: Rng + ?Sized>(
    commands: &mut Commands,
    parent: Entity,
    geometry: &TunnelGeometry,
    pattern: &Pattern,
    rng: &mut R,
    material: &Handle<StandardMaterial>,
    meshes: &mut Assets<Mesh>,
    volumes: &dyn VolumeFactory,
) -> TunnelLayout {
    let root = commands
        .spawn((
            TunnelRoot,
            Transform::from_xyz(0.0, 0.0, geometry.root_z()),
            Visibility::default(),
        ))
        .set_parent(parent)
        .id();

    let mut row_sections = Vec::with_capacity((geometry.sector_count * geometry.row_count) as usize);
    commands.entity(root).with_children(|tunnel| {
        for sector in 0..geometry.sector_count {
            tunnel
                .spawn((
                    SectorNode { index: sector },
                    Transform::from_rotation(geometry.sector_rotation(sector)),
                    Visibility::default(),
                ))
                .with_children(|slice| {
                    for row in 0..geometry.row_count {
                        let runs = row_runs(
                            &mut *rng,
                            sector,
                            row,
                            pattern,
                            geometry.row_cells,
                            geometry.max_run_length,
                        );
                        let base_z = geometry.row_base_z(row);
                        let section = slice
                            .spawn((
                                RowSection {
                                    sector,
                                    row,
                                    base_z,
                                },
                                Transform::from_xyz(0.0, -geometry.radius, base_z),
                                Visibility::default(),
                            ))
                            .with_children(|course| {
                                for run in &runs {
                                    spawn_brick(
                                        course,
                                        geometry,
                                        run,
                                        &mut *rng,
                                        material,
                                        meshes,
                                        volumes,
                                    );
                                }
                            })
                            .id();
                        row_sections.push(section);
                    }
                });
        }
    });

    TunnelLayout { root, row_sections }
}

#[allow(clippy::too_many_arguments)]
fn spawn_brick<R: Rng + ?Sized>(
    course: &mut ChildBuilder,
    geometry: &TunnelGeometry,
    run: &BrickRun,
    rng: &mut R,
    material: &Handle<StandardMaterial>,
    meshes: &mut Assets<Mesh>,
    volumes: &dyn VolumeFactory,
) {
    let unit = geometry.unit_size;
    let height = BRICK_HEIGHT + rng.gen_range(-BRICK_HEIGHT_JITTER..=BRICK_HEIGHT_JITTER);
    let size = Vec3::new(
        run.width_units as f32 * unit - BRICK_GAP,
        height,
        BRICK_DEPTH,
    );
    let center = run.start_offset_units + run.width_units as f32 / 2.0;
    let x = -geometry.row_width / 2.0 + center * unit;
    let tilt = rng.gen_range(-BRICK_TILT..=BRICK_TILT);

    course.spawn((
        Brick { run: *run, size },
        Mesh3d(volumes.brick_mesh(meshes, size)),
        MeshMaterial3d(material.clone()),
        Transform::from_xyz(x, height / 2.0, 0.0).with_rotation(Quat::from_rotation_z(tilt)),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::CuboidVolumes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings(sector_count: u32) -> TunnelSettings {
        TunnelSettings {
            sector_count,
            ..TunnelSettings::default()
        }
    }

    #[test]
    fn apothem_matches_closed_form() {
        for sides in [3, 5, 6, 8] {
            let expected = 250.0 / (2.0 * (PI / sides as f64).tan());
            assert!((apothem(250.0, sides) - expected).abs() < 1e-9, "sides={sides}");
        }
    }

    #[test]
    fn hexagon_apothem_is_side_times_half_root_three() {
        assert!((apothem(250.0, 6) - 250.0 * 3f64.sqrt() / 2.0).abs() < 1e-9);
    }

    #[test]
    fn geometry_derives_radius_and_period() {
        let geometry = TunnelGeometry::new(&settings(5)).unwrap();

        assert_eq!(geometry.row_cells, 5);
        assert_eq!(geometry.row_width, 50.0);
        assert_eq!(geometry.period, 240.0);
        assert!((geometry.radius as f64 - apothem(50.0, 5)).abs() < 1e-4);
        assert!((geometry.angular_step * 5.0 - TAU).abs() < 1e-6);
    }

    #[test]
    fn fewer_than_three_sectors_is_rejected() {
        for sectors in [0, 1, 2] {
            assert!(matches!(
                TunnelGeometry::new(&settings(sectors)),
                Err(TunnelError::TooFewSectors(n)) if n == sectors
            ));
        }
    }

    #[test]
    fn degenerate_rows_and_runs_are_rejected() {
        let no_rows = TunnelSettings {
            row_count: 0,
            ..TunnelSettings::default()
        };
        let short_runs = TunnelSettings {
            max_run_length: 1,
            ..TunnelSettings::default()
        };
        let zero_unit = TunnelSettings {
            unit_size: 0.0,
            ..TunnelSettings::default()
        };

        assert!(matches!(
            TunnelGeometry::new(&no_rows),
            Err(TunnelError::NonPositive { field: "row_count" })
        ));
        assert!(matches!(
            TunnelGeometry::new(&short_runs),
            Err(TunnelError::RunTooShort(1))
        ));
        assert!(matches!(
            TunnelGeometry::new(&zero_unit),
            Err(TunnelError::NonPositive { field: "unit_size" })
        ));
    }

    #[test]
    fn non_finite_motion_is_rejected() {
        for value in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let step = TunnelSettings {
                scroll_step: value,
                ..TunnelSettings::default()
            };
            let rotation = TunnelSettings {
                rotation_speed: value,
                ..TunnelSettings::default()
            };

            assert!(matches!(
                TunnelGeometry::new(&step),
                Err(TunnelError::NonFinite {
                    field: "scroll_step"
                })
            ));
            assert!(matches!(
                TunnelGeometry::new(&rotation),
                Err(TunnelError::NonFinite {
                    field: "rotation_speed"
                })
            ));
        }
    }

    #[test]
    fn oversized_settings_are_rejected_before_allocation() {
        let overflowing = TunnelSettings {
            unit_size: 100_000.0,
            max_run_length: 100_000,
            ..TunnelSettings::default()
        };
        let huge_unit = TunnelSettings {
            unit_size: 1e30,
            ..TunnelSettings::default()
        };
        let too_many_rows = TunnelSettings {
            row_count: u32::MAX,
            ..TunnelSettings::default()
        };
        let too_many_sectors = TunnelSettings {
            sector_count: u32::MAX,
            ..TunnelSettings::default()
        };

        for settings in [overflowing, huge_unit, too_many_rows, too_many_sectors] {
            assert!(matches!(
                TunnelGeometry::new(&settings),
                Err(TunnelError::AtlasTooLarge { max: MAX_ATLAS_SIDE })
            ));
        }
    }

    fn spawn_tunnel(app: &mut App, geometry: TunnelGeometry) -> TunnelLayout {
        let mut rng = StdRng::seed_from_u64(17);
        let pattern = Pattern::random(&mut rng, geometry.row_count);
        spawn_tunnel_with(app, geometry, &pattern, &mut rng)
    }

    fn spawn_tunnel_with(
        app: &mut App,
        geometry: TunnelGeometry,
        pattern: &Pattern,
        rng: &mut StdRng,
    ) -> TunnelLayout {
        let world = app.world_mut();
        let parent = world.spawn_empty().id();
        let material = Handle::<StandardMaterial>::default();
        let mut meshes = Assets::<Mesh>::default();

        let mut queue = bevy::ecs::world::CommandQueue::default();
        let mut commands = Commands::new(&mut queue, world);
        let layout = build_tunnel(
            &mut commands,
            parent,
            &geometry,
            pattern,
            rng,
            &material,
            &mut meshes,
            &CuboidVolumes,
        );
        queue.apply(world);
        layout
    }

    #[test]
    fn hierarchy_has_sectors_rows_and_exact_bricks() {
        let geometry = TunnelGeometry::new(&settings(6)).unwrap();
        let mut app = App::new();
        let layout = spawn_tunnel(&mut app, geometry);
        let world = app.world_mut();

        assert_eq!(layout.row_sections.len(), 6 * 24);
        assert_eq!(world.query::<&SectorNode>().iter(world).count(), 6);

        let root_children = world.get::<Children>(layout.root).unwrap();
        assert_eq!(root_children.len(), 6);

        for &section in &layout.row_sections {
            let children = world.get::<Children>(section).unwrap().to_vec();
            let cells: u32 = children
                .iter()
                .map(|&brick| world.get::<Brick>(brick).unwrap().run.width_units)
                .sum();
            assert_eq!(cells, geometry.row_cells);

            let transform = world.get::<Transform>(section).unwrap();
            assert_eq!(transform.translation.y, -geometry.radius);
        }
    }

    #[test]
    fn sectors_step_evenly_around_the_axis() {
        let geometry = TunnelGeometry::new(&settings(8)).unwrap();
        let mut app = App::new();
        spawn_tunnel(&mut app, geometry);
        let world = app.world_mut();

        for (sector, transform) in world.query::<(&SectorNode, &Transform)>().iter(world) {
            let (axis, angle) = transform.rotation.to_axis_angle();
            let expected = geometry.angular_step * sector.index as f32;
            if sector.index == 0 {
                assert!(angle.abs() < 1e-5);
            } else {
                assert!((axis.z - 1.0).abs() < 1e-5);
                assert!((angle - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn bricks_are_sized_from_their_runs() {
        let geometry = TunnelGeometry::new(&settings(5)).unwrap();
        let mut app = App::new();
        spawn_tunnel(&mut app, geometry);
        let world = app.world_mut();

        for brick in world.query::<&Brick>().iter(world) {
            let expected_width = brick.run.width_units as f32 * geometry.unit_size - BRICK_GAP;
            assert_eq!(brick.size.x, expected_width);
            assert_eq!(brick.size.z, BRICK_DEPTH);
            assert!((brick.size.y - BRICK_HEIGHT).abs() <= BRICK_HEIGHT_JITTER + 1e-6);
        }
    }

    #[test]
    fn bricks_follow_the_running_bond_cursor() {
        let geometry = TunnelGeometry::new(&settings(5)).unwrap();
        let bits = (0..geometry.row_count).map(|row| row % 2 == 1).collect();
        let pattern = Pattern::new(bits);
        let mut app = App::new();
        let layout = spawn_tunnel_with(
            &mut app,
            geometry,
            &pattern,
            &mut StdRng::seed_from_u64(29),
        );
        let world = app.world_mut();

        for &section in &layout.row_sections {
            let row = world.get::<RowSection>(section).unwrap().row;
            let offset = if row % 2 == 1 { 0.5 } else { 0.0 };
            let mut cursor = offset;
            let children = world.get::<Children>(section).unwrap().to_vec();
            assert!(!children.is_empty());

            for &entity in &children {
                let brick = world.get::<Brick>(entity).unwrap();
                let transform = world.get::<Transform>(entity).unwrap();
                let width = brick.run.width_units as f32;
                assert_eq!(brick.run.start_offset_units, cursor);

                let expected_x =
                    -geometry.row_width / 2.0 + (cursor + width / 2.0) * geometry.unit_size;
                assert!((transform.translation.x - expected_x).abs() < 1e-4);
                assert!((transform.translation.y - brick.size.y / 2.0).abs() < 1e-6);
                assert_eq!(transform.translation.z, 0.0);

                let (axis, angle) = transform.rotation.to_axis_angle();
                assert!(angle <= BRICK_TILT + 1e-4);
                if angle > 1e-4 {
                    assert!((axis.z.abs() - 1.0).abs() < 1e-3);
                }
                cursor += width;
            }
            assert_eq!(cursor, offset + geometry.row_cells as f32);
        }
    }
}
