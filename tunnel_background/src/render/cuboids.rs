use bevy::prelude::*;

use crate::render::VolumeFactory;

/// One axis-aligned box mesh per brick.
#[derive(Clone, Copy, Debug, Default)]
pub struct CuboidVolumes;

impl VolumeFactory for CuboidVolumes {
    fn brick_mesh(&self, meshes: &mut Assets<Mesh>, size: Vec3) -> Handle<Mesh> {
        meshes.add(Cuboid::new(size.x, size.y, size.z))
    }
}
