//! Brick volume construction: trait seam and the default cuboid implementation.

mod cuboids;

use bevy::prelude::*;

pub use cuboids::CuboidVolumes;

/// Builds the mesh for one brick of the given width, height and depth.
pub trait VolumeFactory: Send + Sync + 'static {
    fn brick_mesh(&self, meshes: &mut Assets<Mesh>, size: Vec3) -> Handle<Mesh>;
}

#[derive(Resource)]
pub struct VolumeFactoryResource(pub Box<dyn VolumeFactory>);

impl VolumeFactoryResource {
    pub fn new(volumes: impl VolumeFactory) -> Self {
        Self(Box::new(volumes))
    }
}

impl Default for VolumeFactoryResource {
    fn default() -> Self {
        Self::new(CuboidVolumes)
    }
}
