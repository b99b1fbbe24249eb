//! Shared brick material built from the painted atlas.

use bevy::prelude::*;

use crate::bricks::BrickAtlas;

/// Uploads the atlas once and wraps it in the material every brick shares.
pub fn brick_material(
    materials: &mut Assets<StandardMaterial>,
    images: &mut Assets<Image>,
    atlas: BrickAtlas,
) -> Handle<StandardMaterial> {
    let texture = images.add(atlas.into_image());
    materials.add(StandardMaterial {
        base_color_texture: Some(texture),
        perceptual_roughness: 0.9,
        reflectance: 0.1,
        ..default()
    })
}
