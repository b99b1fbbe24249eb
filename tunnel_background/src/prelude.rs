//! Minimal prelude for SDK consumers.

pub use crate::config::{tunnel_settings, TunnelSettings};
pub use crate::render::{CuboidVolumes, VolumeFactory};
pub use crate::sdk::TunnelBackgroundBuilder;
pub use crate::viewport::{tunnel_plugin, BackgroundState, TunnelInstance};
