//! Brick tunnel background: a procedurally generated, endlessly scrolling
//! 3D tunnel rendered behind the rest of an app.
//!
//! Library root: generation, scene, lifecycle, and config modules.

pub mod bricks;
pub mod config;
pub mod error;
pub mod render;
pub mod scene;
mod ui;
pub mod viewport;

pub mod prelude;
pub mod sdk;

pub use config::TunnelSettings;
pub use error::{ConfigError, TunnelError};
pub use sdk::TunnelBackgroundBuilder;
pub use ui::overlay_plugin;
pub use viewport::{tunnel_plugin, BackgroundState, HostSubscriptions, TunnelInstance};
