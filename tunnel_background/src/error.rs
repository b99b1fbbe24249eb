//! Error types for tunnel construction, lifecycle and configuration.

use std::path::PathBuf;

use crate::viewport::{HostEvent, Subscription};

/// Errors raised while mounting, animating or tearing down the tunnel.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("tunnel needs at least 3 sectors, got {0}")]
    TooFewSectors(u32),
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
    #[error("max_run_length must be at least 2 so a row spans one cell, got {0}")]
    RunTooShort(u32),
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("brick atlas would exceed {max}px per side")]
    AtlasTooLarge { max: u32 },
    #[error("no primary window to mount the tunnel into")]
    NoViewport,
    #[error("{0:?} already has a live subscription")]
    AlreadySubscribed(HostEvent),
    #[error("subscription {0:?} is not the live handle")]
    StaleSubscription(Subscription),
    #[error("scroll animator cannot restart once stopped")]
    AnimatorRetired,
}

/// Errors from loading [`TunnelSettings`](crate::config::TunnelSettings).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} in {key}")]
    InvalidEnv { key: &'static str, value: String },
}
