//! Tunnel settings, env parsing, and defaults.

use std::path::PathBuf;
use std::str::FromStr;

use bevy::prelude::Resource;
use serde::Deserialize;

use crate::error::ConfigError;

const CONFIG_PATH_VAR: &str = "TUNNEL_CONFIG";

/// Generation and animation parameters for one tunnel.
#[derive(Resource, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TunnelSettings {
    /// Number of angular sectors (faces of the polygonal cross-section).
    pub sector_count: u32,
    /// Number of repeating row sections along the axis.
    pub row_count: u32,
    /// Size of one unit cell, in texture pixels and world units.
    pub unit_size: f32,
    /// Longest run of cells one brick may span.
    pub max_run_length: u32,
    /// Axial distance every row section moves per frame.
    pub scroll_step: f32,
    /// Whole-tunnel spin in radians per second since mount.
    pub rotation_speed: f32,
    /// Fixed seed for the random source; `None` seeds from entropy per mount.
    pub seed: Option<u64>,
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            sector_count: 5,
            row_count: 24,
            unit_size: 10.0,
            max_run_length: 6,
            scroll_step: 0.5,
            rotation_speed: 0.05,
            seed: None,
        }
    }
}

/// Loads settings: defaults, then the JSON file named by `TUNNEL_CONFIG`,
/// then per-key `TUNNEL_*` overrides.
pub fn tunnel_settings() -> Result<TunnelSettings, ConfigError> {
    let mut settings = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => settings_from_file(PathBuf::from(path))?,
        Err(_) => TunnelSettings::default(),
    };

    if let Some(v) = env_value("TUNNEL_SECTORS")? {
        settings.sector_count = v;
    }
    if let Some(v) = env_value("TUNNEL_ROWS")? {
        settings.row_count = v;
    }
    if let Some(v) = env_value("TUNNEL_UNIT_SIZE")? {
        settings.unit_size = v;
    }
    if let Some(v) = env_value("TUNNEL_MAX_RUN")? {
        settings.max_run_length = v;
    }
    if let Some(v) = env_value("TUNNEL_SCROLL_STEP")? {
        settings.scroll_step = v;
    }
    if let Some(v) = env_value("TUNNEL_ROTATION_SPEED")? {
        settings.rotation_speed = v;
    }
    if let Some(v) = env_value("TUNNEL_SEED")? {
        settings.seed = Some(v);
    }
    Ok(settings)
}

fn settings_from_file(path: PathBuf) -> Result<TunnelSettings, ConfigError> {
    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    serde_json::from_str(&json).map_err(|source| ConfigError::Parse { path, source })
}

fn env_value<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value: raw }),
        Err(_) => Ok(None),
    }
}
