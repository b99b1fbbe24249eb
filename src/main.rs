//! Brick tunnel: runs the tunnel background in its own window.

use bevy::prelude::*;
use tunnel_background::config;
use tunnel_background::prelude::*;

fn main() {
    let _ = dotenvy::dotenv();
    let settings = config::tunnel_settings().unwrap_or_else(|err| {
        eprintln!("bricktunnel: {err}; using default settings");
        TunnelSettings::default()
    });

    TunnelBackgroundBuilder::new()
        .settings(settings)
        .window_title("Brick Tunnel")
        .on_ready(|| info!("brick tunnel ready"))
        .build()
        .run();
}
