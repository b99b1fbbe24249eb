//! SDK entry points and builder for adding the tunnel background to an app.

use std::sync::Arc;

use bevy::prelude::*;

use crate::config::{self, TunnelSettings};
use crate::render::{VolumeFactory, VolumeFactoryResource};
use crate::ui::overlay_plugin;
use crate::viewport::{tunnel_plugin, BackgroundState, ReadyCallback, ReadyFn};

/// Builder for a tunnel background, either installed into an existing app or
/// as a standalone windowed app.
pub struct TunnelBackgroundBuilder {
    settings: Option<TunnelSettings>,
    on_ready: Option<ReadyFn>,
    volumes: Option<Box<dyn VolumeFactory>>,
    window_title: String,
    window_resolution: (f32, f32),
    clear_color: Color,
    start_mounted: bool,
    enable_overlay: bool,
}

impl Default for TunnelBackgroundBuilder {
    fn default() -> Self {
        Self {
            settings: None,
            on_ready: None,
            volumes: None,
            window_title: "Brick Tunnel".to_string(),
            window_resolution: (1280.0, 720.0),
            clear_color: Color::srgb(0.03, 0.02, 0.02),
            start_mounted: true,
            enable_overlay: true,
        }
    }
}

impl TunnelBackgroundBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit settings instead of reading them from the environment.
    pub fn settings(mut self, settings: TunnelSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Called once each time the tunnel finishes mounting.
    pub fn on_ready(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Arc::new(callback));
        self
    }

    /// Provide a custom brick volume implementation.
    pub fn volumes(mut self, volumes: impl VolumeFactory) -> Self {
        self.volumes = Some(Box::new(volumes));
        self
    }

    pub fn window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    pub fn window_resolution(mut self, width: f32, height: f32) -> Self {
        self.window_resolution = (width, height);
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Leave the tunnel unmounted until the host sets [`BackgroundState::Mounted`].
    pub fn start_unmounted(mut self) -> Self {
        self.start_mounted = false;
        self
    }

    pub fn disable_overlay(mut self) -> Self {
        self.enable_overlay = false;
        self
    }

    /// Register the tunnel on an app that already has its plugins.
    ///
    /// Settings fall back to the environment, and to defaults if that fails.
    pub fn install(self, app: &mut App) {
        let settings = match self.settings {
            Some(settings) => settings,
            None => config::tunnel_settings().unwrap_or_else(|err| {
                warn!("tunnel settings: {err}; using defaults");
                TunnelSettings::default()
            }),
        };
        app.insert_resource(settings)
            .insert_resource(ReadyCallback(self.on_ready));
        if let Some(volumes) = self.volumes {
            app.insert_resource(VolumeFactoryResource(volumes));
        }
        tunnel_plugin(app);

        if self.start_mounted {
            app.world_mut()
                .resource_mut::<NextState<BackgroundState>>()
                .set(BackgroundState::Mounted);
        }
    }

    /// Build a windowed Bevy app with the tunnel as its background.
    pub fn build(self) -> App {
        let mut app = App::new();
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: self.window_title.clone(),
                resolution: self.window_resolution.into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(self.clear_color));

        let enable_overlay = self.enable_overlay;
        self.install(&mut app);
        if enable_overlay {
            app.add_plugins(overlay_plugin);
        }

        app
    }
}
