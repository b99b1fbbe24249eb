//! Overlay: mount toggle and live tunnel stats.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};

use crate::viewport::{BackgroundState, TunnelInstance};

pub fn overlay_plugin(app: &mut App) {
    app.add_plugins(EguiPlugin)
        .add_systems(Update, (toggle_background_system, overlay_system));
}

fn flipped(state: BackgroundState) -> BackgroundState {
    match state {
        BackgroundState::Mounted => BackgroundState::Unmounted,
        BackgroundState::Unmounted => BackgroundState::Mounted,
    }
}

/// `B` mounts or unmounts the background.
fn toggle_background_system(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<BackgroundState>>,
    mut next: ResMut<NextState<BackgroundState>>,
) {
    if keys.just_pressed(KeyCode::KeyB) {
        next.set(flipped(*state.get()));
    }
}

fn overlay_system(
    mut contexts: EguiContexts,
    state: Res<State<BackgroundState>>,
    mut next: ResMut<NextState<BackgroundState>>,
    instance: Option<Res<TunnelInstance>>,
) {
    egui::Window::new("Background")
        .anchor(egui::Align2::RIGHT_BOTTOM, [-10.0, -10.0])
        .resizable(false)
        .collapsible(false)
        .title_bar(false)
        .frame(
            egui::Frame::default()
                .fill(egui::Color32::from_rgba_premultiplied(15, 15, 25, 210))
                .inner_margin(egui::Margin::same(10))
                .corner_radius(egui::CornerRadius::same(6)),
        )
        .show(contexts.ctx_mut(), |ui| {
            ui.style_mut().override_text_style = Some(egui::TextStyle::Monospace);
            ui.visuals_mut().override_text_color = Some(egui::Color32::from_rgb(200, 220, 240));

            let mounted = *state.get() == BackgroundState::Mounted;
            let label = if mounted { "Hide tunnel" } else { "Show tunnel" };
            if ui.button(label).clicked() {
                next.set(flipped(*state.get()));
            }

            let Some(instance) = instance else {
                return;
            };
            let tunnel = instance.state();
            ui.add_space(4.0);
            ui.label(format!(
                "{} sectors x {} rows",
                tunnel.geometry.sector_count, tunnel.geometry.row_count
            ));
            ui.label(format!("radius  {:.1}", tunnel.geometry.radius));
            ui.label(format!(
                "scroll  {:.1}/{:.0}",
                tunnel.scroll.value(),
                tunnel.scroll.period()
            ));
        });
}
