//! UI overlay using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use mocap_core::{PlayerId, SourceStatus};
use mocap_scene::skeleton::player_color;
use mocap_scene::Session;

const DEFAULT_TITLE: &str = "Motion Capture";

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn ui_system(mut contexts: EguiContexts, mut session: ResMut<Session>) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let title = session
        .config()
        .title
        .clone()
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    egui::Window::new(title)
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(8.0, 8.0))
        .resizable(false)
        .default_open(true)
        .show(ctx, |ui| {
            sources_section(ui, &session);
            ui.separator();
            playback_section(ui, &mut session);
            ui.separator();
            camera_section(ui, &mut session);
        });
}

fn sources_section(ui: &mut egui::Ui, session: &Session) {
    ui.label(egui::RichText::new("Sources").strong());
    for (url, status) in session.sources() {
        ui.horizontal(|ui| {
            match status {
                SourceStatus::Loading => {
                    ui.spinner();
                    ui.label(url);
                }
                SourceStatus::Loaded(id) => {
                    ui.colored_label(player_color32(*id), "●");
                    ui.label(url);
                }
                SourceStatus::Failed(reason) => {
                    ui.colored_label(egui::Color32::RED, "✖");
                    ui.label(url).on_hover_text(reason);
                }
            }
        });
    }
}

fn playback_section(ui: &mut egui::Ui, session: &mut Session) {
    let coordinator = session.coordinator();
    match coordinator.reference_time() {
        Some(time) => ui.label(format!("Time: {:.2} s ({:?} sync)", time, coordinator.policy())),
        None if coordinator.is_empty() => ui.label("Waiting for animations..."),
        None => ui.label(format!("{} independent players", coordinator.len())),
    };

    let running = session.is_running();
    let label = if running { "⏸ Pause" } else { "▶ Play" };
    if ui.button(label).clicked() {
        if running {
            session.stop();
        } else {
            session.start();
        }
    }
}

fn camera_section(ui: &mut egui::Ui, session: &mut Session) {
    let mut auto_rotate = session.orbit().auto_rotate();
    if ui.checkbox(&mut auto_rotate, "Auto-rotate").changed() {
        session.orbit_mut().set_auto_rotate(auto_rotate);
        tracing::info!("Auto-rotate {}", if auto_rotate { "on" } else { "off" });
    }
    if ui.button("Reset camera").clicked() {
        session.reset_camera();
        tracing::info!("Camera reset");
    }
}

fn player_color32(id: PlayerId) -> egui::Color32 {
    let color = player_color(id).to_srgba();
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgb(channel(color.red), channel(color.green), channel(color.blue))
}
