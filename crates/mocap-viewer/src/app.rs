//! Bevy application setup

use bevy::prelude::*;
use bevy::winit::{UpdateMode, WinitSettings};
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use mocap_core::{DisplayConfig, ViewerSession};
use mocap_scene::{MocapScenePlugin, PendingLoads, Session};
use std::time::Duration;

use crate::file_loader::FileLoaderPlugin;
use crate::page_config::PageFields;
use crate::storage::open_store;
use crate::ui::UiPlugin;

const DEFAULT_WINDOW_TITLE: &str = "Motion Capture Viewer";
const CANVAS_SELECTOR: &str = "#mocap-canvas";

/// Run the Bevy application
pub fn run() {
    let config = match DisplayConfig::from_fields(&PageFields::from_document()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Cannot start viewer: {}", e);
            return;
        }
    };
    let title = config
        .title
        .clone()
        .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string());
    let session = ViewerSession::new(config, open_store());

    App::new()
        // Continuous rendering while playing; adjust_power_settings relaxes it when stopped
        .insert_resource(WinitSettings::default())
        .insert_resource(Session(session))
        .init_resource::<PendingLoads>()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title,
                canvas: Some(CANVAS_SELECTOR.to_string()),
                fit_canvas_to_parent: true,
                prevent_default_event_handling: false,
                ..default()
            }),
            ..default()
        }))
        // Must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(MocapScenePlugin)
        .add_plugins(FileLoaderPlugin)
        .add_plugins(UiPlugin)
        .add_systems(Update, adjust_power_settings)
        .run();
}

/// Render continuously while the frame loop runs, reactively while it is stopped
fn adjust_power_settings(
    session: Res<Session>,
    mut winit_settings: ResMut<WinitSettings>,
    mut was_running: Local<Option<bool>>,
) {
    let running = session.is_running();
    if *was_running == Some(running) {
        return;
    }
    *was_running = Some(running);

    if running {
        *winit_settings = WinitSettings::default();
    } else {
        winit_settings.focused_mode = UpdateMode::reactive_low_power(Duration::from_millis(100));
        winit_settings.unfocused_mode = UpdateMode::reactive_low_power(Duration::from_millis(500));
    }
}
