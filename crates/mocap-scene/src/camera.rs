//! Camera controls and orbit navigation
//!
//! Pointer and touch input is queued on the session's orbit controller;
//! the controller itself is stepped with the session clock, and the
//! resulting pose is written to the camera transform afterwards.

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

use crate::types::{to_quat, to_vec3, Session, ViewerSet};

/// Pixels per zoom step for pixel-precise scrolling (touchpads)
const PIXELS_PER_SCROLL_STEP: f32 = 100.0;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, orbit_input.in_set(ViewerSet::Input))
            .add_systems(Update, apply_camera_pose.in_set(ViewerSet::Apply));
    }
}

fn orbit_input(
    mut session: ResMut<Session>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    touches: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
) {
    // Leave the pointer to egui while it is over the overlay
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);
    if egui_wants_pointer {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let height = window.height();
    let fov = session.config().camera.fov;
    let orbit = session.orbit_mut();

    let motion = mouse_motion.delta;
    if motion != Vec2::ZERO {
        if mouse_button.pressed(MouseButton::Left) {
            orbit.rotate(motion.x, motion.y, height);
        } else if mouse_button.pressed(MouseButton::Right) || mouse_button.pressed(MouseButton::Middle) {
            orbit.pan(motion.x, motion.y, height, fov);
        }
    }

    let scroll = match mouse_scroll.unit {
        MouseScrollUnit::Line => mouse_scroll.delta.y,
        MouseScrollUnit::Pixel => mouse_scroll.delta.y / PIXELS_PER_SCROLL_STEP,
    };
    if scroll != 0.0 {
        orbit.zoom(scroll);
    }

    let active: Vec<_> = touches.iter().collect();
    match active.as_slice() {
        [touch] => {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                orbit.rotate(delta.x, delta.y, height);
            }
        }
        [first, second] => {
            // Pinch to zoom
            let current = first.position().distance(second.position());
            let previous = (first.position() - first.delta()).distance(second.position() - second.delta());
            if current > 1.0 && previous > 1.0 && current != previous {
                orbit.zoom((previous / current).ln() / 0.95_f32.ln());
            }
        }
        _ => {}
    }
}

/// Place the camera where the orbit controller says
fn apply_camera_pose(session: Res<Session>, mut cameras: Query<&mut Transform, With<MainCamera>>) {
    let Ok(mut transform) = cameras.single_mut() else {
        return;
    };
    let orbit = session.orbit();
    transform.translation = to_vec3(orbit.position().to_array());
    transform.rotation = to_quat(orbit.rotation().to_array());
}
