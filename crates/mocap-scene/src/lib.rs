//! Mocap Scene - Bevy rendering for the motion-capture viewer
//!
//! Hosts a [`mocap_core::ViewerSession`] as a resource and drives it from
//! Bevy's frame schedule:
//! - scene setup (camera, grid, light, background) and viewport tracking
//! - orbit camera input and camera transform updates
//! - one bone hierarchy per registered player, posed every frame

pub mod camera;
pub mod scene;
pub mod skeleton;
pub mod types;

use bevy::prelude::*;

/// Plugin that drives the viewer session and renders its state.
///
/// Expects a [`Session`] and a [`PendingLoads`] resource to be inserted
/// before startup.
pub struct MocapScenePlugin;

impl Plugin for MocapScenePlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (ViewerSet::Load, ViewerSet::Input, ViewerSet::Advance, ViewerSet::Apply).chain(),
        )
        .add_systems(Update, drain_pending_loads.in_set(ViewerSet::Load))
        .add_systems(Update, advance_session.in_set(ViewerSet::Advance))
        .add_plugins(scene::SceneSetupPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(skeleton::SkeletonPlugin);
    }
}

/// Register players for every load that completed since the last frame
fn drain_pending_loads(mut session: ResMut<Session>, pending: Res<PendingLoads>) {
    if pending.is_empty() {
        return;
    }
    let registered = session.drain_queue(&pending);
    if !registered.is_empty() {
        tracing::info!("{} player(s) active", session.coordinator().len());
    }
}

/// Step the session clock: advance players, update the orbit camera and persist changes
fn advance_session(mut session: ResMut<Session>, time: Res<Time<Real>>) {
    session.frame(time.elapsed_secs_f64());
}

pub use camera::MainCamera;
pub use types::*;
