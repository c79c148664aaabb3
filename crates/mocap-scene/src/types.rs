//! Shared resources and conversions between the session and Bevy

use bevy::prelude::*;
use mocap_core::{KeyValueStore, LoadQueue, ViewerSession};

/// Storage backend the session persists the camera to
pub type SessionStore = Box<dyn KeyValueStore + Send + Sync>;

/// The viewer session for this page
#[derive(Resource, Deref, DerefMut)]
pub struct Session(pub ViewerSession<SessionStore>);

/// Completed source loads waiting to be registered
#[derive(Resource, Clone, Default, Deref)]
pub struct PendingLoads(pub LoadQueue);

/// Per-frame ordering of the viewer systems
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    /// Register finished loads
    Load,
    /// Queue orbit input
    Input,
    /// Step the session
    Advance,
    /// Write poses and camera back to entities
    Apply,
}

// The core crate has its own glam; values cross over as arrays.

pub fn to_vec3(v: [f32; 3]) -> Vec3 {
    Vec3::from_array(v)
}

pub fn to_quat(q: [f32; 4]) -> Quat {
    Quat::from_array(q)
}
