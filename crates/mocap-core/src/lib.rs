//! Mocap Core - Engine-independent logic for the motion-capture viewer
//!
//! This crate provides everything the viewer does that does not need a
//! renderer:
//! - BVH parsing into a skeleton plus a skeletal pose clip
//! - Keyframe sampling and animation players
//! - The playback coordinator that keeps independently loaded clips on one timeline
//! - Camera pose persistence over a key-value store
//! - Orbit camera controller with damping and auto-rotation
//! - Display configuration read from the hosting page
//! - The viewer session tying it all together per frame

pub mod bvh;
pub mod camera_store;
pub mod clip;
pub mod config;
pub mod frame_loop;
pub mod loader;
pub mod orbit;
pub mod playback;
pub mod session;
pub mod skeleton;

pub use bvh::{Bvh, BvhError};
pub use camera_store::{CameraPose, CameraStateStore, KeyValueStore, MemoryStore, StoreError};
pub use clip::{BoneTrack, KeyframeTrack, LoopMode, SkeletalClip};
pub use config::{ConfigError, ConfigFields, DisplayConfig};
pub use frame_loop::FrameLoop;
pub use loader::{load_source, LoadError, LoadOutcome, LoadQueue, LoadedSource, SourceFetcher};
pub use orbit::OrbitController;
pub use playback::{AnimationPlayer, PlaybackCoordinator, PlayerId, SyncPolicy};
pub use session::{FrameOutput, SourceStatus, ViewerSession};
pub use skeleton::{Bone, BoneTransform, Pose, Skeleton};
