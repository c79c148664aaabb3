//! Viewer session
//!
//! Owns everything one page view needs: configuration, the playback
//! coordinator, the orbit camera, camera persistence and the frame loop.
//! The renderer calls [`ViewerSession::drain_queue`] and
//! [`ViewerSession::frame`] once per display frame and reads poses back.

use crate::camera_store::{CameraPose, CameraStateStore, KeyValueStore};
use crate::config::DisplayConfig;
use crate::frame_loop::FrameLoop;
use crate::loader::{LoadOutcome, LoadQueue};
use crate::orbit::OrbitController;
use crate::playback::{AnimationPlayer, PlaybackCoordinator, PlayerId};

/// Load state of one configured source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Loading,
    Loaded(PlayerId),
    Failed(String),
}

/// What happened during one frame step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    /// Seconds every player advanced by
    pub delta: f64,
    /// The orbit controller moved the camera (and its pose was saved)
    pub camera_changed: bool,
}

pub struct ViewerSession<S: KeyValueStore> {
    config: DisplayConfig,
    coordinator: PlaybackCoordinator,
    orbit: OrbitController,
    camera_store: CameraStateStore<S>,
    frame_loop: FrameLoop,
    sources: Vec<(String, SourceStatus)>,
    aspect: f32,
}

impl<S: KeyValueStore> ViewerSession<S> {
    /// Start a session, restoring the saved camera position if there is one
    pub fn new(config: DisplayConfig, store: S) -> Self {
        let camera_store = CameraStateStore::new(store);
        let mut orbit = config.orbit_controller();
        match camera_store.load() {
            Some(pose) => {
                tracing::info!("Restoring saved camera at {:?}", pose.position);
                orbit.set_position(pose.position);
            }
            None => tracing::debug!("No saved camera, using default placement"),
        }

        let sources = config
            .sources
            .iter()
            .map(|url| (url.clone(), SourceStatus::Loading))
            .collect();

        Self {
            coordinator: PlaybackCoordinator::new(config.sync_policy),
            config,
            orbit,
            camera_store,
            frame_loop: FrameLoop::running(),
            sources,
            aspect: 1.0,
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn orbit(&self) -> &OrbitController {
        &self.orbit
    }

    pub fn orbit_mut(&mut self) -> &mut OrbitController {
        &mut self.orbit
    }

    pub fn camera_store(&self) -> &CameraStateStore<S> {
        &self.camera_store
    }

    /// Configured sources with their load status, in configuration order
    pub fn sources(&self) -> &[(String, SourceStatus)] {
        &self.sources
    }

    /// Record a finished load, registering a player on success
    pub fn on_load_complete(&mut self, outcome: LoadOutcome) -> Option<PlayerId> {
        let LoadOutcome { index, url, result } = outcome;
        let (status, id) = match result {
            Ok(loaded) => {
                let player = AnimationPlayer::new(loaded.url, loaded.skeleton, loaded.clip);
                let id = self.coordinator.register(player);
                (SourceStatus::Loaded(id), Some(id))
            }
            Err(e) => {
                tracing::error!("Failed to load animation {}: {}", url, e);
                (SourceStatus::Failed(e.to_string()), None)
            }
        };

        match self.sources.get_mut(index) {
            Some(entry) => entry.1 = status,
            None => {
                tracing::warn!("Load completion for unknown source #{} ({})", index, url);
                self.sources.push((url, status));
            }
        }
        id
    }

    /// Register everything that finished loading since the last frame
    pub fn drain_queue(&mut self, queue: &LoadQueue) -> Vec<PlayerId> {
        queue
            .drain()
            .into_iter()
            .filter_map(|outcome| self.on_load_complete(outcome))
            .collect()
    }

    /// Run one frame step at timestamp `now` (seconds).
    ///
    /// Returns `None` while the loop is stopped.
    pub fn frame(&mut self, now: f64) -> Option<FrameOutput> {
        let delta = self.frame_loop.step(now)?;
        if !self.coordinator.is_empty() {
            self.coordinator.tick(delta);
        }

        let camera_changed = self.orbit.update(delta as f32);
        if camera_changed {
            self.save_camera();
        }
        Some(FrameOutput { delta, camera_changed })
    }

    /// Track a viewport resize and return the new aspect ratio.
    /// Zero-sized viewports (e.g. a hidden tab) are ignored.
    pub fn resize(&mut self, width: f32, height: f32) -> Option<f32> {
        if !(width > 0.0 && height > 0.0) {
            return None;
        }
        self.aspect = width / height;
        Some(self.aspect)
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn camera_pose(&self) -> CameraPose {
        self.orbit.pose()
    }

    pub fn start(&mut self) {
        self.frame_loop.start();
    }

    pub fn stop(&mut self) {
        self.frame_loop.stop();
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Forget the saved camera and return to the initial placement
    pub fn reset_camera(&mut self) {
        if let Err(e) = self.camera_store.clear() {
            tracing::warn!("Failed to clear saved camera: {}", e);
        }
        self.orbit.target = DisplayConfig::CAMERA_TARGET;
        self.orbit.set_position(self.config.initial_camera_position());
    }

    fn save_camera(&mut self) {
        let pose = self.orbit.pose();
        if let Err(e) = self.camera_store.save(&pose) {
            tracing::warn!("Failed to save camera: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use glam::Vec3;

    use crate::bvh::Bvh;
    use crate::camera_store::{MemoryStore, POSITION_KEY, ROTATION_KEY};
    use crate::loader::{LoadError, LoadedSource};

    const STEP: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0 90 0
  CHANNELS 3 Xposition Yposition Zposition
  End Site
  {
    OFFSET 0 10 0
  }
}
MOTION
Frames: 3
Frame Time: 1.0
0 0 0
10 0 0
20 0 0
";

    fn loaded(index: usize, url: &str) -> LoadOutcome {
        let bvh = Bvh::parse(url, STEP).unwrap();
        LoadOutcome {
            index,
            url: url.to_string(),
            result: Ok(LoadedSource {
                url: url.to_string(),
                skeleton: Arc::new(bvh.skeleton),
                clip: Arc::new(bvh.clip),
            }),
        }
    }

    fn session(sources: &[&str]) -> ViewerSession<MemoryStore> {
        let config = DisplayConfig::new(sources.iter().map(|s| s.to_string()).collect());
        ViewerSession::new(config, MemoryStore::new())
    }

    fn player_time(session: &ViewerSession<MemoryStore>, id: PlayerId) -> Option<f64> {
        session.coordinator().get(id).map(|p| p.time())
    }

    #[test]
    fn test_single_source_plays() {
        let mut session = session(&["a.bvh"]);
        assert_eq!(session.sources()[0].1, SourceStatus::Loading);

        let queue = LoadQueue::new();
        queue.push(loaded(0, "a.bvh"));
        let ids = session.drain_queue(&queue);
        assert_eq!(ids, vec![PlayerId(0)]);
        assert_eq!(session.sources()[0].1, SourceStatus::Loaded(PlayerId(0)));

        assert_eq!(session.frame(10.0).map(|f| f.delta), Some(0.0));
        assert_eq!(player_time(&session, PlayerId(0)), Some(0.0));
        session.frame(10.5);
        assert_eq!(player_time(&session, PlayerId(0)), Some(0.5));
    }

    #[test]
    fn test_late_source_joins_reference_time() {
        let mut session = session(&["a.bvh", "b.bvh"]);
        let queue = LoadQueue::new();

        queue.push(loaded(0, "a.bvh"));
        session.drain_queue(&queue);
        for now in [0.0, 0.5, 1.0, 1.5, 2.0] {
            session.frame(now);
        }
        assert_eq!(player_time(&session, PlayerId(0)), Some(2.0));

        queue.push(loaded(1, "b.bvh"));
        let ids = session.drain_queue(&queue);
        assert_eq!(ids, vec![PlayerId(1)]);
        assert_eq!(player_time(&session, PlayerId(1)), Some(2.0));

        session.frame(2.5);
        assert_eq!(player_time(&session, PlayerId(0)), Some(2.5));
        assert_eq!(player_time(&session, PlayerId(1)), Some(2.5));
    }

    #[test]
    fn test_failed_source_registers_nothing() {
        let mut session = session(&["a.bvh", "b.bvh"]);
        let queue = LoadQueue::new();
        queue.push(LoadOutcome {
            index: 0,
            url: "a.bvh".to_string(),
            result: Err(LoadError::Http {
                url: "a.bvh".to_string(),
                status: 404,
                status_text: "Not Found".to_string(),
            }),
        });
        queue.push(loaded(1, "b.bvh"));

        let ids = session.drain_queue(&queue);
        assert_eq!(ids, vec![PlayerId(0)]);
        assert_eq!(session.coordinator().len(), 1);
        assert!(matches!(session.sources()[0].1, SourceStatus::Failed(_)));
        assert_eq!(session.sources()[1].1, SourceStatus::Loaded(PlayerId(0)));
    }

    #[test]
    fn test_completion_for_unknown_index_is_appended() {
        let mut session = session(&["a.bvh"]);
        let queue = LoadQueue::new();
        queue.push(loaded(5, "extra.bvh"));

        assert_eq!(session.drain_queue(&queue), vec![PlayerId(0)]);
        assert_eq!(session.sources().len(), 2);
        assert_eq!(session.sources()[0].1, SourceStatus::Loading);
        assert_eq!(
            session.sources()[1],
            ("extra.bvh".to_string(), SourceStatus::Loaded(PlayerId(0)))
        );
    }

    #[test]
    fn test_camera_change_is_saved_and_restored() {
        let mut session = session(&["a.bvh"]);
        session.frame(0.0);
        assert!(session.camera_store().store().is_empty());

        session.orbit_mut().enable_damping = false;
        session.orbit_mut().rotate(100.0, 0.0, 600.0);
        let output = session.frame(0.1);
        assert_eq!(output.map(|f| f.camera_changed), Some(true));
        assert!(session.camera_store().store().get(POSITION_KEY).unwrap().is_some());
        assert!(session.camera_store().store().get(ROTATION_KEY).unwrap().is_some());

        let moved = session.orbit().position();
        let store = session.camera_store().store().clone();
        let restored = ViewerSession::new(DisplayConfig::new(vec!["a.bvh".to_string()]), store);
        assert!(restored.orbit().position().distance(moved) < 1e-2);
    }

    #[test]
    fn test_position_only_store_uses_default_pose() {
        let mut store = MemoryStore::new();
        store.set(POSITION_KEY, r#"{"x":5,"y":5,"z":5}"#).unwrap();
        let session = ViewerSession::new(DisplayConfig::new(vec!["a.bvh".to_string()]), store);
        assert!(session.orbit().position().distance(DisplayConfig::DEFAULT_CAMERA_POSITION) < 1e-3);
    }

    #[test]
    fn test_auto_rotate_session() {
        let mut config = DisplayConfig::new(vec!["a.bvh".to_string()]);
        config.auto_rotate = true;
        let mut session = ViewerSession::new(config, MemoryStore::new());

        assert!(session.orbit().auto_rotate());
        assert!(session.orbit().position().distance(DisplayConfig::DEFAULT_CAMERA_POSITION) > 1.0);
        assert!(session.orbit().position().distance(Vec3::new(250.0, 150.0, 250.0)) < 1e-3);

        session.frame(0.0);
        let output = session.frame(1.0 / 60.0);
        assert_eq!(output.map(|f| f.camera_changed), Some(true));
    }

    #[test]
    fn test_stopped_session_is_frozen() {
        let mut session = session(&["a.bvh"]);
        let queue = LoadQueue::new();
        queue.push(loaded(0, "a.bvh"));
        session.drain_queue(&queue);
        session.frame(0.0);
        session.frame(1.0);

        session.stop();
        assert!(!session.is_running());
        assert_eq!(session.frame(5.0), None);
        assert_eq!(player_time(&session, PlayerId(0)), Some(1.0));

        session.start();
        session.frame(6.0);
        session.frame(6.5);
        assert_eq!(player_time(&session, PlayerId(0)), Some(1.5));
    }

    #[test]
    fn test_resize_and_reset() {
        let mut session = session(&["a.bvh"]);
        assert_eq!(session.resize(800.0, 400.0), Some(2.0));
        assert_eq!(session.resize(0.0, 400.0), None);
        assert_eq!(session.aspect(), 2.0);

        session.orbit_mut().enable_damping = false;
        session.orbit_mut().rotate(50.0, 20.0, 600.0);
        session.frame(0.0);
        assert!(!session.camera_store().store().is_empty());

        session.reset_camera();
        assert!(session.camera_store().store().is_empty());
        assert!(session.orbit().position().distance(DisplayConfig::DEFAULT_CAMERA_POSITION) < 1e-3);
        assert_eq!(session.frame(0.1).map(|f| f.camera_changed), Some(false));
    }
}
