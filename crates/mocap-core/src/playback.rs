//! Animation players and the playback coordinator
//!
//! Every successfully loaded source becomes one [`AnimationPlayer`]. The
//! [`PlaybackCoordinator`] owns all of them, advances them together each
//! frame, and starts late arrivals at the reference player's time so clips
//! loaded independently play back aligned.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clip::SkeletalClip;
use crate::skeleton::{Pose, Skeleton};

/// Index of a player in the active set (insertion order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub usize);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player-{}", self.0)
    }
}

/// Which registered player new players take their start time from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// The earliest-registered player
    #[default]
    Earliest,
    /// The most recently registered player
    Latest,
    /// No synchronization, every player starts at zero
    Independent,
}

impl SyncPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "earliest" | "first" => Some(Self::Earliest),
            "latest" | "last" => Some(Self::Latest),
            "independent" | "none" => Some(Self::Independent),
            _ => None,
        }
    }
}

/// Advances one clip on one skeleton
#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    source: String,
    skeleton: Arc<Skeleton>,
    clip: Arc<SkeletalClip>,
    time: f64,
}

impl AnimationPlayer {
    pub fn new(source: impl Into<String>, skeleton: Arc<Skeleton>, clip: Arc<SkeletalClip>) -> Self {
        Self {
            source: source.into(),
            skeleton,
            clip,
            time: 0.0,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn clip(&self) -> &Arc<SkeletalClip> {
        &self.clip
    }

    /// Playback time in seconds; grows monotonically and is never wrapped
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = if time.is_finite() { time.max(0.0) } else { 0.0 };
    }

    pub fn advance(&mut self, delta: f64) {
        self.time += delta;
    }

    /// Playback time mapped into the clip per its loop mode
    pub fn clip_time(&self) -> f32 {
        self.clip.clip_time(self.time)
    }

    /// Local bone transforms at the current time
    pub fn pose(&self) -> Pose {
        self.clip.sample(&self.skeleton, self.clip_time())
    }
}

/// Owns the active player set
#[derive(Debug, Default)]
pub struct PlaybackCoordinator {
    players: Vec<AnimationPlayer>,
    policy: SyncPolicy,
}

impl PlaybackCoordinator {
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            players: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: PlayerId) -> Option<&AnimationPlayer> {
        self.players.get(id.0)
    }

    pub fn players(&self) -> impl Iterator<Item = (PlayerId, &AnimationPlayer)> {
        self.players.iter().enumerate().map(|(i, p)| (PlayerId(i), p))
    }

    /// The player new arrivals synchronize to, if any
    pub fn reference(&self) -> Option<&AnimationPlayer> {
        match self.policy {
            SyncPolicy::Earliest => self.players.first(),
            SyncPolicy::Latest => self.players.last(),
            SyncPolicy::Independent => None,
        }
    }

    pub fn reference_time(&self) -> Option<f64> {
        self.reference().map(AnimationPlayer::time)
    }

    /// Add a player, starting it at the reference time (or zero)
    pub fn register(&mut self, mut player: AnimationPlayer) -> PlayerId {
        let start = self.reference_time().unwrap_or(0.0);
        player.set_time(start);

        let id = PlayerId(self.players.len());
        tracing::info!(
            "Registered {} for '{}' at t={:.3}s ({} bones, {:.2}s clip)",
            id,
            player.source(),
            start,
            player.skeleton().len(),
            player.clip().duration
        );
        self.players.push(player);
        id
    }

    /// Advance every registered player by the same delta
    pub fn tick(&mut self, delta: f64) {
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            tracing::warn!("Ignoring invalid frame delta {}", delta);
            0.0
        };
        for player in &mut self.players {
            player.advance(delta);
        }
    }
}
