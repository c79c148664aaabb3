//! Keyframe tracks and skeletal pose clips

use glam::{Quat, Vec3};

use crate::skeleton::{Pose, Skeleton};

/// Values that can be linearly blended between two keyframes
pub trait Interpolatable: Clone {
    fn interpolate_linear(a: &Self, b: &Self, t: f32) -> Self;
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(a: &Self, b: &Self, t: f32) -> Self {
        a.lerp(*b, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(a: &Self, b: &Self, t: f32) -> Self {
        a.slerp(*b, t).normalize()
    }
}

/// Time-indexed values for one property of one bone
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>) -> Self {
        Self { times, values }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty() || self.values.is_empty()
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Sample the track, holding the first/last value outside its range.
    /// Returns `None` for an empty track.
    pub fn sample(&self, time: f32) -> Option<T> {
        let len = self.times.len().min(self.values.len());
        if len == 0 {
            return None;
        }
        if len == 1 {
            return Some(self.values[0].clone());
        }

        // partition_point finds the first index where t > time, i.e. next_index
        let next_idx = self.times[..len].partition_point(|&t| t <= time);
        if next_idx == 0 {
            return Some(self.values[0].clone());
        }
        if next_idx >= len {
            return Some(self.values[len - 1].clone());
        }

        let index = next_idx - 1;
        let t0 = self.times[index];
        let t1 = self.times[next_idx];
        let dt = t1 - t0;
        let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };

        Some(T::interpolate_linear(
            &self.values[index],
            &self.values[next_idx],
            t.clamp(0.0, 1.0),
        ))
    }
}

/// How clip time behaves past the end of the clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play once and hold the final frame
    Once,
    /// Wrap back to the start
    #[default]
    Repeat,
}

/// Animated properties of a single bone
#[derive(Debug, Clone, PartialEq)]
pub struct BoneTrack {
    pub bone: usize,
    pub translation: Option<KeyframeTrack<Vec3>>,
    pub rotation: Option<KeyframeTrack<Quat>>,
}

/// A playable skeletal animation
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletalClip {
    pub name: String,
    /// Seconds between source frames
    pub frame_time: f32,
    /// Time of the last keyframe
    pub duration: f32,
    pub loop_mode: LoopMode,
    pub tracks: Vec<BoneTrack>,
}

impl SkeletalClip {
    pub fn new(name: impl Into<String>, frame_time: f32, tracks: Vec<BoneTrack>) -> Self {
        let duration = tracks
            .iter()
            .flat_map(|t| {
                let translation = t.translation.as_ref().map(|k| k.end_time());
                let rotation = t.rotation.as_ref().map(|k| k.end_time());
                translation.into_iter().chain(rotation)
            })
            .fold(0.0_f32, f32::max);

        Self {
            name: name.into(),
            frame_time,
            duration,
            loop_mode: LoopMode::default(),
            tracks,
        }
    }

    /// Number of source frames covered by the clip
    pub fn frame_count(&self) -> usize {
        self.tracks
            .iter()
            .flat_map(|t| {
                let translation = t.translation.as_ref().map(|k| k.times.len());
                let rotation = t.rotation.as_ref().map(|k| k.times.len());
                translation.into_iter().chain(rotation)
            })
            .max()
            .unwrap_or(0)
    }

    /// Map an unbounded playback time into the clip's time range
    pub fn clip_time(&self, time: f64) -> f32 {
        let time = time.max(0.0);
        let duration = f64::from(self.duration);
        if duration <= 0.0 {
            return 0.0;
        }
        match self.loop_mode {
            LoopMode::Once => time.min(duration) as f32,
            LoopMode::Repeat => time.rem_euclid(duration) as f32,
        }
    }

    /// Sample a pose for `skeleton` at clip time `time`.
    /// Bones without a track keep their rest transform.
    pub fn sample(&self, skeleton: &Skeleton, time: f32) -> Pose {
        let mut pose = skeleton.rest_pose();
        for track in &self.tracks {
            let Some(local) = pose.get_mut(track.bone) else {
                continue;
            };
            if let Some(translation) = track.translation.as_ref().and_then(|k| k.sample(time)) {
                local.translation = translation;
            }
            if let Some(rotation) = track.rotation.as_ref().and_then(|k| k.sample(time)) {
                local.rotation = rotation;
            }
        }
        pose
    }
}
