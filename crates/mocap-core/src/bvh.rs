//! BVH (Biovision Hierarchy) parsing
//!
//! A BVH file has two sections: `HIERARCHY` describes the bone tree with
//! rest offsets and the channels each joint animates, `MOTION` holds one line
//! of channel values per frame. Parsing produces a [`Skeleton`] plus a
//! [`SkeletalClip`] with one translation and/or rotation track per animated
//! bone.

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::clip::{BoneTrack, KeyframeTrack, SkeletalClip};
use crate::skeleton::{Bone, Skeleton};

/// Name given to "End Site" leaves
pub const END_SITE_NAME: &str = "ENDSITE";

/// Deepest joint nesting accepted below the root
pub const MAX_JOINT_DEPTH: usize = 256;
/// A joint animates at most three position and three rotation axes
const MAX_CHANNELS: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    #[error("Unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    #[error("Line {line}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("Line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },
    #[error("Line {line}: unknown channel '{name}'")]
    UnknownChannel { line: usize, name: String },
    #[error("Frame {frame}: expected {expected} values, found {found}")]
    FrameValueCount {
        frame: usize,
        expected: usize,
        found: usize,
    },
    #[error("Expected {expected} frames, found {found}")]
    MissingFrames { expected: usize, found: usize },
    #[error("Line {line}: joints nested deeper than {max}")]
    HierarchyTooDeep { line: usize, max: usize },
    #[error("Line {line}: frame time must be positive, found {value}")]
    InvalidFrameTime { line: usize, value: f32 },
}

/// Animated property of a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    XPosition,
    YPosition,
    ZPosition,
    XRotation,
    YRotation,
    ZRotation,
}

impl Channel {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "xposition" => Some(Self::XPosition),
            "yposition" => Some(Self::YPosition),
            "zposition" => Some(Self::ZPosition),
            "xrotation" => Some(Self::XRotation),
            "yrotation" => Some(Self::YRotation),
            "zrotation" => Some(Self::ZRotation),
            _ => None,
        }
    }

    fn is_position(self) -> bool {
        matches!(self, Self::XPosition | Self::YPosition | Self::ZPosition)
    }

    fn axis(self) -> Vec3 {
        match self {
            Self::XPosition | Self::XRotation => Vec3::X,
            Self::YPosition | Self::YRotation => Vec3::Y,
            Self::ZPosition | Self::ZRotation => Vec3::Z,
        }
    }
}

/// A parsed BVH file
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    pub skeleton: Skeleton,
    pub clip: SkeletalClip,
    /// Channels per bone, in hierarchy order
    pub channels: Vec<Vec<Channel>>,
}

impl Bvh {
    /// Parse BVH text; `name` becomes the clip name
    pub fn parse(name: &str, text: &str) -> Result<Self, BvhError> {
        let mut tokens = Tokens::new(text);
        let mut bones = Vec::new();
        let mut channels = Vec::new();

        tokens.expect("HIERARCHY")?;
        tokens.expect("ROOT")?;
        let (_, root_name) = tokens.next("root name")?;
        parse_joint(&mut tokens, root_name, None, 0, &mut bones, &mut channels)?;

        tokens.expect("MOTION")?;
        tokens.expect("Frames:")?;
        let (_, frame_count) = tokens.count()?;
        tokens.expect("Frame")?;
        tokens.expect("Time:")?;
        let (line, frame_time) = tokens.number_at()?;
        if !(frame_time.is_finite() && frame_time > 0.0) {
            return Err(BvhError::InvalidFrameTime { line, value: frame_time });
        }

        let frames = parse_frames(&tokens, &channels, frame_count)?;
        let skeleton = Skeleton::new(bones);
        let tracks = build_tracks(&skeleton, &channels, &frames, frame_time);
        let clip = SkeletalClip::new(name, frame_time, tracks);

        tracing::debug!(
            "Parsed BVH '{}': {} bones, {} frames @ {:.4}s",
            name,
            skeleton.len(),
            frame_count,
            frame_time
        );

        Ok(Self {
            skeleton,
            clip,
            channels,
        })
    }
}

fn parse_joint<'a>(
    tokens: &mut Tokens<'a>,
    name: &'a str,
    parent: Option<usize>,
    depth: usize,
    bones: &mut Vec<Bone>,
    channels: &mut Vec<Vec<Channel>>,
) -> Result<(), BvhError> {
    tokens.expect("{")?;
    tokens.expect("OFFSET")?;
    let offset = tokens.vec3()?;

    let index = bones.len();
    bones.push(Bone {
        name: name.to_string(),
        parent,
        offset,
        end_site: false,
    });
    channels.push(Vec::new());

    loop {
        let (line, token) = tokens.next("CHANNELS, JOINT, End Site or }")?;
        match token {
            t if t.eq_ignore_ascii_case("CHANNELS") => {
                let (line, count) = tokens.count()?;
                if count > MAX_CHANNELS {
                    return Err(BvhError::UnexpectedToken {
                        line,
                        expected: format!("at most {} channels", MAX_CHANNELS),
                        found: count.to_string(),
                    });
                }
                let mut joint_channels = Vec::with_capacity(count);
                for _ in 0..count {
                    let (line, name) = tokens.next("channel name")?;
                    let channel = Channel::parse(name).ok_or_else(|| BvhError::UnknownChannel {
                        line,
                        name: name.to_string(),
                    })?;
                    joint_channels.push(channel);
                }
                channels[index] = joint_channels;
            }
            t if t.eq_ignore_ascii_case("JOINT") => {
                if depth >= MAX_JOINT_DEPTH {
                    return Err(BvhError::HierarchyTooDeep {
                        line,
                        max: MAX_JOINT_DEPTH,
                    });
                }
                let (_, child_name) = tokens.next("joint name")?;
                parse_joint(tokens, child_name, Some(index), depth + 1, bones, channels)?;
            }
            t if t.eq_ignore_ascii_case("End") => {
                tokens.expect("Site")?;
                tokens.expect("{")?;
                tokens.expect("OFFSET")?;
                let offset = tokens.vec3()?;
                tokens.expect("}")?;
                bones.push(Bone {
                    name: END_SITE_NAME.to_string(),
                    parent: Some(index),
                    offset,
                    end_site: true,
                });
                channels.push(Vec::new());
            }
            "}" => return Ok(()),
            other => {
                return Err(BvhError::UnexpectedToken {
                    line,
                    expected: "CHANNELS, JOINT, End Site or }".to_string(),
                    found: other.to_string(),
                })
            }
        }
    }
}

/// Read `frame_count` lines of channel values following the `Frame Time:` line
fn parse_frames(
    tokens: &Tokens<'_>,
    channels: &[Vec<Channel>],
    frame_count: usize,
) -> Result<Vec<Vec<f32>>, BvhError> {
    let expected: usize = channels.iter().map(Vec::len).sum();
    // The declared count is untrusted; never reserve more rows than there are lines
    let mut frames = Vec::with_capacity(frame_count.min(tokens.remaining_lines().count()));

    for (line_idx, line) in tokens.remaining_lines() {
        if frames.len() == frame_count {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(|v| {
                v.parse::<f32>().map_err(|_| BvhError::InvalidNumber {
                    line: line_idx,
                    value: v.to_string(),
                })
            })
            .collect::<Result<Vec<f32>, BvhError>>()?;
        if values.len() != expected {
            return Err(BvhError::FrameValueCount {
                frame: frames.len(),
                expected,
                found: values.len(),
            });
        }
        frames.push(values);
    }

    if frames.len() < frame_count {
        return Err(BvhError::MissingFrames {
            expected: frame_count,
            found: frames.len(),
        });
    }
    Ok(frames)
}

fn build_tracks(
    skeleton: &Skeleton,
    channels: &[Vec<Channel>],
    frames: &[Vec<f32>],
    frame_time: f32,
) -> Vec<BoneTrack> {
    let times: Vec<f32> = (0..frames.len()).map(|i| i as f32 * frame_time).collect();
    let mut tracks = Vec::new();
    let mut column = 0;

    for (bone_index, bone_channels) in channels.iter().enumerate() {
        if bone_channels.is_empty() {
            continue;
        }
        let offset = skeleton.bones[bone_index].offset;
        let animates_position = bone_channels.iter().any(|c| c.is_position());
        let animates_rotation = bone_channels.iter().any(|c| !c.is_position());

        let mut positions = Vec::with_capacity(frames.len());
        let mut rotations = Vec::with_capacity(frames.len());

        for frame in frames {
            let mut position = Vec3::ZERO;
            let mut rotation = Quat::IDENTITY;
            for (i, channel) in bone_channels.iter().enumerate() {
                let value = frame[column + i];
                if channel.is_position() {
                    position += channel.axis() * value;
                } else {
                    rotation *= Quat::from_axis_angle(channel.axis(), value.to_radians());
                }
            }
            // The animated property is the full local translation, so the rest offset is folded in
            positions.push(offset + position);
            rotations.push(rotation.normalize());
        }
        column += bone_channels.len();

        tracks.push(BoneTrack {
            bone: bone_index,
            translation: animates_position.then(|| KeyframeTrack::new(times.clone(), positions)),
            rotation: animates_rotation.then(|| KeyframeTrack::new(times.clone(), rotations)),
        });
    }

    tracks
}

/// Whitespace tokens tagged with their 1-based line number
struct Tokens<'a> {
    lines: Vec<&'a str>,
    tokens: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let tokens = lines
            .iter()
            .enumerate()
            .flat_map(|(i, line)| line.split_whitespace().map(move |t| (i + 1, t)))
            .collect();
        Self {
            lines,
            tokens,
            pos: 0,
        }
    }

    fn next(&mut self, expected: &str) -> Result<(usize, &'a str), BvhError> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or_else(|| BvhError::UnexpectedEof(expected.to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, keyword: &str) -> Result<(), BvhError> {
        let (line, token) = self.next(keyword)?;
        if token.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(BvhError::UnexpectedToken {
                line,
                expected: keyword.to_string(),
                found: token.to_string(),
            })
        }
    }

    fn number(&mut self) -> Result<f32, BvhError> {
        self.number_at().map(|(_, value)| value)
    }

    fn number_at(&mut self) -> Result<(usize, f32), BvhError> {
        self.parse_next("number")
    }

    fn count(&mut self) -> Result<(usize, usize), BvhError> {
        self.parse_next("count")
    }

    fn parse_next<T: std::str::FromStr>(&mut self, expected: &str) -> Result<(usize, T), BvhError> {
        let (line, token) = self.next(expected)?;
        let value = token.parse().map_err(|_| BvhError::InvalidNumber {
            line,
            value: token.to_string(),
        })?;
        Ok((line, value))
    }

    fn vec3(&mut self) -> Result<Vec3, BvhError> {
        Ok(Vec3::new(self.number()?, self.number()?, self.number()?))
    }

    /// Lines after the most recently consumed token, with 1-based numbers
    fn remaining_lines(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        let current_line = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(line, _)| *line)
            .unwrap_or(0);
        self.lines
            .iter()
            .enumerate()
            .skip(current_line)
            .map(|(i, line)| (i + 1, *line))
    }
}
