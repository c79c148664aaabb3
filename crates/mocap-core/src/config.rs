//! Display configuration read from the hosting page

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orbit::OrbitController;
use crate::playback::SyncPolicy;

/// Field holding the source URL or list of URLs
pub const SOURCES_FIELD: &str = "current-url";
/// Field holding the auto-rotate flag
pub const AUTO_ROTATE_FIELD: &str = "autorotate";
pub const TITLE_FIELD: &str = "title";
pub const SYNC_POLICY_FIELD: &str = "sync-policy";
/// Field holding optional JSON overrides for camera and controls
pub const OPTIONS_FIELD: &str = "viewer-options";

/// Every field the configuration reads
pub const ALL_FIELDS: [&str; 5] = [
    SOURCES_FIELD,
    AUTO_ROTATE_FIELD,
    TITLE_FIELD,
    SYNC_POLICY_FIELD,
    OPTIONS_FIELD,
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing configuration field '{0}'")]
    MissingField(String),
    #[error("Field '{0}' lists no sources")]
    NoSources(String),
    #[error("Field '{field}' is not a valid source list: {reason}")]
    InvalidSourceList { field: String, reason: String },
}

/// Named string fields provided by the host page
pub trait ConfigFields {
    fn field(&self, name: &str) -> Option<String>;
}

impl ConfigFields for std::collections::HashMap<String, String> {
    fn field(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Perspective projection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

impl CameraConfig {
    /// A usable perspective: fov inside (0, 180) and 0 < near < far
    pub fn is_valid(&self) -> bool {
        self.fov > 0.0 && self.fov < 180.0 && self.near > 0.0 && self.far > self.near && self.far.is_finite()
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
        }
    }
}

fn default_fov() -> f32 {
    60.0
}

fn default_near() -> f32 {
    1.0
}

fn default_far() -> f32 {
    1000.0
}

/// Orbit control settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlsConfig {
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f32,
    #[serde(default = "default_auto_rotate_speed")]
    pub auto_rotate_speed: f32,
}

impl ControlsConfig {
    /// Positive ordered distance limits with finite damping and speed
    pub fn is_valid(&self) -> bool {
        self.min_distance > 0.0
            && self.max_distance >= self.min_distance
            && self.max_distance.is_finite()
            && (0.0..=1.0).contains(&self.damping_factor)
            && self.auto_rotate_speed.is_finite()
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            damping_factor: default_damping_factor(),
            auto_rotate_speed: default_auto_rotate_speed(),
        }
    }
}

fn default_min_distance() -> f32 {
    100.0
}

fn default_max_distance() -> f32 {
    700.0
}

fn default_damping_factor() -> f32 {
    0.05
}

fn default_auto_rotate_speed() -> f32 {
    2.0
}

/// Optional JSON overrides from the `viewer-options` field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerOptions {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub sync_policy: Option<SyncPolicy>,
}

/// Session-wide display settings, fixed after startup
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub sources: Vec<String>,
    pub auto_rotate: bool,
    pub title: Option<String>,
    pub sync_policy: SyncPolicy,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
}

impl DisplayConfig {
    /// Camera start position without auto-rotation
    pub const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 200.0, 300.0);
    /// Camera start position when auto-rotating
    pub const AUTO_ROTATE_CAMERA_POSITION: Vec3 = Vec3::new(250.0, 150.0, 250.0);
    pub const CAMERA_TARGET: Vec3 = Vec3::ZERO;

    /// Configuration with defaults for everything but the sources
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            auto_rotate: false,
            title: None,
            sync_policy: SyncPolicy::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
        }
    }

    /// Read the configuration; only the source list is required
    pub fn from_fields(fields: &impl ConfigFields) -> Result<Self, ConfigError> {
        let raw_sources = fields
            .field(SOURCES_FIELD)
            .ok_or_else(|| ConfigError::MissingField(SOURCES_FIELD.to_string()))?;
        let sources = parse_source_list(SOURCES_FIELD, &raw_sources)?;

        let mut config = Self::new(sources);
        config.auto_rotate = fields
            .field(AUTO_ROTATE_FIELD)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        config.title = fields
            .field(TITLE_FIELD)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if let Some(raw) = fields.field(OPTIONS_FIELD) {
            match serde_json::from_str::<ViewerOptions>(&raw) {
                Ok(options) => {
                    if options.camera.is_valid() {
                        config.camera = options.camera;
                    } else {
                        tracing::warn!("Ignoring invalid camera options {:?}", options.camera);
                    }
                    if options.controls.is_valid() {
                        config.controls = options.controls;
                    } else {
                        tracing::warn!("Ignoring invalid controls options {:?}", options.controls);
                    }
                    if let Some(policy) = options.sync_policy {
                        config.sync_policy = policy;
                    }
                }
                Err(e) => tracing::warn!("Ignoring malformed '{}': {}", OPTIONS_FIELD, e),
            }
        }

        if let Some(raw) = fields.field(SYNC_POLICY_FIELD) {
            match SyncPolicy::parse(&raw) {
                Some(policy) => config.sync_policy = policy,
                None => tracing::warn!("Unknown sync policy '{}', using {:?}", raw, config.sync_policy),
            }
        }

        tracing::info!(
            "Configured {} source(s), auto-rotate={}, sync={:?}",
            config.sources.len(),
            config.auto_rotate,
            config.sync_policy
        );
        Ok(config)
    }

    pub fn initial_camera_position(&self) -> Vec3 {
        if self.auto_rotate {
            Self::AUTO_ROTATE_CAMERA_POSITION
        } else {
            Self::DEFAULT_CAMERA_POSITION
        }
    }

    /// Orbit controller at the initial camera placement
    pub fn orbit_controller(&self) -> OrbitController {
        let mut orbit = OrbitController::new(self.initial_camera_position(), Self::CAMERA_TARGET)
            .with_distance_limits(self.controls.min_distance, self.controls.max_distance);
        orbit.damping_factor = self.controls.damping_factor;
        orbit.auto_rotate_speed = self.controls.auto_rotate_speed;
        orbit.set_auto_rotate(self.auto_rotate);
        orbit
    }
}

/// `True`/`true` enable a flag; anything else leaves it off
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Parse a single URL or a bracketed list of quoted URLs.
///
/// Accepts JSON (`["a.bvh", "b.bvh"]`) as well as single-quoted lists
/// (`['a.bvh', 'b.bvh']`) as rendered by server-side templates.
pub fn parse_source_list(field: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let trimmed = raw.trim();
    let sources: Vec<String> = if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(list) => list,
            Err(_) => parse_quoted_list(field, trimmed)?,
        }
    } else {
        vec![unquote(trimmed).to_string()]
    };

    let sources: Vec<String> = sources
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if sources.is_empty() {
        return Err(ConfigError::NoSources(field.to_string()));
    }
    Ok(sources)
}

fn parse_quoted_list(field: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let inner = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ConfigError::InvalidSourceList {
            field: field.to_string(),
            reason: "unterminated list".to_string(),
        })?;

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(ConfigError::InvalidSourceList {
                field: field.to_string(),
                reason: format!("expected a quoted string, found '{}'", quote),
            });
        }
        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        item.push(escaped);
                    }
                }
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return Err(ConfigError::InvalidSourceList {
                field: field.to_string(),
                reason: "unterminated string".to_string(),
            });
        }
        items.push(item);
    }
    Ok(items)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}
