//! Camera pose persistence over a key-value store
//!
//! Position and rotation are stored as two separate JSON records, written
//! together on every camera change and read back all-or-nothing: a missing,
//! unreadable or malformed half means there is no saved pose.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key of the position record
pub const POSITION_KEY: &str = "camera_position";
/// Storage key of the rotation record
pub const ROTATION_KEY: &str = "camera_rotation";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage write failed for '{key}': {reason}")]
    WriteFailed { key: String, reason: String },
    #[error("Failed to encode camera record: {0}")]
    Encode(String),
}

/// String key-value persistence service
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// In-memory store, for tests and hosts without persistent storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Camera position plus XYZ euler rotation (radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Vec3,
}

#[derive(Debug, Serialize, Deserialize)]
struct PositionRecord {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct RotationRecord {
    #[serde(rename = "_x")]
    x: f32,
    #[serde(rename = "_y")]
    y: f32,
    #[serde(rename = "_z")]
    z: f32,
    #[serde(rename = "_order", default = "default_order")]
    order: String,
}

fn default_order() -> String {
    "XYZ".to_string()
}

/// Saves and restores the camera pose through a [`KeyValueStore`]
#[derive(Debug, Clone, Default)]
pub struct CameraStateStore<S> {
    store: S,
}

impl<S: KeyValueStore> CameraStateStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Write both records
    pub fn save(&mut self, pose: &CameraPose) -> Result<(), StoreError> {
        let position = PositionRecord {
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
        };
        let rotation = RotationRecord {
            x: pose.rotation.x,
            y: pose.rotation.y,
            z: pose.rotation.z,
            order: default_order(),
        };
        let position = serde_json::to_string(&position).map_err(|e| StoreError::Encode(e.to_string()))?;
        let rotation = serde_json::to_string(&rotation).map_err(|e| StoreError::Encode(e.to_string()))?;

        self.store.set(POSITION_KEY, &position)?;
        self.store.set(ROTATION_KEY, &rotation)?;
        Ok(())
    }

    /// Read the saved pose; anything short of two valid records is `None`
    pub fn load(&self) -> Option<CameraPose> {
        let position: PositionRecord = self.read_record(POSITION_KEY)?;
        let rotation: RotationRecord = self.read_record(ROTATION_KEY)?;

        if rotation.order != "XYZ" {
            tracing::warn!("Ignoring saved camera rotation with order '{}'", rotation.order);
            return None;
        }

        let pose = CameraPose {
            position: Vec3::new(position.x, position.y, position.z),
            rotation: Vec3::new(rotation.x, rotation.y, rotation.z),
        };
        if !pose.position.is_finite() || !pose.rotation.is_finite() {
            tracing::warn!("Ignoring non-finite saved camera pose");
            return None;
        }
        Some(pose)
    }

    /// Forget the saved pose
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.remove(POSITION_KEY)?;
        self.store.remove(ROTATION_KEY)?;
        Ok(())
    }

    fn read_record<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Could not read '{}': {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Malformed saved '{}': {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose() -> CameraPose {
        CameraPose {
            position: Vec3::new(12.5, 200.0, -310.25),
            rotation: Vec3::new(-0.5880026, 0.0, 0.1),
        }
    }

    #[test]
    fn test_save_then_load() {
        let mut store = CameraStateStore::new(MemoryStore::new());
        store.save(&pose()).unwrap();
        assert_eq!(store.load(), Some(pose()));
    }

    #[test]
    fn test_record_layout() {
        let mut store = CameraStateStore::new(MemoryStore::new());
        store.save(&pose()).unwrap();

        let position = store.store().get(POSITION_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&position).unwrap();
        assert_eq!(value["x"], serde_json::json!(12.5));
        assert_eq!(value["z"], serde_json::json!(-310.25));

        let rotation = store.store().get(ROTATION_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&rotation).unwrap();
        assert!(value.get("_x").is_some());
        assert_eq!(value["_order"], serde_json::json!("XYZ"));
    }

    #[test]
    fn test_reads_records_written_by_browser() {
        let mut memory = MemoryStore::new();
        memory.set(POSITION_KEY, r#"{"x":1,"y":2,"z":3}"#).unwrap();
        memory
            .set(ROTATION_KEY, r#"{"_x":0.1,"_y":0.2,"_z":0.3,"_order":"XYZ","isEuler":true}"#)
            .unwrap();
        let store = CameraStateStore::new(memory);
        assert_eq!(
            store.load(),
            Some(CameraPose {
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: Vec3::new(0.1, 0.2, 0.3),
            })
        );
    }

    #[test]
    fn test_partial_snapshot_is_absent() {
        let mut memory = MemoryStore::new();
        memory.set(POSITION_KEY, r#"{"x":1,"y":2,"z":3}"#).unwrap();
        let store = CameraStateStore::new(memory);
        assert_eq!(store.load(), None);

        let mut memory = MemoryStore::new();
        memory.set(ROTATION_KEY, r#"{"_x":0,"_y":0,"_z":0}"#).unwrap();
        let store = CameraStateStore::new(memory);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_malformed_records_are_absent() {
        let mut store = CameraStateStore::new(MemoryStore::new());
        store.save(&pose()).unwrap();
        store.store_mut().set(ROTATION_KEY, "{not json").unwrap();
        assert_eq!(store.load(), None);

        store.save(&pose()).unwrap();
        store.store_mut().set(POSITION_KEY, r#"{"x":"left"}"#).unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_clear() {
        let mut store = CameraStateStore::new(MemoryStore::new());
        store.save(&pose()).unwrap();
        store.clear().unwrap();
        assert!(store.store().is_empty());
        assert_eq!(store.load(), None);
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("blocked".to_string()))
        }

        fn set(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed {
                key: key.to_string(),
                reason: "quota".to_string(),
            })
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_backend_errors() {
        let mut store = CameraStateStore::new(ReadOnlyStore);
        assert_eq!(store.load(), None);
        assert!(matches!(
            store.save(&pose()),
            Err(StoreError::WriteFailed { .. })
        ));
    }
}
