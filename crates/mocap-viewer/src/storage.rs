//! Camera persistence through the browser's `localStorage`

use mocap_core::{KeyValueStore, MemoryStore, StoreError};
use mocap_scene::SessionStore;

/// `localStorage` of the current window.
///
/// Holds no handle; the storage object is looked up on every access so the
/// store stays `Send` and usable from a Bevy resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    /// The browser storage if the page may use it
    pub fn open() -> Option<Self> {
        match local_storage() {
            Ok(_) => Some(Self),
            Err(e) => {
                tracing::warn!("Camera will not be remembered: {}", e);
                None
            }
        }
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        read_item(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        write_item(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        remove_item(key)
    }
}

/// Browser storage when available, otherwise an in-memory store for this page view
pub fn open_store() -> SessionStore {
    match BrowserStorage::open() {
        Some(storage) => Box::new(storage),
        None => Box::new(MemoryStore::new()),
    }
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Result<web_sys::Storage, StoreError> {
    let window = web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;
    window
        .local_storage()
        .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?
        .ok_or_else(|| StoreError::Unavailable("localStorage disabled".to_string()))
}

#[cfg(not(target_arch = "wasm32"))]
fn local_storage() -> Result<(), StoreError> {
    Err(StoreError::Unavailable("not running in a browser".to_string()))
}

#[cfg(target_arch = "wasm32")]
fn read_item(key: &str) -> Result<Option<String>, StoreError> {
    local_storage()?
        .get_item(key)
        .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
}

#[cfg(target_arch = "wasm32")]
fn write_item(key: &str, value: &str) -> Result<(), StoreError> {
    local_storage()?
        .set_item(key, value)
        .map_err(|e| StoreError::WriteFailed {
            key: key.to_string(),
            reason: format!("{:?}", e),
        })
}

#[cfg(target_arch = "wasm32")]
fn remove_item(key: &str) -> Result<(), StoreError> {
    local_storage()?
        .remove_item(key)
        .map_err(|e| StoreError::WriteFailed {
            key: key.to_string(),
            reason: format!("{:?}", e),
        })
}

#[cfg(not(target_arch = "wasm32"))]
fn read_item(_key: &str) -> Result<Option<String>, StoreError> {
    local_storage().map(|_| None)
}

#[cfg(not(target_arch = "wasm32"))]
fn write_item(_key: &str, _value: &str) -> Result<(), StoreError> {
    local_storage()
}

#[cfg(not(target_arch = "wasm32"))]
fn remove_item(_key: &str) -> Result<(), StoreError> {
    local_storage()
}
