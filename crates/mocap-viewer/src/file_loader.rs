//! Fetching animation sources over HTTP
//!
//! One load per configured source is started at startup. Each runs on the
//! browser's event loop and reports to the shared [`PendingLoads`] queue,
//! which the scene drains between frames.

use bevy::prelude::*;
use mocap_core::{LoadError, LoadQueue, SourceFetcher};
use mocap_scene::{PendingLoads, Session};

/// Fetches source text with `window.fetch`
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, LoadError> {
        fetch_text(url).await
    }
}

pub struct FileLoaderPlugin;

impl Plugin for FileLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, start_loads);
    }
}

/// Start one independent load per configured source
fn start_loads(session: Res<Session>, pending: Res<PendingLoads>) {
    for (index, url) in session.config().sources.iter().enumerate() {
        spawn_load(index, url.clone(), pending.0.clone());
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_load(index: usize, url: String, queue: LoadQueue) {
    use mocap_core::{load_source, LoadOutcome};

    wasm_bindgen_futures::spawn_local(async move {
        let result = load_source(&HttpFetcher, &url).await;
        queue.push(LoadOutcome { index, url, result });
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load(index: usize, url: String, queue: LoadQueue) {
    // Native: not supported yet
    queue.push(mocap_core::LoadOutcome {
        index,
        result: Err(LoadError::Fetch {
            url: url.clone(),
            reason: "URL fetch not supported on native".to_string(),
        }),
        url,
    });
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str) -> Result<String, LoadError> {
    use wasm_bindgen::JsCast;

    let fetch_error = |reason: String| LoadError::Fetch {
        url: url.to_string(),
        reason,
    };

    let window = web_sys::window().ok_or_else(|| fetch_error("No window".to_string()))?;
    let resp = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| fetch_error(format!("Fetch failed: {:?}", e)))?;
    let resp: web_sys::Response = resp
        .dyn_into()
        .map_err(|_| fetch_error("Response cast failed".to_string()))?;

    if !resp.ok() {
        return Err(LoadError::Http {
            url: url.to_string(),
            status: resp.status(),
            status_text: resp.status_text(),
        });
    }

    let text = resp
        .text()
        .map_err(|e| fetch_error(format!("Failed to get text: {:?}", e)))?;
    let text = wasm_bindgen_futures::JsFuture::from(text)
        .await
        .map_err(|e| fetch_error(format!("Text extraction failed: {:?}", e)))?;
    text.as_string()
        .ok_or_else(|| fetch_error("Response body is not a string".to_string()))
}

#[cfg(not(target_arch = "wasm32"))]
#[allow(dead_code)]
async fn fetch_text(url: &str) -> Result<String, LoadError> {
    Err(LoadError::Fetch {
        url: url.to_string(),
        reason: "URL fetch not supported on native".to_string(),
    })
}
