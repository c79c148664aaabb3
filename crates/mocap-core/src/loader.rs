//! Animation source loading
//!
//! Each source is fetched and parsed independently. Completions land in a
//! [`LoadQueue`] that the frame loop drains, so players are only ever
//! registered between frame steps.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::bvh::{Bvh, BvhError};
use crate::clip::SkeletalClip;
use crate::skeleton::Skeleton;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },
    #[error("HTTP {status} {status_text} for '{url}'")]
    Http {
        url: String,
        status: u16,
        status_text: String,
    },
    #[error("Failed to parse '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: BvhError,
    },
}

impl LoadError {
    pub fn url(&self) -> &str {
        match self {
            Self::Fetch { url, .. } | Self::Http { url, .. } | Self::Parse { url, .. } => url,
        }
    }
}

/// Transport that retrieves the text behind a source URL
pub trait SourceFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, LoadError>>;
}

/// A parsed source, ready to become a player
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub url: String,
    pub skeleton: Arc<Skeleton>,
    pub clip: Arc<SkeletalClip>,
}

/// Fetch `url` and parse it as BVH
pub async fn load_source<F: SourceFetcher>(fetcher: &F, url: &str) -> Result<LoadedSource, LoadError> {
    tracing::info!("Loading animation from {}", url);
    let text = fetcher.fetch(url).await?;

    let bvh = Bvh::parse(&clip_name(url), &text).map_err(|source| LoadError::Parse {
        url: url.to_string(),
        source,
    })?;

    tracing::info!(
        "Loaded '{}': {} bones, {} frames",
        url,
        bvh.skeleton.len(),
        bvh.clip.frame_count()
    );
    Ok(LoadedSource {
        url: url.to_string(),
        skeleton: Arc::new(bvh.skeleton),
        clip: Arc::new(bvh.clip),
    })
}

/// Last path segment of a URL without query, fragment or extension
fn clip_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    let stem = match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    };
    if stem.is_empty() {
        url.to_string()
    } else {
        stem.to_string()
    }
}

/// Completion of one source load
#[derive(Debug)]
pub struct LoadOutcome {
    /// Position of the source in the configured list
    pub index: usize,
    pub url: String,
    pub result: Result<LoadedSource, LoadError>,
}

/// Completed loads waiting for the next frame
#[derive(Debug, Clone, Default)]
pub struct LoadQueue {
    inner: Arc<Mutex<VecDeque<LoadOutcome>>>,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: LoadOutcome) {
        self.lock().push_back(outcome);
    }

    /// Take every completed load in arrival order
    pub fn drain(&self) -> Vec<LoadOutcome> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LoadOutcome>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TINY: &str = "HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 3 Xposition Yposition Zposition
  End Site
  {
    OFFSET 0 10 0
  }
}
MOTION
Frames: 2
Frame Time: 0.5
0 0 0
4 0 0
";

    struct MockFetcher {
        responses: HashMap<String, Result<String, LoadError>>,
    }

    impl SourceFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<String, LoadError> {
            self.responses.get(url).cloned().unwrap_or_else(|| {
                Err(LoadError::Http {
                    url: url.to_string(),
                    status: 404,
                    status_text: "Not Found".to_string(),
                })
            })
        }
    }

    fn fetcher() -> MockFetcher {
        let mut responses = HashMap::new();
        responses.insert("/files/walk.bvh".to_string(), Ok(TINY.to_string()));
        responses.insert("/files/broken.bvh".to_string(), Ok("HIERARCHY\nROOT".to_string()));
        responses.insert(
            "/files/offline.bvh".to_string(),
            Err(LoadError::Fetch {
                url: "/files/offline.bvh".to_string(),
                reason: "network down".to_string(),
            }),
        );
        MockFetcher { responses }
    }

    #[tokio::test]
    async fn test_load_source() {
        let loaded = load_source(&fetcher(), "/files/walk.bvh").await.unwrap();
        assert_eq!(loaded.url, "/files/walk.bvh");
        assert_eq!(loaded.clip.name, "walk");
        assert_eq!(loaded.skeleton.len(), 2);
        assert_eq!(loaded.clip.frame_count(), 2);
    }

    #[tokio::test]
    async fn test_load_failures() {
        let fetcher = fetcher();

        let err = load_source(&fetcher, "/files/missing.bvh").await.unwrap_err();
        assert!(matches!(err, LoadError::Http { status: 404, .. }));
        assert_eq!(err.url(), "/files/missing.bvh");

        let err = load_source(&fetcher, "/files/broken.bvh").await.unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));

        let err = load_source(&fetcher, "/files/offline.bvh").await.unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }

    #[test]
    fn test_clip_name() {
        assert_eq!(clip_name("/files/walk.bvh"), "walk");
        assert_eq!(clip_name("https://host/a/run.bvh?v=2"), "run");
        assert_eq!(clip_name("/api/v1/results/3/bvh/1"), "1");
        assert_eq!(clip_name("/api/results/"), "results");
    }

    #[test]
    fn test_queue_preserves_arrival_order() {
        let queue = LoadQueue::new();
        let producer = queue.clone();
        for (index, url) in ["b.bvh", "a.bvh"].iter().enumerate() {
            producer.push(LoadOutcome {
                index,
                url: url.to_string(),
                result: Err(LoadError::Fetch {
                    url: url.to_string(),
                    reason: "offline".to_string(),
                }),
            });
        }
        assert_eq!(queue.len(), 2);

        let drained: Vec<String> = queue.drain().into_iter().map(|o| o.url).collect();
        assert_eq!(drained, vec!["b.bvh", "a.bvh"]);
        assert!(queue.is_empty());
    }
}
