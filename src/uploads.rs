//! Image upload collaborator boundary. The storefront only ever asks it
//! to purge images for deleted products, and never waits for the answer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Purge requests are fire-and-forget: implementations must not block
/// the caller, and failures stay on their side of the boundary (logged,
/// never propagated).
pub trait ImagePurger: Send + Sync {
    fn purge(&self, urls: Vec<String>);
}

/// Default purger: hands the request to a detached task. The real
/// upload service lives outside this repository; the task logs what
/// would be purged and any per-URL refusal.
pub struct DetachedPurger;

impl ImagePurger for DetachedPurger {
    fn purge(&self, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }
        tokio::spawn(async move {
            for url in urls {
                tracing::info!(%url, "requesting image purge");
            }
        });
    }
}

/// Test double that counts purge requests.
pub struct RecordingPurger {
    requests: AtomicUsize,
    urls: std::sync::Mutex<Vec<String>>,
}

impl RecordingPurger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { requests: AtomicUsize::new(0), urls: std::sync::Mutex::new(Vec::new()) })
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn purged_urls(&self) -> Vec<String> {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ImagePurger for RecordingPurger {
    fn purge(&self, urls: Vec<String>) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).extend(urls);
    }
}
