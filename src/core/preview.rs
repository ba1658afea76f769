//! Revocable preview handles for ingested sources.
//!
//! Every item owns exactly one [`PreviewHandle`] from insertion until it is
//! removed. Dropping the handle revokes it in the owning [`PreviewPool`], so
//! removing or clearing items releases previews without any sweep.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::core::SourceFile;

#[derive(Debug, Default)]
struct PoolInner {
    next_id: AtomicU64,
    /// url → payload size, for every handle not yet revoked
    live: Mutex<HashMap<String, usize>>,
}

impl PoolInner {
    fn revoke(&self, url: &str) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        if live.remove(url).is_some() {
            debug!("Revoked preview {url}");
        }
    }
}

/// Issues preview handles and tracks which ones are still live.
#[derive(Debug, Clone, Default)]
pub struct PreviewPool {
    inner: Arc<PoolInner>,
}

impl PreviewPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a preview over the source payload. The bytes are shared, not copied.
    pub fn open(&self, source: &SourceFile) -> PreviewHandle {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("preview:{n}/{}", source.name);
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), source.size());

        PreviewHandle {
            url,
            mime: source.mime.clone(),
            bytes: Arc::clone(&source.bytes),
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of handles issued and not yet released
    pub fn live_count(&self) -> usize {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(url)
    }
}

/// A renderable reference to a source payload, revoked on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    mime: String,
    bytes: Arc<[u8]>,
    pool: Arc<PoolInner>,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Explicit release; equivalent to dropping the handle.
    pub fn release(self) {}
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.pool.revoke(&self.url);
    }
}
