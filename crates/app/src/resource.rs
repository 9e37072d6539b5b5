//! Revocable object URLs for in-memory blobs.
//!
//! A [`BlobRegistry`] maps `blob:` URLs to payloads. Each [`ObjectUrl`] owns
//! one registration and revokes it on drop. A [`ResourceSlot`] holds at most
//! one `ObjectUrl` at a time, so replacing or clearing a slot always revokes
//! what it held.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:giffer/";

/// A payload addressable through an object URL.
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl Blob {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Mutex<HashMap<String, Blob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return the handle that keeps it alive.
    pub fn create_object_url(&self, blob: Blob) -> ObjectUrl {
        let url = format!("{URL_PREFIX}{}", Uuid::new_v4());
        self.blobs.lock().insert(url.clone(), blob);
        ObjectUrl {
            url,
            registry: self.clone(),
        }
    }

    /// Look up a live URL.
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.blobs.lock().get(url).cloned()
    }

    pub fn is_alive(&self, url: &str) -> bool {
        self.blobs.lock().contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.blobs.lock().len()
    }

    fn revoke(&self, url: &str) -> bool {
        self.blobs.lock().remove(url).is_some()
    }
}

/// Owned registration in a [`BlobRegistry`]. Revoked when dropped.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: BlobRegistry,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        if self.registry.revoke(&self.url) {
            debug!(url = %self.url, "object url revoked");
        }
    }
}

/// Named single-occupancy holder for one object URL.
#[derive(Debug)]
pub struct ResourceSlot {
    name: &'static str,
    registry: BlobRegistry,
    current: Option<ObjectUrl>,
    size: u64,
}

impl ResourceSlot {
    pub fn new(name: &'static str, registry: BlobRegistry) -> Self {
        Self {
            name,
            registry,
            current: None,
            size: 0,
        }
    }

    /// Publish a payload, returning its URL. The previous URL, if any, is
    /// revoked in the same step that installs the new one.
    pub fn publish(&mut self, bytes: Bytes, mime_type: &str) -> String {
        let size = bytes.len() as u64;
        let next = self.registry.create_object_url(Blob {
            bytes,
            mime_type: mime_type.to_string(),
        });
        let url = next.as_str().to_string();
        let previous = self.current.replace(next);
        self.size = size;
        drop(previous);
        debug!(slot = self.name, %url, size, "slot published");
        url
    }

    /// Revoke the current URL and empty the slot. No-op when already empty.
    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            debug!(slot = self.name, url = previous.as_str(), "slot cleared");
        }
        self.size = 0;
    }

    pub fn url(&self) -> Option<&str> {
        self.current.as_ref().map(ObjectUrl::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn byte_size(&self) -> u64 {
        self.size
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
