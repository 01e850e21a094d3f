//! Blob store adapter.
//!
//! The pipeline treats storage as a flat key → bytes map with whole-object,
//! last-write-wins `put`s. There is no transaction spanning two writes, which
//! is why the orchestrator always writes the image before its annotation.
//!
//! ## Layout
//!
//! For an accepted upload with key `K` (extension included) the store holds:
//!
//! ```text
//! K                 image bytes, declared content type
//! <stem of K>.json  {"description": …, "caption": …}
//! ```
//!
//! Two backends ship with the crate:
//!
//! * [`FilesystemStore`]: one file per key under a root directory.
//! * [`MemoryStore`]: a process-local map, for tests and throwaway servers.

pub mod fs;
pub mod memory;

pub use fs::FilesystemStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::pipeline::validate::content_type_for_extension;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Suffix of annotation record objects.
pub const METADATA_SUFFIX: &str = ".json";

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A listed object with its public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobEntry {
    pub key: String,
    pub url: String,
}

/// Durable key/value blob service consumed by the pipeline.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object.
    ///
    /// Readers observe either the old or the new object, never a partial one.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError>;

    /// Read the object at `key`, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, StoreError>;

    /// Every stored key with its public URL, sorted by key.
    async fn list(&self) -> Result<Vec<BlobEntry>, StoreError>;
}

/// Key of the annotation record belonging to `image_key`.
///
/// Only the final extension is replaced: `a.b.jpeg` → `a.b.json`.
pub fn metadata_key(image_key: &str) -> String {
    let stem = image_key
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(image_key);
    format!("{stem}{METADATA_SUFFIX}")
}

/// True for annotation record keys.
pub fn is_metadata_key(key: &str) -> bool {
    key.ends_with(METADATA_SUFFIX)
}

/// Reject keys that are empty, hidden, or could escape a directory.
pub fn check_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Public URL of `key` under `base` (`/media` + `cat.png` → `/media/cat.png`).
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// Content type implied by a key's extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    if is_metadata_key(key) {
        return "application/json";
    }
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    content_type_for_extension(&extension)
}
