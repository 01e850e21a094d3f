//! Filesystem-backed blob store: one file per key under a root directory.
//!
//! Writes go to a hidden `tempfile` in the same directory and are persisted
//! (renamed) into place on a blocking thread, so a concurrent reader sees
//! either the previous object or the new one. Content types are not
//! persisted; they are derived from the key's extension on read.

use super::{check_key, content_type_for_key, public_url, BlobEntry, BlobStore, StoredBlob};
use crate::error::StoreError;
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemStore {
    /// Create a store under `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn io_err(key: &str) -> impl FnOnce(io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        check_key(key)?;
        fs::create_dir_all(&self.root).await.map_err(Self::io_err(key))?;

        let root = self.root.clone();
        let final_path = self.root.join(key);
        let data = bytes.to_vec();

        let written = tokio::task::spawn_blocking(move || -> io::Result<()> {
            // Dropping `tmp` on any error below removes the temp file.
            let mut tmp = tempfile::NamedTempFile::new_in(&root)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&final_path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("write task panicked: {e}")))
        .and_then(|result| result);

        if let Err(e) = written {
            warn!(key, error = %e, "fs store: write failed");
            return Err(StoreError::Io {
                key: key.to_string(),
                source: e,
            });
        }

        debug!(key, size = bytes.len(), content_type, "fs store: put");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, StoreError> {
        check_key(key)?;
        match fs::read(self.root.join(key)).await {
            Ok(bytes) => Ok(Some(StoredBlob {
                bytes,
                content_type: content_type_for_key(key).to_string(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StoreError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    key: self.root.display().to_string(),
                    source: e,
                })
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(Self::io_err(""))? {
            let Ok(key) = entry.file_name().into_string() else {
                continue;
            };
            // Temp files in flight.
            if key.starts_with('.') {
                continue;
            }
            if !entry.file_type().await.map_err(Self::io_err(&key))?.is_file() {
                continue;
            }
            let url = public_url(&self.public_base_url, &key);
            entries.push(BlobEntry { key, url });
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
