//! In-process blob store. Contents vanish with the process.

use super::{check_key, public_url, BlobEntry, BlobStore, StoredBlob};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Blob store backed by a sorted in-memory map.
#[derive(Debug)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredBlob>>,
    public_base_url: String,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            public_base_url: public_base_url.into(),
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of successful `put` calls since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }

    /// All stored keys in order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("/media")
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.objects.write().await.insert(
            key.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        self.puts.fetch_add(1, Ordering::Relaxed);
        debug!(key, size = bytes.len(), content_type, "memory store: put");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, StoreError> {
        check_key(key)?;
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StoreError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .map(|key| BlobEntry {
                key: key.clone(),
                url: public_url(&self.public_base_url, key),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_declared_content_type() {
        let store = MemoryStore::default();
        store.put("cat.png", b"img", "image/x-png").await.unwrap();
        let blob = store.get("cat.png").await.unwrap().unwrap();
        assert_eq!(blob.content_type, "image/x-png");
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn list_is_sorted_with_urls() {
        let store = MemoryStore::new("https://cdn.example.com");
        store.put("z.gif", b"z", "image/gif").await.unwrap();
        store.put("a.png", b"a", "image/png").await.unwrap();
        let entries = store.list().await.unwrap();
        assert_eq!(entries[0].key, "a.png");
        assert_eq!(entries[0].url, "https://cdn.example.com/a.png");
        assert_eq!(entries[1].key, "z.gif");
    }
}
