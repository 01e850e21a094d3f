//! Gallery listing: stored images paired with their annotation records.
//!
//! Reads the same keys the pipeline writes. An image whose record is missing
//! (annotation failed) or unreadable is still listed, with `annotation: None`.

use crate::error::StoreError;
use crate::output::AnnotationRecord;
use crate::store::{is_metadata_key, metadata_key, BlobStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How many annotation records are fetched at once.
const RECORD_FETCH_CONCURRENCY: usize = 8;

/// One gallery tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub key: String,
    pub url: String,
    pub annotation: Option<AnnotationRecord>,
}

/// Every non-metadata object in the store, in key order.
pub async fn list_gallery(store: &dyn BlobStore) -> Result<Vec<GalleryItem>, StoreError> {
    let images: Vec<_> = store
        .list()
        .await?
        .into_iter()
        .filter(|entry| !is_metadata_key(&entry.key))
        .collect();

    stream::iter(images)
        .map(|entry| async move {
            let annotation = load_record(store, &metadata_key(&entry.key)).await?;
            Ok::<_, StoreError>(GalleryItem {
                key: entry.key,
                url: entry.url,
                annotation,
            })
        })
        .buffered(RECORD_FETCH_CONCURRENCY)
        .try_collect()
        .await
}

async fn load_record(
    store: &dyn BlobStore,
    key: &str,
) -> Result<Option<AnnotationRecord>, StoreError> {
    let Some(blob) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_slice(&blob.bytes) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(key, error = %e, "gallery: unreadable annotation record");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn pairs_images_with_records() {
        let store = MemoryStore::default();
        store.put("cat.png", b"img", "image/png").await.unwrap();
        store
            .put(
                "cat.json",
                br#"{"description":"A cat","caption":"Cat"}"#,
                "application/json",
            )
            .await
            .unwrap();
        store.put("dog.jpg", b"img", "image/jpeg").await.unwrap();
        store.put("owl.gif", b"img", "image/gif").await.unwrap();
        store.put("owl.json", b"not json", "application/json").await.unwrap();

        let items = list_gallery(&store).await.unwrap();
        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["cat.png", "dog.jpg", "owl.gif"]);

        assert_eq!(items[0].url, "/media/cat.png");
        assert_eq!(
            items[0].annotation,
            Some(AnnotationRecord {
                description: "A cat".into(),
                caption: "Cat".into(),
            })
        );
        assert_eq!(items[1].annotation, None);
        assert_eq!(items[2].annotation, None);
    }

    #[tokio::test]
    async fn empty_store() {
        let store = MemoryStore::default();
        assert!(list_gallery(&store).await.unwrap().is_empty());
    }
}
