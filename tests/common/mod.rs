//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_annotate::{
    AnnotateConfig, AnnotationFailure, Annotator, BlobEntry, BlobStore, MemoryStore, Pipeline,
    StoreError, StoredBlob,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A tiny valid PNG.
pub fn png_bytes() -> Vec<u8> {
    encode(ImageFormat::Png)
}

pub fn jpeg_bytes() -> Vec<u8> {
    encode(ImageFormat::Jpeg)
}

pub fn gif_bytes() -> Vec<u8> {
    encode(ImageFormat::Gif)
}

fn encode(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 6, |x, y| {
        Rgb([(x * 30) as u8, (y * 40) as u8, 120])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// The model reply from the end-to-end example.
pub const CAT_REPLY: &str =
    "```json\n{\"description\":\"A cat sitting on a mat\",\"caption\":\"Cozy cat\"}\n```";

pub const CAT_RECORD_JSON: &str =
    r#"{"description":"A cat sitting on a mat","caption":"Cozy cat"}"#;

/// Annotator that returns a fixed reply and records every call.
pub struct ScriptedAnnotator {
    reply: Result<String, AnnotationFailure>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAnnotator {
    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(failure: AnnotationFailure) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(failure),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Annotator for ScriptedAnnotator {
    async fn annotate(
        &self,
        prompt: &str,
        _image: &DynamicImage,
    ) -> Result<String, AnnotationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}

/// Store whose writes always fail.
#[derive(Default)]
pub struct BrokenStore;

#[async_trait]
impl BlobStore for BrokenStore {
    async fn put(&self, key: &str, _bytes: &[u8], _content_type: &str) -> Result<(), StoreError> {
        Err(StoreError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    async fn get(&self, _key: &str) -> Result<Option<StoredBlob>, StoreError> {
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StoreError> {
        Ok(Vec::new())
    }
}

/// Pipeline over a fresh memory store with the given annotator.
pub fn memory_pipeline(
    annotator: Option<Arc<dyn Annotator>>,
) -> (Pipeline, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let pipeline = Pipeline::new(store.clone(), annotator, &AnnotateConfig::default());
    (pipeline, store)
}
