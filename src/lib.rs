//! # img-annotate
//!
//! Upload images, caption them with a Vision Language Model, and store the
//! image and its `{description, caption}` record side by side so a gallery
//! can render both.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (filename + bytes)
//!  │
//!  ├─ 1. Validate  extension allow-list, sanitized key, decodable image
//!  ├─ 2. Store     image bytes under the key (before the model is asked)
//!  ├─ 3. Annotate  one VLM call with the instruction prompt + image
//!  ├─ 4. Extract   recover the JSON record from fenced / chatty output
//!  └─ 5. Store     `<stem>.json` next to the image
//! ```
//!
//! A failure at step 3 or 4 leaves the image stored without a record; that
//! is an expected outcome, not corruption. Nothing is retried.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img_annotate::{build_annotator, AnnotateConfig, FilesystemStore, Pipeline, Upload};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = AnnotateConfig::default();
//!     let store = Arc::new(FilesystemStore::new(&config.store_dir, &config.public_base_url));
//!     let pipeline = Pipeline::new(store, Some(build_annotator(&config)?), &config);
//!
//!     let bytes = std::fs::read("cat.png")?;
//!     let outcome = pipeline.process_upload(Some(Upload::new("cat.png", bytes))).await?;
//!     println!("{}: {}", outcome.image_key, outcome.record.caption);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | via cli | axum router with upload, gallery and media endpoints |
//! | `cli`    | on      | Enables the `img-annotate` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod annotate;
pub mod config;
pub mod error;
pub mod gallery;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use annotate::{build_annotator, resolve_provider, Pipeline, UploadStage};
pub use config::{AnnotateConfig, AnnotateConfigBuilder};
pub use error::{AnnotateError, AnnotationFailure, ExtractionError, InvalidInput, StoreError};
pub use gallery::{list_gallery, GalleryItem};
pub use output::{AnnotationRecord, UploadOutcome};
pub use pipeline::extract::extract_annotation;
pub use pipeline::llm::{Annotator, LlmAnnotator};
pub use pipeline::validate::{sanitize_key, validate_upload, Upload, ValidatedImage};
pub use store::{BlobEntry, BlobStore, FilesystemStore, MemoryStore, StoredBlob};
