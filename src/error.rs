//! Error types for the img-annotate library.
//!
//! Each pipeline stage owns a small error enum describing exactly how that
//! stage can fail:
//!
//! * [`InvalidInput`]: the caller sent something we refuse to store
//!   (missing file, bad extension, bytes that are not an image).
//! * [`AnnotationFailure`]: the vision model produced no usable text.
//! * [`ExtractionError`]: the model produced text, but no JSON record could
//!   be recovered from it.
//! * [`StoreError`]: the blob store rejected or failed a read/write.
//!
//! [`AnnotateError`] wraps all of them and is what the orchestrator and the
//! CLI return. It knows which HTTP status class it belongs to and carries a
//! short, user-safe message so raw parser or I/O details never reach callers.

use std::path::PathBuf;
use thiserror::Error;

/// Maximum number of characters of a diagnostic that is written to the log.
pub const LOG_DETAIL_LIMIT: usize = 100;

/// Client-caused rejection of an upload. Always surfaces as HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    /// No file was attached to the request.
    #[error("no file part in the request")]
    MissingFile,

    /// A file was attached but its filename is absent, empty, or sanitizes to nothing.
    #[error("no file selected (empty filename)")]
    EmptyFilename,

    /// The extension is not one of png, jpg, jpeg, gif.
    #[error("unsupported file extension '{extension}' (allowed: png, jpg, jpeg, gif)")]
    UnsupportedExtension { extension: String },

    /// The bytes could not be decoded as an image.
    #[error("file is not a decodable image: {detail}")]
    UndecodableImage { detail: String },
}

/// The vision model returned nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationFailure {
    /// No LLM provider was configured at startup.
    #[error("no vision model is configured")]
    Unconfigured,

    /// The decoded image could not be re-encoded for the request body.
    #[error("image encoding failed: {detail}")]
    Encoding { detail: String },

    /// The provider call failed (network, quota, rejected image, …).
    #[error("provider call failed: {detail}")]
    Provider { detail: String },

    /// The provider answered with an empty completion.
    #[error("provider returned no text")]
    EmptyResponse,
}

/// The model's text could not be turned into an annotation record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("empty AI response")]
    Empty,

    #[error("no JSON object found in AI response")]
    NoJsonFound,

    #[error("malformed JSON in AI response: {detail}")]
    MalformedJson { detail: String },
}

/// Blob store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is empty or could escape the store root.
    #[error("invalid storage key '{key}'")]
    InvalidKey { key: String },

    #[error("storage I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise object: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// All errors returned by the pipeline orchestrator and the input helpers.
#[derive(Debug, Error)]
pub enum AnnotateError {
    // ── Per-request errors ────────────────────────────────────────────────
    #[error("invalid upload: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("annotation failed: {0}")]
    AnnotationFailed(#[from] AnnotationFailure),

    #[error("could not extract annotation: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("blob store error: {0}")]
    Store(#[from] StoreError),

    // ── Input resolution (CLI) ────────────────────────────────────────────
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configured provider could not be initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnnotateError {
    /// HTTP status class for this error: 400 for caller mistakes, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            AnnotateError::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    /// Short message safe to show to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AnnotateError::InvalidInput(InvalidInput::MissingFile) => "No file part",
            AnnotateError::InvalidInput(InvalidInput::EmptyFilename) => "No selected file",
            AnnotateError::InvalidInput(InvalidInput::UnsupportedExtension { .. }) => {
                "Invalid file type"
            }
            AnnotateError::InvalidInput(InvalidInput::UndecodableImage { .. }) => {
                "File is not a valid image"
            }
            AnnotateError::AnnotationFailed(_) => "AI did not return a response",
            AnnotateError::Extraction(_) => "Failed to parse AI response",
            AnnotateError::Store(_) => "Failed to store upload",
            _ => "Internal server error",
        }
    }
}

/// Cut a diagnostic down to [`LOG_DETAIL_LIMIT`] characters for logging.
///
/// Model payloads can be long and may echo user content; only the head is logged.
pub fn truncate_for_log(detail: &str) -> String {
    match detail.char_indices().nth(LOG_DETAIL_LIMIT) {
        Some((idx, _)) => format!("{}\u{2026}", &detail[..idx]),
        None => detail.to_string(),
    }
}
