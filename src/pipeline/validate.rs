//! Upload validation: filename → storage key, bytes → decoded image.
//!
//! Nothing here touches the store or the network. A [`ValidatedImage`] is
//! the only way into the rest of the pipeline, so every object the store ever
//! receives has an allow-listed extension, a sanitized key and bytes that
//! decode as an image.
//!
//! Decoding is CPU-bound; async callers run [`validate_upload`] inside
//! `spawn_blocking`.

use crate::error::InvalidInput;
use image::{DynamicImage, ImageReader, Limits};
use std::io::Cursor;
use tracing::debug;

/// Largest width or height accepted from an upload, in pixels.
pub const MAX_DECODE_DIMENSION: u32 = 16_384;

/// Upper bound on decoder allocations for a single upload (256 MiB).
pub const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Extensions accepted for upload (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// A file as received from a caller, before any checks.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    /// Client-supplied filename, possibly containing path components.
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
    /// Declared content type; derived from the extension when absent.
    pub content_type: Option<String>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.into()),
            bytes,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// An upload that passed every check.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    /// Sanitized storage key, extension included (e.g. `cat.png`).
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Decoded pixels, handed to the annotator.
    pub image: DynamicImage,
}

/// Validate an upload and derive its storage key.
///
/// `None` means the caller attached no file at all.
pub fn validate_upload(upload: Option<Upload>) -> Result<ValidatedImage, InvalidInput> {
    let upload = upload.ok_or(InvalidInput::MissingFile)?;

    let filename = upload
        .filename
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or(InvalidInput::EmptyFilename)?;

    allowed_extension(filename)?;

    let key = sanitize_key(filename);
    if key.is_empty() {
        return Err(InvalidInput::EmptyFilename);
    }
    // Sanitizing can eat the extension (e.g. "ü.png" → "png").
    let extension = allowed_extension(&key)?;

    let image = decode_image(&upload.bytes, MAX_DECODE_DIMENSION, MAX_DECODE_ALLOC)?;

    // Clients often declare `application/octet-stream`; only an image type is kept.
    let content_type = upload
        .content_type
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| content_type_for_extension(&extension).to_string());

    debug!(
        "Validated upload '{}' → key '{}' ({}x{}, {})",
        filename,
        key,
        image.width(),
        image.height(),
        content_type
    );

    Ok(ValidatedImage {
        key,
        bytes: upload.bytes,
        content_type,
        image,
    })
}

/// Decode untrusted bytes, refusing images whose header declares more than
/// `max_dimension` pixels on a side or whose decoding would allocate more
/// than `max_alloc` bytes.
pub fn decode_image(
    bytes: &[u8],
    max_dimension: u32,
    max_alloc: u64,
) -> Result<DynamicImage, InvalidInput> {
    let undecodable = |detail: String| InvalidInput::UndecodableImage { detail };

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| undecodable(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dimension);
    limits.max_image_height = Some(max_dimension);
    limits.max_alloc = Some(max_alloc);
    reader.limits(limits);

    reader.decode().map_err(|e| undecodable(e.to_string()))
}

/// Return the lowercase extension of `filename` if it is allow-listed.
pub fn allowed_extension(filename: &str) -> Result<String, InvalidInput> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(InvalidInput::UnsupportedExtension { extension })
    }
}

/// Turn a client filename into a key safe for filesystems and URLs.
///
/// Path separators become word breaks, whitespace runs collapse to `_`,
/// anything outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_`
/// are trimmed, so `../../etc/passwd.png` becomes `etc_passwd.png`.
pub fn sanitize_key(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let safe: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    safe.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// MIME type for an allow-listed extension.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
