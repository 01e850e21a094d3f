//! Input resolution: turn a CLI argument (local path or URL) into an [`Upload`].
//!
//! The HTTP server receives files as multipart fields; the CLI receives a
//! path or URL instead. Both end up as the same [`Upload`] so the orchestrator
//! validates them identically. Nothing here checks the extension or decodes
//! the bytes; that is [`super::validate`]'s job.

use super::validate::Upload;
use crate::error::AnnotateError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL into an upload.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<Upload, AnnotateError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local file; the filename is the last path component.
async fn read_local(path: &Path) -> Result<Upload, AnnotateError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            AnnotateError::FileNotFound {
                path: PathBuf::from(path),
            }
        }
        _ => AnnotateError::Internal(format!("reading {}: {}", path.display(), e)),
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(Upload {
        filename: Some(filename),
        bytes,
        content_type: None,
    })
}

/// Download a URL; the filename is the last URL path segment.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Upload, AnnotateError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnnotateError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AnnotateError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnnotateError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AnnotateError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string())
        .filter(|ct| ct.starts_with("image/"));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AnnotateError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());

    Ok(Upload {
        filename: Some(filename_from_url(url)),
        bytes: bytes.to_vec(),
        content_type,
    })
}

/// Last non-empty path segment of `url`, or an empty string.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/cat.png"));
        assert!(is_url("http://example.com/cat.png"));
        assert!(!is_url("/tmp/cat.png"));
        assert!(!is_url("cat.png"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_segments() {
        assert_eq!(filename_from_url("https://example.com/a/b/cat.png"), "cat.png");
        assert_eq!(filename_from_url("https://example.com/cat.png?size=large"), "cat.png");
        assert_eq!(filename_from_url("https://example.com/"), "");
    }

    #[tokio::test]
    async fn local_file_becomes_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.jpg");
        std::fs::write(&path, b"bytes").unwrap();

        let upload = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(upload.filename.as_deref(), Some("holiday.jpg"));
        assert_eq!(upload.bytes, b"bytes");
        assert!(upload.content_type.is_none());
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, AnnotateError::FileNotFound { .. }));
    }
}
