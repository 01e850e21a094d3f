//! HTTP surface: upload endpoint, gallery listing and media serving.
//!
//! ```text
//! POST /upload          multipart field `image` → 303 to `/`, or {"error": …}
//! GET  /                gallery JSON
//! GET  /api/images      gallery JSON
//! GET  /media/:key      stored object bytes
//! ```
//!
//! Handlers are thin: multipart decoding and status mapping live here,
//! every decision about what gets stored lives in [`Pipeline`].

use crate::annotate::Pipeline;
use crate::error::{AnnotateError, InvalidInput};
use crate::gallery::{list_gallery, GalleryItem};
use crate::pipeline::validate::Upload;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "image";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }
}

/// Build the application router.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(gallery))
        .route("/api/images", get(gallery))
        .route("/media/:key", get(media))
        .route(
            "/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error body: `{"error": "<user-safe message>"}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<AnnotateError> for ApiError {
    fn from(e: AnnotateError) -> Self {
        let status = StatusCode::from_u16(e.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, e.user_message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// `POST /upload`
///
/// A body that is not multipart at all is answered like a form without a file.
async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Redirect, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "upload: not a multipart request");
        ApiError::from(AnnotateError::from(InvalidInput::MissingFile))
    })?;
    let upload = read_image_field(multipart).await?;
    state.pipeline.process_upload(upload).await?;
    Ok(Redirect::to("/"))
}

/// Pull the `image` field out of the form; other fields are ignored.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(Upload {
            filename,
            bytes: bytes.to_vec(),
            content_type,
        }));
    }
    Ok(None)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    let status = e.status();
    warn!(error = %e, "upload: unreadable multipart body");
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(status, "File too large")
    } else {
        ApiError::from(AnnotateError::from(InvalidInput::MissingFile))
    }
}

#[derive(Serialize)]
struct GalleryResponse {
    images: Vec<GalleryItem>,
}

/// `GET /` and `GET /api/images`
async fn gallery(State(state): State<AppState>) -> Result<Json<GalleryResponse>, ApiError> {
    let images = list_gallery(state.pipeline.store().as_ref())
        .await
        .map_err(AnnotateError::from)?;
    Ok(Json(GalleryResponse { images }))
}

/// `GET /media/:key`
async fn media(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    match state.pipeline.store().get(&key).await {
        Ok(Some(blob)) => Ok(([(header::CONTENT_TYPE, blob.content_type)], blob.bytes).into_response()),
        Ok(None) | Err(crate::error::StoreError::InvalidKey { .. }) => {
            Err(ApiError::new(StatusCode::NOT_FOUND, "Not found"))
        }
        Err(e) => Err(AnnotateError::from(e).into()),
    }
}
