//! HTTP surface tests, driven through the router with `oneshot`.
#![cfg(feature = "server")]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::*;
use http_body_util::BodyExt;
use img_annotate::server::{build_router, AppState};
use img_annotate::{AnnotationFailure, Annotator, MemoryStore, Pipeline};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "img-annotate-test-boundary";

fn app_with(annotator: Option<Arc<dyn Annotator>>, limit: usize) -> (Router, Arc<MemoryStore>) {
    let (pipeline, store) = memory_pipeline(annotator);
    (build_router(AppState::new(pipeline), limit), store)
}

fn app(annotator: Option<Arc<dyn Annotator>>) -> (Router, Arc<MemoryStore>) {
    app_with(annotator, 1024 * 1024)
}

/// One-part multipart body. `filename = None` omits the attribute.
fn multipart(field: &str, filename: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn upload_redirects_to_gallery() {
    let (app, store) = app(Some(ScriptedAnnotator::replying(CAT_REPLY)));

    let response = app
        .oneshot(upload_request(multipart("image", Some("cat.png"), &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    assert_eq!(store.keys().await, ["cat.json", "cat.png"]);
}

#[tokio::test]
async fn wrong_extension_is_bad_request() {
    let (app, store) = app(Some(ScriptedAnnotator::replying(CAT_REPLY)));

    let response = app
        .oneshot(upload_request(multipart("image", Some("dog.txt"), &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Invalid file type" }));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn missing_image_field_is_bad_request() {
    let (app, store) = app(Some(ScriptedAnnotator::replying(CAT_REPLY)));

    let response = app
        .oneshot(upload_request(multipart("photo", Some("cat.png"), &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "No file part" }));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn non_multipart_body_is_json_bad_request() {
    let content_types = [
        None,
        Some("application/x-www-form-urlencoded"),
        Some("multipart/form-data"),
    ];
    for content_type in content_types {
        let (app, store) = app(Some(ScriptedAnnotator::replying(CAT_REPLY)));
        let mut request = Request::builder().method("POST").uri("/upload");
        if let Some(ct) = content_type {
            request = request.header(header::CONTENT_TYPE, ct);
        }
        let request = request.body(Body::from("image=cat.png")).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{content_type:?}");
        assert_eq!(
            body_json(response).await,
            json!({ "error": "No file part" }),
            "{content_type:?}"
        );
        assert_eq!(store.put_count(), 0);
    }
}

#[tokio::test]
async fn empty_filename_is_bad_request() {
    let (app, _store) = app(Some(ScriptedAnnotator::replying(CAT_REPLY)));

    let response = app
        .oneshot(upload_request(multipart("image", Some(""), &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "No selected file" }));
}

#[tokio::test]
async fn unparseable_reply_is_server_error_with_image_kept() {
    let (app, store) = app(Some(ScriptedAnnotator::replying("no json here")));

    let response = app
        .oneshot(upload_request(multipart("image", Some("cat.png"), &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Failed to parse AI response" })
    );
    assert_eq!(store.keys().await, ["cat.png"]);
}

#[tokio::test]
async fn model_failure_hides_provider_detail() {
    let annotator = ScriptedAnnotator::failing(AnnotationFailure::Provider {
        detail: "401 invalid api key sk-abc".into(),
    });
    let (app, _store) = app(Some(annotator));

    let response = app
        .oneshot(upload_request(multipart("image", Some("cat.png"), &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "AI did not return a response" })
    );
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (app, store) = app_with(Some(ScriptedAnnotator::replying(CAT_REPLY)), 64);

    let response = app
        .oneshot(upload_request(multipart("image", Some("cat.png"), &[0u8; 4096])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn gallery_lists_images_with_annotations() {
    let (pipeline, _store) = memory_pipeline(Some(ScriptedAnnotator::replying(CAT_REPLY)));
    let app = build_router(AppState::new(pipeline.clone()), 1024 * 1024);

    app.clone()
        .oneshot(upload_request(multipart("image", Some("cat.png"), &png_bytes())))
        .await
        .unwrap();

    // A second pipeline over the same store with no model: image only.
    let bare = Pipeline::new(
        pipeline.store().clone(),
        None,
        &img_annotate::AnnotateConfig::default(),
    );
    let _ = bare
        .process_upload(Some(img_annotate::Upload::new("dog.gif", gif_bytes())))
        .await;

    let response = app.oneshot(get("/api/images")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "images": [
                {
                    "key": "cat.png",
                    "url": "/media/cat.png",
                    "annotation": {
                        "description": "A cat sitting on a mat",
                        "caption": "Cozy cat"
                    }
                },
                { "key": "dog.gif", "url": "/media/dog.gif", "annotation": null }
            ]
        })
    );
}

#[tokio::test]
async fn media_serves_stored_bytes() {
    let (app, _store) = app(Some(ScriptedAnnotator::replying(CAT_REPLY)));
    let bytes = png_bytes();

    app.clone()
        .oneshot(upload_request(multipart("image", Some("cat.png"), &bytes)))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/media/cat.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), bytes.as_slice());

    let response = app.clone().oneshot(get("/media/cat.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), CAT_RECORD_JSON.as_bytes());

    let response = app.clone().oneshot(get("/media/missing.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/media/.hidden")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
