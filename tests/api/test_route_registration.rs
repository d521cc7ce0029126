// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Route registration tests
//!
//! These tests drive the real router end to end and verify that:
//! - Every endpoint is registered under the expected method
//! - Malformed analyze payloads return 400, never 200 or 500
//! - The multipart endpoint accepts the `file` field and nothing else

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use proctor_node::api::{create_app, AppState};
use tower::util::ServiceExt; // for `oneshot`

// 1x1 red PNG - minimal valid image
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

const BOUNDARY: &str = "proctor-test-boundary";

/// Build a multipart/form-data body with one file field.
fn multipart_body(field_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"frame.png\"\r\n",
            field_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_root_route_registered() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_route_registered() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_students_route_registered() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/students")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/no/such/route")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analyze_base64_rejects_get() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/analyze_frame_base64")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_analyze_base64_valid_payload() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/analyze_frame_base64")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"image": "{}"}}"#, TINY_PNG_BASE64)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(report.get("people_count").is_some());
    assert!(report.get("face_detected").is_some());
    assert!(report.get("alerts").is_some());
    assert_eq!(report["person_name"], "Unknown");
}

#[tokio::test]
async fn test_analyze_base64_missing_key_returns_400() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/analyze_frame_base64")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_base64_undecodable_returns_400() {
    let app = create_app(AppState::new_for_test().await);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/analyze_frame_base64")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"image": "AAAA"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_frame_accepts_file_upload() {
    let app = create_app(AppState::new_for_test().await);

    let png_bytes = STANDARD.decode(TINY_PNG_BASE64).unwrap();
    let response = app
        .oneshot(multipart_request(
            "/analyze_frame",
            multipart_body("file", &png_bytes),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_analyze_frame_missing_file_field_returns_400() {
    let app = create_app(AppState::new_for_test().await);

    let png_bytes = STANDARD.decode(TINY_PNG_BASE64).unwrap();
    let response = app
        .oneshot(multipart_request(
            "/analyze_frame",
            multipart_body("attachment", &png_bytes),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_frame_undecodable_upload_returns_400() {
    let app = create_app(AppState::new_for_test().await);

    let response = app
        .oneshot(multipart_request(
            "/analyze_frame",
            multipart_body("file", b"this is not an image"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
