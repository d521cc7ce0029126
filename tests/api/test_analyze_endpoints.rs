// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Analyze endpoint tests for POST /analyze_frame_base64
//!
//! These tests verify that the handler:
//! - Validates requests and returns 400 for malformed payloads
//! - Runs the pipeline and returns a well-formed report
//! - Upholds the report invariants on every input

use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{Rgb, RgbImage};
use proctor_node::api::{analyze_frame_base64_handler, AppState, Base64FrameRequest};

// 1x1 red PNG - minimal valid image
const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

/// Helper: encode a solid-color frame as base64 PNG
fn png_base64(width: u32, height: u32, luma: u8) -> String {
    let image = RgbImage::from_pixel(width, height, Rgb([luma, luma, luma]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("PNG encode");
    STANDARD.encode(&buf)
}

fn request_with(image: Option<String>) -> Json<Base64FrameRequest> {
    Json(Base64FrameRequest { image })
}

#[tokio::test]
async fn test_missing_image_returns_400() {
    let state = AppState::new_for_test().await;

    let result = analyze_frame_base64_handler(State(state), request_with(None)).await;

    let (status, message) = result.unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("Image data not provided"));
}

#[tokio::test]
async fn test_empty_image_returns_400() {
    let state = AppState::new_for_test().await;

    let result =
        analyze_frame_base64_handler(State(state), request_with(Some(String::new()))).await;

    assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_base64_returns_400() {
    let state = AppState::new_for_test().await;

    let result = analyze_frame_base64_handler(
        State(state),
        request_with(Some("!!!not-base64!!!".to_string())),
    )
    .await;

    let (status, message) = result.unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(message.contains("Invalid base64 image"));
}

#[tokio::test]
async fn test_base64_of_non_image_returns_400() {
    let state = AppState::new_for_test().await;

    // Valid base64, but the bytes are not any known image format
    let payload = STANDARD.encode(b"just some text, not pixels");
    let result = analyze_frame_base64_handler(State(state), request_with(Some(payload))).await;

    assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tiny_png_returns_report() {
    let state = AppState::new_for_test().await;

    let result = analyze_frame_base64_handler(
        State(state),
        request_with(Some(TINY_PNG_BASE64.to_string())),
    )
    .await;

    let report = result.expect("valid image must produce a report").0;
    assert_eq!(report.people_count, 0);
    assert!(!report.face_detected);
    assert_eq!(report.person_name, "Unknown");
}

#[tokio::test]
async fn test_blank_gray_frame_reports_no_people() {
    let state = AppState::new_for_test().await;

    let payload = png_base64(320, 240, 128);
    let result = analyze_frame_base64_handler(State(state), request_with(Some(payload))).await;

    let report = result.expect("valid image must produce a report").0;
    assert!(!report.face_detected);
    assert!(!report.face_verified);
    assert!(report
        .alerts
        .iter()
        .any(|a| a.contains("No people") || a.contains("No face")));
}

#[tokio::test]
async fn test_verified_implies_detected() {
    let state = AppState::new_for_test().await;

    for payload in [
        TINY_PNG_BASE64.to_string(),
        png_base64(320, 240, 128),
        png_base64(64, 64, 0),
    ] {
        let result =
            analyze_frame_base64_handler(State(state.clone()), request_with(Some(payload))).await;
        let report = result.expect("valid image must produce a report").0;
        assert!(
            !report.face_verified || report.face_detected,
            "face_verified must imply face_detected"
        );
    }
}
