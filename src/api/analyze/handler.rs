// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame analysis endpoint handlers

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info, warn};

use super::request::Base64FrameRequest;
use crate::api::http_server::AppState;
use crate::pipeline::AnalysisReport;
use crate::vision::{decode_base64_frame, decode_frame_bytes};

/// POST /analyze_frame - Analyze a single uploaded frame
///
/// Accepts a multipart upload with the frame in the `file` field and
/// returns the pipeline verdict.
///
/// # Errors
/// - 400 Bad Request: missing file field or undecodable image
pub async fn analyze_frame_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, (StatusCode, String)> {
    // 1. Pull the uploaded file out of the multipart stream
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Invalid multipart payload: {}", e);
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid multipart payload: {}", e),
        )
    })? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|e| {
                warn!("Failed to read upload: {}", e);
                (StatusCode::BAD_REQUEST, format!("Failed to read upload: {}", e))
            })?;
            upload = Some(bytes);
            break;
        }
    }

    let bytes = upload.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "file field is required".to_string(),
        )
    })?;

    // 2. Decode the frame
    let (frame, frame_info) = decode_frame_bytes(&bytes).map_err(|e| {
        warn!("Failed to decode uploaded frame: {}", e);
        (StatusCode::BAD_REQUEST, format!("Invalid image file: {}", e))
    })?;

    debug!(
        "Decoded upload: {}x{}, {} bytes",
        frame_info.width, frame_info.height, frame_info.size_bytes
    );

    // 3. Run the pipeline
    let report = state.analyzer.analyze(&frame);

    info!(
        "Frame analyzed: {} people, face_detected={}, {} alerts",
        report.people_count,
        report.face_detected,
        report.alerts.len()
    );

    Ok(Json(report))
}

/// POST /analyze_frame_base64 - Analyze a base64-encoded frame
///
/// Accepts `{"image": "<base64>"}` and returns the same verdict shape as
/// the multipart endpoint.
///
/// # Errors
/// - 400 Bad Request: missing image key, invalid base64, or undecodable image
pub async fn analyze_frame_base64_handler(
    State(state): State<AppState>,
    Json(request): Json<Base64FrameRequest>,
) -> Result<Json<AnalysisReport>, (StatusCode, String)> {
    // 1. Validate request
    if let Err(e) = request.validate() {
        warn!("Frame request validation failed: {}", e);
        return Err((StatusCode::BAD_REQUEST, e.to_string()));
    }

    // Validation guarantees the key is present
    let image_data = request.image.as_deref().unwrap_or_default();

    // 2. Decode the frame
    let (frame, frame_info) = decode_base64_frame(image_data).map_err(|e| {
        warn!("Failed to decode base64 frame: {}", e);
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid base64 image: {}", e),
        )
    })?;

    debug!(
        "Decoded base64 frame: {}x{}, {} bytes",
        frame_info.width, frame_info.height, frame_info.size_bytes
    );

    // 3. Run the pipeline
    let report = state.analyzer.analyze(&frame);

    info!(
        "Frame analyzed: {} people, face_detected={}, {} alerts",
        report.people_count,
        report.face_detected,
        report.alerts.len()
    );

    Ok(Json(report))
}
