// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Health endpoint tests for GET /health
//!
//! The booleans must reflect exactly which optional capabilities loaded
//! without error, and the student count must match the loaded database.

use axum::extract::State;
use proctor_node::api::{health_handler, AppState};
use proctor_node::pipeline::FrameAnalyzer;
use proctor_node::students::{ReferenceDatabase, StudentEntry};
use proctor_node::vision::{VisionModelConfig, VisionModelManager};
use std::sync::Arc;

#[tokio::test]
async fn test_health_reports_all_capabilities_absent() {
    let state = AppState::new_for_test().await;

    let response = health_handler(State(state)).await.0;

    assert_eq!(response.status, "healthy");
    assert!(!response.models_loaded.object_detection);
    assert!(!response.models_loaded.face_detection);
    assert!(!response.models_loaded.face_recognition);
    assert!(!response.models_loaded.head_pose);
    assert!(!response.models_loaded.anti_spoofing);
}

#[tokio::test]
async fn test_health_reports_missing_model_files_as_absent() {
    // Configured paths that do not exist: load is tolerated, capability off
    let config = VisionModelConfig {
        object_model_path: Some("/nonexistent/yolo.onnx".to_string()),
        face_model_path: Some("/nonexistent/face.onnx".to_string()),
        cascade_model_path: None,
        embed_model_path: Some("/nonexistent/arcface.onnx".to_string()),
        head_pose_model_path: None,
        spoof_model_path: None,
    };
    let models = VisionModelManager::new(config).await.unwrap();
    let state = AppState::new(Arc::new(FrameAnalyzer::new(
        Arc::new(models),
        Arc::new(ReferenceDatabase::default()),
    )));

    let response = health_handler(State(state)).await.0;

    assert_eq!(response.status, "healthy");
    assert!(!response.models_loaded.object_detection);
    assert!(!response.models_loaded.face_detection);
    assert!(!response.models_loaded.face_recognition);
}

#[tokio::test]
async fn test_health_counts_loaded_students() {
    let models = VisionModelManager::new(VisionModelConfig::none())
        .await
        .unwrap();
    let students = ReferenceDatabase::from_entries(vec![
        StudentEntry {
            name: "alice".to_string(),
            descriptor: None,
        },
        StudentEntry {
            name: "bob".to_string(),
            descriptor: None,
        },
    ]);
    let state = AppState::new(Arc::new(FrameAnalyzer::new(
        Arc::new(models),
        Arc::new(students),
    )));

    let response = health_handler(State(state)).await.0;
    assert_eq!(response.students_loaded, 2);
}
