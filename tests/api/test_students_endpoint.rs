// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Students endpoint tests for GET /students
//!
//! The roster must be the file stems of the reference image directory, in
//! stable order, and the count must equal the number of loaded identities.

use axum::extract::State;
use proctor_node::api::{students_handler, AppState};
use proctor_node::pipeline::FrameAnalyzer;
use proctor_node::students::ReferenceDatabase;
use proctor_node::vision::{VisionModelConfig, VisionModelManager};
use std::sync::Arc;

async fn state_with_reference_dir(dir: &std::path::Path) -> AppState {
    let models = VisionModelManager::new(VisionModelConfig::none())
        .await
        .unwrap();
    let students = ReferenceDatabase::load(dir, &models);
    AppState::new(Arc::new(FrameAnalyzer::new(
        Arc::new(models),
        Arc::new(students),
    )))
}

#[tokio::test]
async fn test_students_empty_without_directory() {
    let state = AppState::new_for_test().await;

    let response = students_handler(State(state)).await.0;
    assert!(response.students.is_empty());
    assert_eq!(response.count, 0);
}

#[tokio::test]
async fn test_students_lists_image_stems() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alice.png"), b"x").unwrap();
    std::fs::write(dir.path().join("bob.jpeg"), b"x").unwrap();
    std::fs::write(dir.path().join("README.md"), b"x").unwrap();

    let state = state_with_reference_dir(dir.path()).await;

    let response = students_handler(State(state)).await.0;
    assert_eq!(response.students, vec!["alice", "bob"]);
    assert_eq!(response.count, 2);
}

#[tokio::test]
async fn test_students_count_matches_list_length() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.png", "b.png", "c.jpg", "d.jpeg"] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }

    let state = state_with_reference_dir(dir.path()).await;

    let response = students_handler(State(state)).await.0;
    assert_eq!(response.count, response.students.len());
    assert_eq!(response.count, 4);
}
