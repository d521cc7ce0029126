// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP surface of the proctoring node

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};

use crate::api::analyze::{analyze_frame_base64_handler, analyze_frame_handler};
use crate::pipeline::FrameAnalyzer;
use crate::vision::ModelStatus;

/// Shared state behind every handler: the analyzer owns the loaded models
/// and the reference database, both immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<FrameAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: Arc<FrameAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// State with no models and an empty reference database.
    pub async fn new_for_test() -> Self {
        use crate::students::ReferenceDatabase;
        use crate::vision::{VisionModelConfig, VisionModelManager};

        let models = VisionModelManager::new(VisionModelConfig::none())
            .await
            .expect("empty model manager");
        Self::new(Arc::new(FrameAnalyzer::new(
            Arc::new(models),
            Arc::new(ReferenceDatabase::default()),
        )))
    }
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub models_loaded: ModelStatus,
    pub students_loaded: usize,
}

/// Response for `GET /students`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentsResponse {
    pub students: Vec<String>,
    pub count: usize,
}

/// Build the router with every route registered.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/students", get(students_handler))
        .route("/analyze_frame", post(analyze_frame_handler))
        .route("/analyze_frame_base64", post(analyze_frame_base64_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve the API until the process exits.
pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> axum::response::Json<serde_json::Value> {
    axum::response::Json(json!({
        "message": "Intelligent Online Exam Proctoring System API",
        "version": crate::version::VERSION_NUMBER,
        "status": "running",
    }))
}

pub async fn health_handler(State(state): State<AppState>) -> axum::response::Json<HealthResponse> {
    let analyzer = &state.analyzer;
    axum::response::Json(HealthResponse {
        status: "healthy".to_string(),
        models_loaded: analyzer.models().status(),
        students_loaded: analyzer.students().len(),
    })
}

pub async fn students_handler(
    State(state): State<AppState>,
) -> axum::response::Json<StudentsResponse> {
    let students = state.analyzer.students().names();
    let count = students.len();
    axum::response::Json(StudentsResponse { students, count })
}
