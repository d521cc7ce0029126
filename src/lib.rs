// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod pipeline;
pub mod students;
pub mod version;
pub mod vision;

// Re-export the main types
pub use api::{create_app, start_server, AppState};
pub use config::ServiceConfig;
pub use pipeline::{AnalysisReport, FrameAnalyzer};
pub use students::ReferenceDatabase;
pub use vision::{ModelStatus, VisionModelConfig, VisionModelManager};
