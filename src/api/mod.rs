// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;
pub mod errors;
pub mod http_server;

pub use analyze::{analyze_frame_base64_handler, analyze_frame_handler, Base64FrameRequest};
pub use errors::{ApiError, ErrorResponse};
pub use http_server::{
    create_app, health_handler, start_server, students_handler, AppState, HealthResponse,
    StudentsResponse,
};
