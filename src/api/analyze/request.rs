// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame analysis request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Maximum accepted payload (10MB base64 encoded)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Request body for `POST /analyze_frame_base64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Base64FrameRequest {
    /// Base64-encoded image data
    #[serde(default)]
    pub image: Option<String>,
}

impl Base64FrameRequest {
    /// Validate the request before decoding.
    pub fn validate(&self) -> Result<(), ApiError> {
        let Some(ref image) = self.image else {
            return Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: "Image data not provided".to_string(),
            });
        };

        if image.is_empty() {
            return Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: "Image data not provided".to_string(),
            });
        }

        if image.len() > MAX_IMAGE_SIZE {
            return Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: format!("image exceeds maximum size of {} bytes", MAX_IMAGE_SIZE),
            });
        }

        Ok(())
    }
}
