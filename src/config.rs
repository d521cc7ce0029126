// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration read from environment variables

use std::env;

/// Runtime configuration for the proctoring service.
///
/// Every field has a default so the node starts with no environment at all;
/// missing model files degrade the matching capability instead of failing.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP API listens on
    pub api_port: u16,
    /// Directory of labeled student reference images
    pub student_db_dir: String,
    /// YOLO object detection model (COCO vocabulary)
    pub object_model_path: String,
    /// ONNX face detection model
    pub face_model_path: String,
    /// SeetaFace cascade model, the simplified face-detection fallback
    pub cascade_model_path: String,
    /// Face descriptor (recognition) model
    pub embed_model_path: String,
    /// Head-pose regression model
    pub head_pose_model_path: String,
    /// Anti-spoofing classifier model
    pub spoof_model_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: 7860,
            student_db_dir: "./student_db".to_string(),
            object_model_path: "./models/yolov8n.onnx".to_string(),
            face_model_path: "./models/yolov8n-face.onnx".to_string(),
            cascade_model_path: "./models/seeta_fd_frontal_v1.0.bin".to_string(),
            embed_model_path: "./models/arcface-r50.onnx".to_string(),
            head_pose_model_path: "./models/fsanet-headpose.onnx".to_string(),
            spoof_model_path: "./models/minifasnet-v2.onnx".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Build the configuration from environment variables, falling back to
    /// the defaults above for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.api_port);

        Self {
            api_port,
            student_db_dir: env::var("STUDENT_DB_DIR").unwrap_or(defaults.student_db_dir),
            object_model_path: env::var("OBJECT_MODEL_PATH").unwrap_or(defaults.object_model_path),
            face_model_path: env::var("FACE_MODEL_PATH").unwrap_or(defaults.face_model_path),
            cascade_model_path: env::var("CASCADE_MODEL_PATH")
                .unwrap_or(defaults.cascade_model_path),
            embed_model_path: env::var("FACE_EMBED_MODEL_PATH")
                .unwrap_or(defaults.embed_model_path),
            head_pose_model_path: env::var("HEAD_POSE_MODEL_PATH")
                .unwrap_or(defaults.head_pose_model_path),
            spoof_model_path: env::var("SPOOF_MODEL_PATH").unwrap_or(defaults.spoof_model_path),
        }
    }
}
