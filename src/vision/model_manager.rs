// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for the proctoring capabilities
//!
//! Every model is optional: a missing or unloadable file is logged and the
//! capability is reported unavailable, it never stops the service.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::vision::face_detector::{CascadeFaceDetector, OnnxFaceDetector};
use crate::vision::face_embedder::FaceEmbedder;
use crate::vision::head_pose::HeadPoseEstimator;
use crate::vision::object_detector::YoloObjectDetector;
use crate::vision::spoof_detector::SpoofDetector;

/// Configuration for loading the vision models
#[derive(Debug, Clone, Default)]
pub struct VisionModelConfig {
    pub object_model_path: Option<String>,
    pub face_model_path: Option<String>,
    pub cascade_model_path: Option<String>,
    pub embed_model_path: Option<String>,
    pub head_pose_model_path: Option<String>,
    pub spoof_model_path: Option<String>,
}

impl VisionModelConfig {
    /// All capabilities taken from the service configuration.
    pub fn from_service(config: &ServiceConfig) -> Self {
        Self {
            object_model_path: Some(config.object_model_path.clone()),
            face_model_path: Some(config.face_model_path.clone()),
            cascade_model_path: Some(config.cascade_model_path.clone()),
            embed_model_path: Some(config.embed_model_path.clone()),
            head_pose_model_path: Some(config.head_pose_model_path.clone()),
            spoof_model_path: Some(config.spoof_model_path.clone()),
        }
    }

    /// No capabilities at all; the pipeline degrades to its fallbacks.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Which optional capabilities actually loaded, as surfaced by `/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelStatus {
    pub object_detection: bool,
    pub face_detection: bool,
    pub face_recognition: bool,
    pub head_pose: bool,
    pub anti_spoofing: bool,
}

/// Manager for the proctoring vision models.
///
/// All models run on CPU and are immutable after startup; handlers share
/// the manager behind an `Arc`.
pub struct VisionModelManager {
    object_detector: Option<Arc<YoloObjectDetector>>,
    face_detector: Option<Arc<OnnxFaceDetector>>,
    cascade_detector: Option<Arc<CascadeFaceDetector>>,
    face_embedder: Option<Arc<FaceEmbedder>>,
    head_pose: Option<Arc<HeadPoseEstimator>>,
    spoof_detector: Option<Arc<SpoofDetector>>,
}

impl std::fmt::Debug for VisionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionModelManager")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

macro_rules! load_optional {
    ($path:expr, $label:expr, $loader:expr) => {
        match $path {
            Some(ref path) => match $loader(path).await {
                Ok(model) => {
                    tracing::info!("✅ {} loaded from {}", $label, path);
                    Some(Arc::new(model))
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to load {} from {}: {}", $label, path, e);
                    None
                }
            },
            None => None,
        }
    };
}

impl VisionModelManager {
    /// Load every configured model, tolerating individual failures.
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let object_detector = load_optional!(
            config.object_model_path,
            "object detection model",
            |p: &String| {
                let p = p.clone();
                async move { YoloObjectDetector::new(p).await }
            }
        );

        let face_detector = load_optional!(
            config.face_model_path,
            "face detection model",
            |p: &String| {
                let p = p.clone();
                async move { OnnxFaceDetector::new(p).await }
            }
        );

        // The cascade fallback load is synchronous; wrap it for the macro
        let cascade_detector = load_optional!(
            config.cascade_model_path,
            "cascade face model",
            |p: &String| {
                let p = p.clone();
                async move { CascadeFaceDetector::new(p) }
            }
        );

        let face_embedder = load_optional!(
            config.embed_model_path,
            "face descriptor model",
            |p: &String| {
                let p = p.clone();
                async move { FaceEmbedder::new(p).await }
            }
        );

        let head_pose = load_optional!(
            config.head_pose_model_path,
            "head-pose model",
            |p: &String| {
                let p = p.clone();
                async move { HeadPoseEstimator::new(p).await }
            }
        );

        let spoof_detector = load_optional!(
            config.spoof_model_path,
            "anti-spoofing model",
            |p: &String| {
                let p = p.clone();
                async move { SpoofDetector::new(p).await }
            }
        );

        Ok(Self {
            object_detector,
            face_detector,
            cascade_detector,
            face_embedder,
            head_pose,
            spoof_detector,
        })
    }

    pub fn get_object_detector(&self) -> Option<Arc<YoloObjectDetector>> {
        self.object_detector.clone()
    }

    pub fn get_face_detector(&self) -> Option<Arc<OnnxFaceDetector>> {
        self.face_detector.clone()
    }

    pub fn get_cascade_detector(&self) -> Option<Arc<CascadeFaceDetector>> {
        self.cascade_detector.clone()
    }

    pub fn get_face_embedder(&self) -> Option<Arc<FaceEmbedder>> {
        self.face_embedder.clone()
    }

    pub fn get_head_pose(&self) -> Option<Arc<HeadPoseEstimator>> {
        self.head_pose.clone()
    }

    pub fn get_spoof_detector(&self) -> Option<Arc<SpoofDetector>> {
        self.spoof_detector.clone()
    }

    /// Whether any face-detection path (ONNX or cascade) is available.
    pub fn has_face_detection(&self) -> bool {
        self.face_detector.is_some() || self.cascade_detector.is_some()
    }

    /// Detect faces with whichever detection path is loaded, highest
    /// confidence first. The ONNX model wins when both are present.
    pub fn detect_faces(
        &self,
        frame: &image::DynamicImage,
    ) -> anyhow::Result<Vec<crate::vision::preprocessing::BoxRegion>> {
        if let Some(detector) = &self.face_detector {
            return detector.detect(frame);
        }
        if let Some(cascade) = &self.cascade_detector {
            return Ok(cascade.detect(&frame.to_luma8()));
        }
        anyhow::bail!("No face detection capability loaded")
    }

    /// Capability booleans for `/health`.
    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            object_detection: self.object_detector.is_some(),
            face_detection: self.has_face_detection(),
            face_recognition: self.face_embedder.is_some(),
            head_pose: self.head_pose.is_some(),
            anti_spoofing: self.spoof_detector.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_none_is_empty() {
        let config = VisionModelConfig::none();
        assert!(config.object_model_path.is_none());
        assert!(config.spoof_model_path.is_none());
    }

    #[test]
    fn test_config_from_service() {
        let config = VisionModelConfig::from_service(&ServiceConfig::default());
        assert!(config.object_model_path.is_some());
        assert!(config.cascade_model_path.is_some());
        assert!(config.embed_model_path.is_some());
    }

    #[tokio::test]
    async fn test_manager_with_no_models() {
        let manager = VisionModelManager::new(VisionModelConfig::none())
            .await
            .unwrap();

        let status = manager.status();
        assert!(!status.object_detection);
        assert!(!status.face_detection);
        assert!(!status.face_recognition);
        assert!(!status.head_pose);
        assert!(!status.anti_spoofing);
        assert!(manager.get_object_detector().is_none());
    }

    #[tokio::test]
    async fn test_manager_tolerates_missing_files() {
        // Paths that do not exist must degrade, not fail
        let config = VisionModelConfig {
            object_model_path: Some("/nonexistent/yolo.onnx".to_string()),
            face_model_path: Some("/nonexistent/face.onnx".to_string()),
            cascade_model_path: Some("/nonexistent/seeta.bin".to_string()),
            embed_model_path: Some("/nonexistent/arcface.onnx".to_string()),
            head_pose_model_path: Some("/nonexistent/pose.onnx".to_string()),
            spoof_model_path: Some("/nonexistent/spoof.onnx".to_string()),
        };
        let manager = VisionModelManager::new(config).await.unwrap();
        assert_eq!(
            manager.status(),
            ModelStatus {
                object_detection: false,
                face_detection: false,
                face_recognition: false,
                head_pose: false,
                anti_spoofing: false,
            }
        );
    }

    #[test]
    fn test_status_serialization() {
        let status = ModelStatus {
            object_detection: true,
            face_detection: false,
            face_recognition: true,
            head_pose: false,
            anti_spoofing: false,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"object_detection\":true"));
        assert!(json.contains("\"face_detection\":false"));
    }
}
