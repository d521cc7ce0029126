// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision capabilities: frame decoding, detection models, model manager

pub mod face_detector;
pub mod face_embedder;
pub mod head_pose;
pub mod image_utils;
pub mod model_manager;
pub mod object_detector;
pub mod preprocessing;
pub mod spoof_detector;

pub use face_detector::{CascadeFaceDetector, OnnxFaceDetector};
pub use face_embedder::{cosine_similarity, FaceEmbedder};
pub use head_pose::{HeadPose, HeadPoseEstimator};
pub use image_utils::{
    decode_base64_frame, decode_frame_bytes, downscale_for_analysis, FrameError, FrameInfo,
};
pub use model_manager::{ModelStatus, VisionModelConfig, VisionModelManager};
pub use object_detector::{count_significant_regions, ObjectDetection, YoloObjectDetector};
pub use preprocessing::BoxRegion;
pub use spoof_detector::SpoofDetector;
