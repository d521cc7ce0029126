// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Head-pose estimation
//!
//! Wraps a pre-trained pose regression model (FSANet-class) that maps a
//! face crop to Euler angles in degrees. The pipeline only asks one
//! question of the result: is the candidate looking away from the screen.

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{crop_to_tensor, BoxRegion, Normalization};

/// Model input resolution
const POSE_INPUT_SIZE: u32 = 224;

/// Yaw beyond which the candidate is considered looking away
const YAW_TOLERANCE_DEG: f32 = 30.0;

/// Pitch beyond which the candidate is considered looking away
const PITCH_TOLERANCE_DEG: f32 = 20.0;

/// Euler angles of a detected head, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl HeadPose {
    /// Whether the orientation exceeds the fixed proctoring tolerance.
    pub fn exceeds_tolerance(&self) -> bool {
        self.yaw.abs() > YAW_TOLERANCE_DEG || self.pitch.abs() > PITCH_TOLERANCE_DEG
    }
}

/// Head-pose regression model backed by an ONNX Runtime session.
#[derive(Clone)]
pub struct HeadPoseEstimator {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for HeadPoseEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadPoseEstimator")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl HeadPoseEstimator {
    /// Load the head-pose model from a file.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Head-pose model not found: {}", model_path.display());
        }

        info!("Loading head-pose model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load head-pose model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        info!("✅ Head-pose model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Estimate the pose of a detected face region.
    pub fn estimate(&self, frame: &DynamicImage, face: &BoxRegion) -> Result<HeadPose> {
        let input = crop_to_tensor(frame, face, POSE_INPUT_SIZE, Normalization::ImageNet);
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Head-pose inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // Output is a flat [yaw, pitch, roll] vector in degrees
        let angles: Vec<f32> = output_tensor.iter().copied().collect();
        if angles.len() < 3 {
            anyhow::bail!("Head-pose output too short: {} values", angles.len());
        }

        let pose = HeadPose {
            yaw: angles[0],
            pitch: angles[1],
            roll: angles[2],
        };
        debug!(
            "Head pose: yaw={:.1} pitch={:.1} roll={:.1}",
            pose.yaw, pose.pitch, pose.roll
        );
        Ok(pose)
    }
}
