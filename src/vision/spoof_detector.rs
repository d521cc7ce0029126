// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Anti-spoofing check
//!
//! Wraps a pre-trained presentation-attack classifier (MiniFASNet-class)
//! that scores a face crop. Blocks printed photographs and screen replays
//! held in front of the camera; high-quality 3D masks are out of scope for
//! models of this class.

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

/// Model input resolution (MiniFASNet convention)
const SPOOF_INPUT_SIZE: u32 = 80;

/// Spoof probability above which the frame is flagged
const SPOOF_THRESHOLD: f32 = 0.5;

/// Class index of "real face" in multi-class classifier outputs
const REAL_CLASS_INDEX: usize = 1;

/// Anti-spoofing classifier backed by an ONNX Runtime session.
#[derive(Clone)]
pub struct SpoofDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for SpoofDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpoofDetector")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl SpoofDetector {
    /// Load the anti-spoofing model from a file.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Anti-spoofing model not found: {}", model_path.display());
        }

        info!("Loading anti-spoofing model from {}", model_path.display());

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
                "Failed to load anti-spoofing model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        info!("✅ Anti-spoofing model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Spoof probability for a face region, in [0, 1].
    pub fn spoof_score(&self, frame: &DynamicImage, face: &BoxRegion) -> Result<f32> {
        let input = crop_to_tensor(frame, face, SPOOF_INPUT_SIZE, Normalization::ZeroToOne);
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Anti-spoofing inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let logits: Vec<f32> = output_tensor.iter().copied().collect();
        let score = spoof_score_from_logits(&logits)?;
        debug!("Spoof score: {:.3}", score);
        Ok(score)
    }

    /// Whether a score crosses the fixed alert threshold.
    pub fn is_spoof(score: f32) -> bool {
        score >= SPOOF_THRESHOLD
    }
}

/// Map classifier output to a spoof probability.
///
/// Single-logit models emit a liveness logit; multi-class models emit
/// softmax logits with the real class at [`REAL_CLASS_INDEX`]
/// (MiniFASNet layout).
fn spoof_score_from_logits(logits: &[f32]) -> Result<f32> {
    match logits.len() {
        0 => anyhow::bail!("Anti-spoofing model produced an empty output"),
        1 => {
            let liveness = 1.0 / (1.0 + (-logits[0]).exp());
            Ok(1.0 - liveness)
        }
        _ => {
            let max = logits.iter().cloned().fold(f32::MIN, f32::max);
            let exp: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
            let sum: f32 = exp.iter().sum();
            let real_prob = exp.get(REAL_CLASS_INDEX).copied().unwrap_or(0.0) / sum;
            Ok(1.0 - real_prob)
        }
    }
}
