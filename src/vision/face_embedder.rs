// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Face descriptor model
//!
//! Wraps an ArcFace-class ONNX model that maps an aligned face crop to a
//! fixed-length descriptor. Descriptors are L2-normalized on the way out so
//! identity matching reduces to cosine similarity.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::preprocessing::{crop_to_tensor, BoxRegion, Normalization};

/// Model input resolution (ArcFace convention)
const EMBED_INPUT_SIZE: u32 = 112;

/// Face descriptor model backed by an ONNX Runtime session.
#[derive(Clone)]
pub struct FaceEmbedder {
    session: Arc<Mutex<Session>>,
    input_name: String,
    dimension: usize,
}

impl std::fmt::Debug for FaceEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceEmbedder")
            .field("input_name", &self.input_name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl FaceEmbedder {
    /// Load the descriptor model and validate its output shape with a
    /// throwaway inference.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Face descriptor model not found: {}", model_path.display());
        }

        info!("Loading face descriptor model from {}", model_path.display());

        let mut session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load face descriptor model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        // Probe the output dimension with a zero tensor; anything that is
        // not a flat [1, D] vector is rejected at load time.
        let dimension = {
            let probe = Array4::<f32>::zeros((
                1,
                3,
                EMBED_INPUT_SIZE as usize,
                EMBED_INPUT_SIZE as usize,
            ));
            let probe_value =
                Value::from_array(probe).context("Failed to create probe tensor")?;
            let outputs = session
                .run(ort::inputs![&input_name => probe_value])
                .context("Descriptor probe inference failed")?;
            let output_tensor = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract probe output")?;
            let dim = output_tensor.len();
            if dim == 0 {
                anyhow::bail!("Descriptor model produced an empty output");
            }
            dim
        };

        info!(
            "✅ Face descriptor model loaded successfully ({}-dimensional)",
            dimension
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            dimension,
        })
    }

    /// Output descriptor length.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Compute the L2-normalized descriptor for a face region.
    pub fn embed(&self, frame: &DynamicImage, face: &BoxRegion) -> Result<Vec<f32>> {
        let input = crop_to_tensor(frame, face, EMBED_INPUT_SIZE, Normalization::ArcFace);
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Descriptor inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let mut descriptor: Vec<f32> = output_tensor.iter().copied().collect();
        if descriptor.len() != self.dimension {
            anyhow::bail!(
                "Descriptor length {} does not match model dimension {}",
                descriptor.len(),
                self.dimension
            );
        }

        l2_normalize(&mut descriptor);
        Ok(descriptor)
    }
}

/// Normalize a vector to unit length in place; zero vectors are left as-is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity of two descriptors (assumed normalized; falls back to
/// the full formula when they are not).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
