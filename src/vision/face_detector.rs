// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Face detection
//!
//! Primary path is a YOLO-face ONNX model. When that model is not on disk
//! the service falls back to the SeetaFace cascade engine (`rustface`),
//! the simplified variant of this capability.

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{letterbox, nms, BoxRegion};

/// Model input resolution for the ONNX face detector
const FACE_INPUT_SIZE: u32 = 640;

/// Confidence threshold for face boxes
const CONFIDENCE_THRESHOLD: f32 = 0.25;

/// NMS IoU threshold
const NMS_IOU_THRESH: f32 = 0.45;

/// ONNX face detector (YOLO-face output layout).
#[derive(Clone)]
pub struct OnnxFaceDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for OnnxFaceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxFaceDetector")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxFaceDetector {
    /// Load the face detection model from a file.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Face detection model not found: {}", model_path.display());
        }

        info!("Loading face detection model from {}", model_path.display());

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
                "Failed to load face detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        info!("✅ Face detection model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Detect faces, highest confidence first.
    pub fn detect(&self, frame: &DynamicImage) -> Result<Vec<BoxRegion>> {
        let (input, scale, pad_x, pad_y) = letterbox(frame, FACE_INPUT_SIZE);

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Face detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let shape = output_tensor.shape().to_vec();
        // Face model emits [1, F, N] (transposed) or [1, N, F] with
        // row format [cx, cy, w, h, conf, landmarks...]
        if shape.len() != 3 {
            anyhow::bail!("Unexpected face detection output shape: {:?}", shape);
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            anyhow::bail!("Face detection output rows too short: {}", num_feats);
        }

        let data = output_tensor
            .as_slice()
            .context("Output tensor is not contiguous")?;

        let mut boxes = Vec::new();
        for i in 0..num_dets {
            let at = |feat: usize| -> f32 {
                if transposed {
                    data[feat * num_dets + i]
                } else {
                    data[i * num_feats + feat]
                }
            };

            let conf = at(4);
            if conf < CONFIDENCE_THRESHOLD {
                continue;
            }

            let (cx, cy, w, h) = (at(0), at(1), at(2), at(3));
            boxes.push(BoxRegion {
                x: (cx - w / 2.0 - pad_x as f32) / scale,
                y: (cy - h / 2.0 - pad_y as f32) / scale,
                width: w / scale,
                height: h / scale,
                confidence: conf,
            });
        }

        let faces = nms(boxes, NMS_IOU_THRESH);
        debug!("Detected {} faces", faces.len());
        Ok(faces)
    }
}

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The detector object itself is not shareable across threads, so the
/// loaded model is kept and a detector is created per call.
pub struct CascadeFaceDetector {
    model: rustface::Model,
}

impl std::fmt::Debug for CascadeFaceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeFaceDetector").finish_non_exhaustive()
    }
}

impl CascadeFaceDetector {
    /// Load the SeetaFace cascade model from a file.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Cascade face model not found: {}", model_path.display());
        }

        info!("Loading cascade face model from {}", model_path.display());

        let bytes = std::fs::read(model_path).context(format!(
            "Failed to read cascade face model from {}",
            model_path.display()
        ))?;
        let model = rustface::read_model(std::io::Cursor::new(bytes))
            .map_err(|e| anyhow::anyhow!("Failed to parse cascade face model: {:?}", e))?;

        info!("✅ Cascade face model loaded successfully");

        Ok(Self { model })
    }

    /// Detect faces in a grayscale frame, highest score first.
    pub fn detect(&self, gray: &GrayImage) -> Vec<BoxRegion> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(20);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let (width, height) = gray.dimensions();
        let image = rustface::ImageData::new(gray.as_raw(), width, height);

        let mut faces: Vec<BoxRegion> = detector
            .detect(&image)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                BoxRegion {
                    x: bbox.x() as f32,
                    y: bbox.y() as f32,
                    width: bbox.width() as f32,
                    height: bbox.height() as f32,
                    confidence: face.score() as f32,
                }
            })
            .collect();

        faces.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        faces
    }
}
