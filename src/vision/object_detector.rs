// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Person and banned-object detection
//!
//! Wraps a pre-trained YOLOv8-class ONNX model over the COCO vocabulary.
//! The pipeline only cares about `person` plus the banned-object classes,
//! so everything else is filtered out straight after decoding.
//!
//! When no model is available the module degrades to
//! [`count_significant_regions`], a connected-component count over an
//! intensity-deviation map of the downscaled frame.

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

/// Model input resolution (YOLOv8 convention)
pub const DETECTION_INPUT_SIZE: u32 = 640;

/// Confidence threshold for detections
const CONFIDENCE_THRESHOLD: f32 = 0.25;

/// NMS IoU threshold
const NMS_IOU_THRESH: f32 = 0.45;

/// Minimum pixel count for a fallback foreground region
const MIN_REGION_AREA: usize = 1000;

/// Intensity deviation from the frame mean that marks a foreground pixel
const FOREGROUND_DEVIATION: i16 = 40;

/// COCO class vocabulary (index = class id in the model output)
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Objects that must not appear in an exam frame
pub const BANNED_CLASSES: [&str; 4] = ["laptop", "cell phone", "book", "tv"];

/// A detection the pipeline keeps: person or banned object.
#[derive(Debug, Clone)]
pub struct ObjectDetection {
    pub label: &'static str,
    pub region: BoxRegion,
}

impl ObjectDetection {
    pub fn is_person(&self) -> bool {
        self.label == "person"
    }

    pub fn is_banned(&self) -> bool {
        BANNED_CLASSES.contains(&self.label)
    }
}

/// YOLO object detector backed by an ONNX Runtime session.
///
/// Runs on CPU only; one inference at a time per session.
#[derive(Clone)]
pub struct YoloObjectDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for YoloObjectDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloObjectDetector")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl YoloObjectDetector {
    /// Load the object detection model from a file.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Object detection model not found: {}", model_path.display());
        }

        info!("Loading object detection model from {}", model_path.display());

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
                "Failed to load object detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        info!("✅ Object detection model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Detect persons and banned objects in a frame.
    pub fn detect(&self, frame: &DynamicImage) -> Result<Vec<ObjectDetection>> {
        let (input, scale, pad_x, pad_y) = letterbox(frame, DETECTION_INPUT_SIZE);

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Object detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let shape = output_tensor.shape().to_vec();
        debug!("Object detection output shape: {:?}", shape);

        // YOLOv8 emits [1, 4 + classes, N] (transposed) or [1, N, 4 + classes]
        if shape.len() != 3 {
            anyhow::bail!("Unexpected object detection output shape: {:?}", shape);
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };

        let data = output_tensor
            .as_slice()
            .context("Output tensor is not contiguous")?;

        let mut per_class: Vec<(usize, BoxRegion)> = Vec::new();
        for i in 0..num_dets {
            let at = |feat: usize| -> f32 {
                if transposed {
                    data[feat * num_dets + i]
                } else {
                    data[i * num_feats + feat]
                }
            };

            // row format: [cx, cy, w, h, class scores...]
            if num_feats < 5 {
                continue;
            }
            let (mut best_class, mut best_score) = (0usize, 0.0f32);
            for class_id in 0..(num_feats - 4) {
                let score = at(4 + class_id);
                if score > best_score {
                    best_class = class_id;
                    best_score = score;
                }
            }
            if best_score < CONFIDENCE_THRESHOLD || best_class >= COCO_CLASSES.len() {
                continue;
            }
            let label = COCO_CLASSES[best_class];
            if label != "person" && !BANNED_CLASSES.contains(&label) {
                continue;
            }

            let (cx, cy, w, h) = (at(0), at(1), at(2), at(3));
            per_class.push((
                best_class,
                BoxRegion {
                    x: (cx - w / 2.0 - pad_x as f32) / scale,
                    y: (cy - h / 2.0 - pad_y as f32) / scale,
                    width: w / scale,
                    height: h / scale,
                    confidence: best_score,
                },
            ));
        }

        // NMS per class so a laptop box never suppresses the person box
        let mut detections = Vec::new();
        let mut classes: Vec<usize> = per_class.iter().map(|(c, _)| *c).collect();
        classes.sort_unstable();
        classes.dedup();
        for class_id in classes {
            let boxes: Vec<BoxRegion> = per_class
                .iter()
                .filter(|(c, _)| *c == class_id)
                .map(|(_, b)| *b)
                .collect();
            for region in nms(boxes, NMS_IOU_THRESH) {
                detections.push(ObjectDetection {
                    label: COCO_CLASSES[class_id],
                    region,
                });
            }
        }

        debug!("Detected {} relevant objects", detections.len());
        Ok(detections)
    }
}

/// Simplified person-counting fallback used when no object model loaded.
///
/// Marks pixels deviating from the mean intensity as foreground and counts
/// 4-connected components with at least [`MIN_REGION_AREA`] pixels. Each
/// significant region is treated as one person-like region.
pub fn count_significant_regions(gray: &GrayImage) -> usize {
    let (width, height) = gray.dimensions();
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return 0;
    }

    let total: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = (total / (width * height) as u64) as i16;

    let foreground: Vec<bool> = gray
        .pixels()
        .map(|p| (p.0[0] as i16 - mean).abs() > FOREGROUND_DEVIATION)
        .collect();

    let mut visited = vec![false; width * height];
    let mut regions = 0usize;

    for start in 0..foreground.len() {
        if !foreground[start] || visited[start] {
            continue;
        }

        // Flood fill this component, 4-connected
        let mut count = 0usize;
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(idx) = stack.pop() {
            count += 1;
            let (x, y) = (idx % width, idx / width);
            let mut push = |nx: usize, ny: usize| {
                let nidx = ny * width + nx;
                if foreground[nidx] && !visited[nidx] {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            };
            if x > 0 {
                push(x - 1, y);
            }
            if x + 1 < width {
                push(x + 1, y);
            }
            if y > 0 {
                push(x, y - 1);
            }
            if y + 1 < height {
                push(x, y + 1);
            }
        }

        if count >= MIN_REGION_AREA {
            regions += 1;
        }
    }

    regions
}
