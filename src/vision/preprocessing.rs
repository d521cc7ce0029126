// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared tensor preprocessing for the detection models
//!
//! All of the ONNX models in this service take square NCHW float inputs.
//! This module holds the letterbox resize used by the detectors, the
//! crop-and-normalize path used by the per-face models, and the NMS
//! post-processing the detectors share.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

/// Gray fill value for letterbox padding (YOLO convention)
const LETTERBOX_FILL: f32 = 114.0 / 255.0;

/// An axis-aligned detection box in original frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BoxRegion {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &BoxRegion) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Per-model pixel normalization schemes.
#[derive(Debug, Clone, Copy)]
pub enum Normalization {
    /// x / 255 (detectors, spoofing classifier)
    ZeroToOne,
    /// (x - 127.5) / 128 (ArcFace-class descriptor models)
    ArcFace,
    /// (x / 255 - mean) / std with ImageNet statistics (head-pose model)
    ImageNet,
}

impl Normalization {
    fn apply(&self, value: u8, channel: usize) -> f32 {
        const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
        const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

        let v = value as f32;
        match self {
            Normalization::ZeroToOne => v / 255.0,
            Normalization::ArcFace => (v - 127.5) / 128.0,
            Normalization::ImageNet => (v / 255.0 - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel],
        }
    }
}

/// Letterbox-resize a frame to `target` x `target` and return the NCHW
/// tensor together with the mapping back to frame coordinates.
///
/// Returns `(tensor, scale, pad_x, pad_y)`; a detector box at `(bx, by)`
/// in model space maps back to `((bx - pad_x) / scale, (by - pad_y) / scale)`.
pub fn letterbox(frame: &DynamicImage, target: u32) -> (Array4<f32>, f32, u32, u32) {
    let (fw, fh) = frame.dimensions();
    let scale = (target as f32 / fw as f32).min(target as f32 / fh as f32);
    let new_w = ((fw as f32 * scale).round() as u32).clamp(1, target);
    let new_h = ((fh as f32 * scale).round() as u32).clamp(1, target);
    let pad_x = (target - new_w) / 2;
    let pad_y = (target - new_h) / 2;

    let resized = frame.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();

    let mut tensor = Array4::<f32>::from_elem(
        (1, 3, target as usize, target as usize),
        LETTERBOX_FILL,
    );
    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = (pad_x + x) as usize;
        let ty = (pad_y + y) as usize;
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = pixel.0[c] as f32 / 255.0;
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Crop a face region out of the full-resolution frame and resize it to a
/// square model input with the requested normalization.
///
/// The region is clamped to the frame bounds before cropping, so boxes
/// hanging off the edge of the frame still produce a valid tensor.
pub fn crop_to_tensor(
    frame: &DynamicImage,
    region: &BoxRegion,
    size: u32,
    norm: Normalization,
) -> Array4<f32> {
    let (fw, fh) = frame.dimensions();

    let x = (region.x.max(0.0) as u32).min(fw.saturating_sub(1));
    let y = (region.y.max(0.0) as u32).min(fh.saturating_sub(1));
    let w = (region.width.max(1.0) as u32).min(fw - x);
    let h = (region.height.max(1.0) as u32).min(fh - y);

    let crop = frame
        .crop_imm(x, y, w.max(1), h.max(1))
        .resize_exact(size, size, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (px, py, pixel) in crop.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, py as usize, px as usize]] = norm.apply(pixel.0[c], c);
        }
    }
    tensor
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
pub fn nms(mut boxes: Vec<BoxRegion>, iou_thresh: f32) -> Vec<BoxRegion> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<BoxRegion> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| kept.iou(&candidate) <= iou_thresh) {
            keep.push(candidate);
        }
    }
    keep
}
