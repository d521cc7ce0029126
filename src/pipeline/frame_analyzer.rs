// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The per-frame decision pipeline
//!
//! A fixed sequence of capability calls over one decoded frame. Every step
//! is independently fault-tolerant: an inference failure becomes an alert
//! string and later steps still run, so the caller always receives a
//! well-formed report.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use tracing::warn;

use crate::students::ReferenceDatabase;
use crate::vision::image_utils::downscale_for_analysis;
use crate::vision::object_detector::count_significant_regions;
use crate::vision::preprocessing::BoxRegion;
use crate::vision::spoof_detector::SpoofDetector;
use crate::vision::VisionModelManager;

use super::report::AnalysisReport;

/// Analyzes one frame against the loaded models and reference database.
///
/// Pure function of (frame, models, reference database); both shared
/// members are immutable after startup.
#[derive(Debug, Clone)]
pub struct FrameAnalyzer {
    models: Arc<VisionModelManager>,
    students: Arc<ReferenceDatabase>,
}

impl FrameAnalyzer {
    pub fn new(models: Arc<VisionModelManager>, students: Arc<ReferenceDatabase>) -> Self {
        Self { models, students }
    }

    pub fn models(&self) -> &VisionModelManager {
        &self.models
    }

    pub fn students(&self) -> &ReferenceDatabase {
        &self.students
    }

    /// Run the full pipeline on one decoded frame.
    pub fn analyze(&self, frame: &DynamicImage) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        // 1. Downscale to bound model latency
        let small = downscale_for_analysis(frame);

        // 2. Person and banned-object counting
        if let Some(count) = self.count_people(&small, &mut report) {
            report.people_count = count;
            if count == 0 {
                report.alerts.push("No people detected".to_string());
            } else if count > 1 {
                report.alerts.push("Multiple people detected".to_string());
            }
        }

        // 3. Face detection, gated on exactly one counted person
        if report.people_count == 1 {
            if let Some(face) = self.detect_face(frame, &small, &mut report) {
                // 4. Face recognition
                self.recognize_face(frame, &face, &mut report);
                // 5. Head-pose check
                self.check_head_pose(frame, &face, &mut report);
                // 6. Spoofing check
                self.check_spoofing(frame, &face, &mut report);
            }
        }

        report
    }

    /// Step 2: count person regions and collect banned objects.
    ///
    /// Returns `None` when counting itself failed (alert already recorded);
    /// the count gate then keeps its zero default.
    fn count_people(&self, small: &DynamicImage, report: &mut AnalysisReport) -> Option<u32> {
        let Some(detector) = self.models.get_object_detector() else {
            // Simplified fallback: intensity regions as person-like regions
            return Some(count_significant_regions(&small.to_luma8()) as u32);
        };

        match detector.detect(small) {
            Ok(detections) => {
                let count = detections.iter().filter(|d| d.is_person()).count() as u32;

                for detection in detections.iter().filter(|d| d.is_banned()) {
                    let label = detection.label.to_string();
                    if !report.banned_objects.contains(&label) {
                        report.banned_objects.push(label);
                    }
                }
                if !report.banned_objects.is_empty() {
                    report.alerts.push(format!(
                        "Banned objects detected: {}",
                        report.banned_objects.join(", ")
                    ));
                }

                Some(count)
            }
            Err(e) => {
                warn!("Object detection error: {}", e);
                report.alerts.push("Object detection failed".to_string());
                None
            }
        }
    }

    /// Step 3: detect a face in the downscaled frame and map the winning
    /// region back to full-resolution coordinates.
    fn detect_face(
        &self,
        frame: &DynamicImage,
        small: &DynamicImage,
        report: &mut AnalysisReport,
    ) -> Option<BoxRegion> {
        if !self.models.has_face_detection() {
            report.alerts.push("Face detection unavailable".to_string());
            return None;
        }

        match self.models.detect_faces(small) {
            Ok(faces) => match faces.first() {
                Some(face) => {
                    report.face_detected = true;

                    let (fw, fh) = frame.dimensions();
                    let (sw, sh) = small.dimensions();
                    Some(BoxRegion {
                        x: face.x * fw as f32 / sw as f32,
                        y: face.y * fh as f32 / sh as f32,
                        width: face.width * fw as f32 / sw as f32,
                        height: face.height * fh as f32 / sh as f32,
                        confidence: face.confidence,
                    })
                }
                None => {
                    report.alerts.push("No face detected".to_string());
                    None
                }
            },
            Err(e) => {
                warn!("Face detection error: {}", e);
                report.alerts.push("Face detection failed".to_string());
                None
            }
        }
    }

    /// Step 4: match the face descriptor against the reference database.
    fn recognize_face(&self, frame: &DynamicImage, face: &BoxRegion, report: &mut AnalysisReport) {
        let Some(embedder) = self.models.get_face_embedder() else {
            report
                .alerts
                .push("Face recognition unavailable".to_string());
            return;
        };

        match embedder.embed(frame, face) {
            Ok(descriptor) => match self.students.match_descriptor(&descriptor) {
                Some(name) => {
                    report.face_verified = true;
                    report.person_name = name.to_string();
                }
                None => {
                    report.alerts.push("Face not recognized".to_string());
                }
            },
            Err(e) => {
                warn!("Face recognition error: {}", e);
                report.alerts.push("Face recognition failed".to_string());
            }
        }
    }

    /// Step 5: flag head orientation outside the proctoring tolerance.
    /// Skipped silently when the capability is not loaded.
    fn check_head_pose(&self, frame: &DynamicImage, face: &BoxRegion, report: &mut AnalysisReport) {
        let Some(estimator) = self.models.get_head_pose() else {
            return;
        };

        match estimator.estimate(frame, face) {
            Ok(pose) => {
                if pose.exceeds_tolerance() {
                    report.headpose_alert = true;
                    report
                        .alerts
                        .push("Suspicious head pose detected".to_string());
                }
            }
            Err(e) => {
                warn!("Head pose error: {}", e);
                report.alerts.push("Head pose check failed".to_string());
            }
        }
    }

    /// Step 6: flag presentation-attack indicators on the face region.
    /// Skipped silently when the capability is not loaded.
    fn check_spoofing(&self, frame: &DynamicImage, face: &BoxRegion, report: &mut AnalysisReport) {
        let Some(detector) = self.models.get_spoof_detector() else {
            return;
        };

        match detector.spoof_score(frame, face) {
            Ok(score) => {
                if SpoofDetector::is_spoof(score) {
                    report.spoofing_alert = true;
                    report.alerts.push("Possible spoofing detected".to_string());
                }
            }
            Err(e) => {
                warn!("Spoofing check error: {}", e);
                report.alerts.push("Spoofing check failed".to_string());
            }
        }
    }
}
