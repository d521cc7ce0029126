// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-frame analysis verdict

use serde::{Deserialize, Serialize};

/// The verdict for one analyzed frame.
///
/// Created fresh per request and never persisted. Wire names are
/// snake_case, the contract the proctoring clients were built against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    /// Count of detected person-like regions
    pub people_count: u32,
    /// Banned-object labels present in the frame
    pub banned_objects: Vec<String>,
    /// Whether a face was found (requires exactly one counted person)
    pub face_detected: bool,
    /// Whether the face matched a reference identity
    pub face_verified: bool,
    /// Matched identity; "Unknown" unless `face_verified`
    pub person_name: String,
    /// Head orientation outside the proctoring tolerance
    pub headpose_alert: bool,
    /// Presentation-attack indicators on the face region
    pub spoofing_alert: bool,
    /// Human-readable anomaly descriptions, in pipeline order
    pub alerts: Vec<String>,
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self {
            people_count: 0,
            banned_objects: Vec::new(),
            face_detected: false,
            face_verified: false,
            person_name: "Unknown".to_string(),
            headpose_alert: false,
            spoofing_alert: false,
            alerts: Vec::new(),
        }
    }
}
