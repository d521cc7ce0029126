// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Student reference database
//!
//! Built once at startup by scanning a directory of labeled images
//! (`<identifier>.png/jpg/jpeg`) and immutable for the life of the
//! process. When the detection or descriptor capability is missing the
//! entries are name-only and verification degrades to "not recognized".

use std::path::Path;

use tracing::{info, warn};

use crate::vision::face_embedder::cosine_similarity;
use crate::vision::VisionModelManager;

/// Minimum cosine similarity for a descriptor match
const MATCH_SIMILARITY: f32 = 0.4;

/// Accepted reference image extensions
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One known student identity.
#[derive(Debug, Clone)]
pub struct StudentEntry {
    /// Identifier, the reference image's file stem
    pub name: String,
    /// Face descriptor, when the capabilities to compute one were loaded
    pub descriptor: Option<Vec<f32>>,
}

/// The at-startup-loaded set of (identity, descriptor) pairs.
#[derive(Debug, Default)]
pub struct ReferenceDatabase {
    entries: Vec<StudentEntry>,
}

impl ReferenceDatabase {
    /// Scan a directory of labeled student images.
    ///
    /// Never fails: a missing directory yields an empty database, an
    /// unreadable or faceless reference image yields a name-only entry.
    pub fn load<P: AsRef<Path>>(dir: P, models: &VisionModelManager) -> Self {
        let dir = dir.as_ref();

        let read_dir = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) => {
                warn!(
                    "⚠️ Student reference directory {} not readable: {}",
                    dir.display(),
                    e
                );
                return Self::default();
            }
        };

        let can_embed = models.has_face_detection() && models.get_face_embedder().is_some();

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);
            if !is_image {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let name = name.to_string();

            let descriptor = if can_embed {
                match Self::build_descriptor(&path, models) {
                    Ok(descriptor) => Some(descriptor),
                    Err(e) => {
                        warn!("⚠️ No descriptor for reference image {}: {}", name, e);
                        None
                    }
                }
            } else {
                None
            };

            entries.push(StudentEntry { name, descriptor });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        // One identity per stem, even when it exists in several formats;
        // entries with a descriptor win the dedup
        entries.dedup_by(|a, b| {
            if a.name != b.name {
                return false;
            }
            if b.descriptor.is_none() {
                b.descriptor = a.descriptor.take();
            }
            true
        });

        let with_descriptors = entries.iter().filter(|e| e.descriptor.is_some()).count();
        info!(
            "✅ Reference database loaded: {} students ({} with descriptors)",
            entries.len(),
            with_descriptors
        );

        Self { entries }
    }

    fn build_descriptor(path: &Path, models: &VisionModelManager) -> anyhow::Result<Vec<f32>> {
        let image = image::open(path)?;
        let faces = models.detect_faces(&image)?;
        let face = faces
            .first()
            .ok_or_else(|| anyhow::anyhow!("no face found in reference image"))?;
        let embedder = models
            .get_face_embedder()
            .ok_or_else(|| anyhow::anyhow!("descriptor capability not loaded"))?;
        embedder.embed(&image, face)
    }

    /// Build a database directly from entries (test fixtures).
    pub fn from_entries(mut entries: Vec<StudentEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Known identifiers, in stable (sorted) order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest entry by cosine similarity, with the similarity score.
    ///
    /// Entries without descriptors never match.
    pub fn best_match(&self, descriptor: &[f32]) -> Option<(&str, f32)> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .descriptor
                    .as_ref()
                    .map(|d| (entry.name.as_str(), cosine_similarity(descriptor, d)))
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Nearest entry, gated on the fixed match threshold.
    pub fn match_descriptor(&self, descriptor: &[f32]) -> Option<&str> {
        self.best_match(descriptor)
            .filter(|(_, similarity)| *similarity >= MATCH_SIMILARITY)
            .map(|(name, _)| name)
    }
}
