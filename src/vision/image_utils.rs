// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame loading and utility functions for the analysis pipeline

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use thiserror::Error;

/// Maximum accepted frame size (10MB)
const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Fixed downscale factor applied before inference to bound model latency
pub const DOWNSCALE_FACTOR: u32 = 4;

/// Errors raised while turning request payloads into frames
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Frame data is empty")]
    EmptyData,
}

/// Frame metadata extracted during decoding
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub size_bytes: usize,
}

/// Decode raw frame bytes (multipart uploads).
///
/// The format is sniffed from magic bytes rather than trusted from the
/// client, so a mislabeled upload still decodes or fails cleanly.
pub fn decode_frame_bytes(bytes: &[u8]) -> Result<(DynamicImage, FrameInfo), FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::EmptyData);
    }
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(bytes.len(), MAX_FRAME_SIZE));
    }

    let format = detect_format(bytes)?;

    let frame = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| FrameError::DecodeFailed(e.to_string()))?;

    let info = FrameInfo {
        width: frame.width(),
        height: frame.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((frame, info))
}

/// Decode a base64-encoded frame (JSON payloads).
pub fn decode_base64_frame(base64_str: &str) -> Result<(DynamicImage, FrameInfo), FrameError> {
    if base64_str.is_empty() {
        return Err(FrameError::EmptyData);
    }

    let bytes = STANDARD.decode(base64_str)?;
    decode_frame_bytes(&bytes)
}

/// Detect image format from magic bytes.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, FrameError> {
    if bytes.len() < 4 {
        return Err(FrameError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        _ => Err(FrameError::UnsupportedFormat),
    }
}

/// Downscale a frame by the fixed factor used for inference.
///
/// Dimensions are clamped to at least 1x1 so tiny frames stay decodable
/// by the downstream detectors.
pub fn downscale_for_analysis(frame: &DynamicImage) -> DynamicImage {
    let width = (frame.width() / DOWNSCALE_FACTOR).max(1);
    let height = (frame.height() / DOWNSCALE_FACTOR).max(1);
    frame.resize_exact(width, height, FilterType::Triangle)
}
