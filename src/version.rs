// Version information for the Proctor Node

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-frame-analysis-2026-08-07";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-07";

/// Capabilities this build can load (each one optional at runtime)
pub const CAPABILITIES: &[&str] = &[
    "object-detection",
    "face-detection",
    "face-recognition",
    "head-pose",
    "anti-spoofing",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Proctor Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
