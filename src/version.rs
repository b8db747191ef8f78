// Version information for the HealVision analysis node

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-lung-opacity-2026-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Major version number
pub const VERSION_MAJOR: u32 = 1;

/// Minor version number
pub const VERSION_MINOR: u32 = 0;

/// Patch version number
pub const VERSION_PATCH: u32 = 0;

/// Build date
pub const BUILD_DATE: &str = "2026-10-19";

/// Name reported by `GET /`
pub const API_NAME: &str = "HealVision Medical Imaging API";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "lung-opacity-detection",
    "yolov8-onnx",
    "patient-context",
    "audit-hash",
    "template-explanation",
    "minimal-prediction",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("HealVision Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
