//! Service configuration

use crate::types::{RecognitionParams, TextArtifactMode, MIN_CONFIDENCE};
use std::path::PathBuf;

/// Configuration for [`crate::service::OcrService`] and its engine
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root under which `uploads/`, `outputs/` and `texts/` live (default: .)
    pub data_dir: PathBuf,
    /// Tesseract language string (default: tha+eng)
    pub languages: String,
    /// Tesseract data directory (default: system tessdata)
    pub tessdata: Option<PathBuf>,
    /// Detections below this confidence are dropped (default: 0.1)
    pub min_confidence: f32,
    /// How recognized text is persisted (default: timestamped)
    pub text_mode: TextArtifactMode,
    /// Font for debug-image labels (default: try common system font paths)
    pub font: Option<PathBuf>,
    /// Engine parameters
    pub params: RecognitionParams,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            languages: "tha+eng".to_string(),
            tessdata: None,
            min_confidence: MIN_CONFIDENCE,
            text_mode: TextArtifactMode::Timestamped,
            font: None,
            params: RecognitionParams::default(),
        }
    }
}
