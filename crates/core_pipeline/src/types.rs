//! Core types for the textlens pipeline
//!
//! This module defines the detection model shared by the recognition
//! engines, the annotation code and the HTTP surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Minimum confidence a detection must reach to be kept
pub const MIN_CONFIDENCE: f32 = 0.1;

/// A pixel coordinate on the source image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Quadrilateral bounding region, vertices in drawing order
pub type Quad = [Point; 4];

/// Build an axis-aligned quad (top-left, top-right, bottom-right, bottom-left)
pub fn rect_quad(left: f32, top: f32, width: f32, height: f32) -> Quad {
    [
        Point::new(left, top),
        Point::new(left + width, top),
        Point::new(left + width, top + height),
        Point::new(left, top + height),
    ]
}

/// One recognized text span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding region on the source image
    pub bbox: Quad,
    /// Recognized text
    pub text: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }
}

/// Fixed parameter set handed to the recognition engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecognitionParams {
    /// Merge lines into paragraphs instead of keeping each detection separate
    pub paragraph: bool,
    /// Contrast below which the image is enhanced before recognition
    pub contrast_ths: f32,
    /// Target contrast after enhancement
    pub adjust_contrast: f32,
    /// Text-region confidence threshold (detector engines only)
    pub text_threshold: f32,
    /// Low-bound text score (detector engines only)
    pub low_text: f32,
}

impl Default for RecognitionParams {
    fn default() -> Self {
        Self {
            paragraph: false,
            contrast_ths: 0.05,
            adjust_contrast: 0.7,
            text_threshold: 0.4,
            low_text: 0.2,
        }
    }
}

/// How the recognized text is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextArtifactMode {
    /// A new `texts/{stamp}.txt` per request
    #[default]
    Timestamped,
    /// One `texts/ocr_result.json`, overwritten on every request
    SharedJson,
}

impl fmt::Display for TextArtifactMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextArtifactMode::Timestamped => f.write_str("timestamped"),
            TextArtifactMode::SharedJson => f.write_str("shared-json"),
        }
    }
}

impl FromStr for TextArtifactMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timestamped" => Ok(TextArtifactMode::Timestamped),
            "shared-json" => Ok(TextArtifactMode::SharedJson),
            other => Err(format!(
                "unknown text mode '{}' (expected timestamped or shared-json)",
                other
            )),
        }
    }
}

/// Result of one recognition request, serialized as the HTTP response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    /// Surviving texts joined with newlines
    pub text: String,
    /// Copy of the input image
    pub original_file: PathBuf,
    /// Annotated debug image
    pub debug_file: PathBuf,
    /// Text artifact (per-request `.txt` or the shared JSON file)
    pub text_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_match_engine_settings() {
        let params = RecognitionParams::default();
        assert!(!params.paragraph);
        assert_eq!(params.contrast_ths, 0.05);
        assert_eq!(params.adjust_contrast, 0.7);
        assert_eq!(params.text_threshold, 0.4);
        assert_eq!(params.low_text, 0.2);
    }

    #[test]
    fn test_rect_quad_vertex_order() {
        let quad = rect_quad(10.0, 20.0, 30.0, 5.0);
        assert_eq!(quad[0], Point::new(10.0, 20.0));
        assert_eq!(quad[1], Point::new(40.0, 20.0));
        assert_eq!(quad[2], Point::new(40.0, 25.0));
        assert_eq!(quad[3], Point::new(10.0, 25.0));
    }

    #[test]
    fn test_text_mode_parse() {
        assert_eq!(
            "shared-json".parse::<TextArtifactMode>().unwrap(),
            TextArtifactMode::SharedJson
        );
        assert_eq!(
            "timestamped".parse::<TextArtifactMode>().unwrap(),
            TextArtifactMode::Timestamped
        );
        assert!("json".parse::<TextArtifactMode>().is_err());
    }

    #[test]
    fn test_response_serialization() {
        let response = OcrResponse {
            text: "สวัสดี\nhello".to_string(),
            original_file: PathBuf::from("uploads/a.png"),
            debug_file: PathBuf::from("outputs/a_debug.png"),
            text_file: PathBuf::from("texts/a.txt"),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"text\":\"สวัสดี\\nhello\""));
        assert!(json.contains("\"original_file\":\"uploads/a.png\""));
        assert!(json.contains("\"debug_file\""));
        assert!(json.contains("\"text_file\""));
    }
}
