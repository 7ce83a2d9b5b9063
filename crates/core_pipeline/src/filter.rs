//! Confidence filtering and text joining
//!
//! Both operations keep the engine's detection order untouched.

use crate::types::Detection;

/// Keep detections whose confidence reaches `min_confidence`, in engine order
pub fn filter_detections(detections: Vec<Detection>, min_confidence: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= min_confidence)
        .collect()
}

/// Join detection texts with newlines
pub fn join_text(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Texts of the detections as owned strings, for the JSON artifact
pub fn texts(detections: &[Detection]) -> Vec<String> {
    detections.iter().map(|d| d.text.clone()).collect()
}
