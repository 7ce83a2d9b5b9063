//! Recognition service
//!
//! Ties the engine, the confidence filter, annotation and the artifact
//! store together. One `OcrService` is built at startup and shared by
//! every request handler.

use crate::annotate::{annotate, load_label_font};
use crate::config::ServiceConfig;
use crate::error::{PipelineError, Result};
use crate::filter::{filter_detections, join_text, texts};
use crate::ocr::{TesseractRecognizer, TextRecognizer};
use crate::store::{ArtifactStore, RequestStamp};
use crate::types::{Detection, OcrResponse, RecognitionParams};
use ab_glyph::FontVec;
use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of [`OcrService::recognize`]
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Surviving texts joined with newlines
    pub text: String,
    /// Detections that passed the confidence filter, in engine order
    pub detections: Vec<Detection>,
    pub text_file: PathBuf,
    pub debug_file: PathBuf,
}

pub struct OcrService {
    engine: Arc<dyn TextRecognizer>,
    store: ArtifactStore,
    params: RecognitionParams,
    min_confidence: f32,
    font: Option<FontVec>,
}

impl OcrService {
    pub fn new(
        engine: Arc<dyn TextRecognizer>,
        store: ArtifactStore,
        params: RecognitionParams,
        min_confidence: f32,
        font: Option<FontVec>,
    ) -> Self {
        Self {
            engine,
            store,
            params,
            min_confidence,
            font,
        }
    }

    /// Build the service with the Tesseract engine described by `config`
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let tessdata = config
            .tessdata
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let engine = TesseractRecognizer::new(tessdata.as_deref(), &config.languages)?;
        Self::with_engine(Arc::new(engine), config)
    }

    /// Build the service around an already constructed engine
    pub fn with_engine(engine: Arc<dyn TextRecognizer>, config: &ServiceConfig) -> Result<Self> {
        let store = ArtifactStore::open(&config.data_dir, config.text_mode)?;
        let font = load_label_font(config.font.as_deref());
        Ok(Self::new(
            engine,
            store,
            config.params,
            config.min_confidence,
            font,
        ))
    }

    pub fn engine(&self) -> &dyn TextRecognizer {
        self.engine.as_ref()
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run the engine, filter, and persist the text and debug artifacts
    ///
    /// Artifacts already written stay on disk if a later step fails.
    pub fn recognize(&self, image: &DynamicImage, stamp: &RequestStamp) -> Result<Recognition> {
        let raw = self.engine.read_text(image, &self.params)?;
        let total = raw.len();
        let detections = filter_detections(raw, self.min_confidence);
        let text = join_text(&detections);

        tracing::info!(
            engine = self.engine.name(),
            stamp = %stamp,
            kept = detections.len(),
            dropped = total - detections.len(),
            "OCR result"
        );
        for d in &detections {
            tracing::info!("Text: {} | Confidence: {:.2}", d.text, d.confidence);
        }

        let text_file = self.store.write_text(stamp, &text, &texts(&detections))?;

        let debug_image = annotate(image, &detections, self.font.as_ref());
        let debug_file = self.store.save_debug_image(stamp, &debug_image)?;

        Ok(Recognition {
            text,
            detections,
            text_file,
            debug_file,
        })
    }

    /// Handle a raw upload: store it as received, then decode and recognize
    pub fn recognize_upload(&self, filename: &str, bytes: &[u8]) -> Result<OcrResponse> {
        let stamp = RequestStamp::new();
        let original_file = self.store.save_upload(&stamp, filename, bytes)?;

        let image = image::load_from_memory(bytes)?;
        let recognition = self.recognize(&image, &stamp)?;

        Ok(OcrResponse {
            text: recognition.text,
            original_file,
            debug_file: recognition.debug_file,
            text_file: recognition.text_file,
        })
    }

    /// Handle a base64 payload: decode, store as PNG, then recognize
    ///
    /// Invalid base64 and undecodable images fail before anything is written.
    pub fn recognize_base64(&self, payload: &str) -> Result<OcrResponse> {
        let bytes = decode_base64_payload(payload)?;
        let image = image::load_from_memory(&bytes)?;

        let stamp = RequestStamp::new();
        let original_file = self.store.save_base64_original(&stamp, &image)?;
        let recognition = self.recognize(&image, &stamp)?;

        Ok(OcrResponse {
            text: recognition.text,
            original_file,
            debug_file: recognition.debug_file,
            text_file: recognition.text_file,
        })
    }
}

/// Decode standard base64, tolerating a `data:...;base64,` prefix and whitespace
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>> {
    let trimmed = payload.trim();
    let body = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| {
                PipelineError::InvalidBase64(
                    "data URL is missing the ',' before the image data".to_string(),
                )
            })?,
        None => trimmed,
    };

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(general_purpose::STANDARD.decode(compact)?)
}
