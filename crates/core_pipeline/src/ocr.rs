//! OCR module
//!
//! Defines the seam every recognition engine plugs into and the baseline
//! Tesseract backend (via leptess).

use crate::error::{PipelineError, Result};
use crate::preprocess::prepare_for_recognition;
use crate::types::{rect_quad, Detection, RecognitionParams};
use image::{DynamicImage, ImageFormat};
use leptess::LepTess;
use std::sync::Mutex;

/// A text-recognition engine
///
/// Implementations are built once at startup and shared across requests.
pub trait TextRecognizer: Send + Sync {
    /// Engine identifier (e.g. "tesseract")
    fn name(&self) -> &'static str;

    /// Languages the engine was initialized with
    fn languages(&self) -> Vec<String>;

    /// Detect and recognize text, returning detections in reading order
    fn read_text(&self, image: &DynamicImage, params: &RecognitionParams)
        -> Result<Vec<Detection>>;
}

struct TessHandle(LepTess);

// SAFETY: the Tesseract API object has no thread affinity; it only must not
// be used from two threads at once, which the Mutex in TesseractRecognizer
// guarantees.
unsafe impl Send for TessHandle {}

/// Tesseract-backed recognizer
pub struct TesseractRecognizer {
    tess: Mutex<TessHandle>,
    languages: String,
}

impl TesseractRecognizer {
    /// Initialize Tesseract with `languages` in Tesseract syntax (e.g. "tha+eng")
    ///
    /// # Errors
    /// * Returns error if Tesseract or the language data is not installed
    pub fn new(tessdata: Option<&str>, languages: &str) -> Result<Self> {
        let tess = LepTess::new(tessdata, languages).map_err(|e| {
            PipelineError::Engine(format!(
                "Failed to initialize Tesseract for '{}'. Is Tesseract installed? {}",
                languages, e
            ))
        })?;

        tracing::info!(languages, "Tesseract engine initialized");

        Ok(Self {
            tess: Mutex::new(TessHandle(tess)),
            languages: languages.to_string(),
        })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn languages(&self) -> Vec<String> {
        self.languages.split('+').map(str::to_string).collect()
    }

    fn read_text(
        &self,
        image: &DynamicImage,
        params: &RecognitionParams,
    ) -> Result<Vec<Detection>> {
        tracing::debug!(
            text_threshold = params.text_threshold,
            low_text = params.low_text,
            "Tesseract runs its own layout analysis; detector thresholds unused"
        );

        let prepared = prepare_for_recognition(image, params);

        // leptess takes encoded image bytes, not raw pixels
        let mut png_bytes = Vec::new();
        prepared
            .write_to(&mut std::io::Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|e| PipelineError::Engine(format!("Failed to encode image as PNG: {}", e)))?;

        let mut guard = self
            .tess
            .lock()
            .map_err(|_| PipelineError::Engine("Tesseract handle poisoned".to_string()))?;
        let tess = &mut guard.0;

        tess.set_image_from_mem(&png_bytes)
            .map_err(|e| PipelineError::Engine(format!("Failed to load image into Tesseract: {}", e)))?;

        let tsv = tess
            .get_tsv_text(0)
            .map_err(|e| PipelineError::Engine(format!("Failed to extract text from image: {}", e)))?;

        Ok(parse_tsv(&tsv, params.paragraph))
    }
}

/// One word row of Tesseract's TSV output
#[derive(Debug, Clone, PartialEq)]
struct TsvWord {
    group: (u32, u32, u32, u32),
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    conf: f32,
    text: String,
}

fn parse_word_row(line: &str, paragraph: bool) -> Option<TsvWord> {
    let cols: Vec<&str> = line.splitn(12, '\t').collect();
    if cols.len() < 12 {
        return None;
    }

    let num = |i: usize| cols[i].trim().parse::<u32>().ok();
    let level = num(0)?;
    if level != 5 {
        return None;
    }

    let text = cols[11].trim();
    let conf: f32 = cols[10].trim().parse().ok()?;
    if text.is_empty() || conf < 0.0 {
        return None;
    }

    let (page, block, par, line_num) = (num(1)?, num(2)?, num(3)?, num(4)?);
    let (left, top, width, height) = (num(6)?, num(7)?, num(8)?, num(9)?);

    let group = if paragraph {
        (page, block, par, 0)
    } else {
        (page, block, par, line_num)
    };

    Some(TsvWord {
        group,
        left: left as f32,
        top: top as f32,
        right: (left + width) as f32,
        bottom: (top + height) as f32,
        conf,
        text: text.to_string(),
    })
}

/// Group Tesseract TSV word rows into detections
///
/// Lines become detections, or paragraphs when `paragraph` is set. Text is
/// the words joined by spaces, confidence the mean word confidence scaled
/// to [0, 1], and the region the axis-aligned box around the words.
pub fn parse_tsv(tsv: &str, paragraph: bool) -> Vec<Detection> {
    let mut groups: Vec<Vec<TsvWord>> = Vec::new();

    for word in tsv.lines().filter_map(|l| parse_word_row(l, paragraph)) {
        match groups.last_mut() {
            Some(current) if current[0].group == word.group => current.push(word),
            _ => groups.push(vec![word]),
        }
    }

    groups
        .into_iter()
        .map(|words| {
            let left = words.iter().map(|w| w.left).fold(f32::MAX, f32::min);
            let top = words.iter().map(|w| w.top).fold(f32::MAX, f32::min);
            let right = words.iter().map(|w| w.right).fold(f32::MIN, f32::max);
            let bottom = words.iter().map(|w| w.bottom).fold(f32::MIN, f32::max);
            let conf = words.iter().map(|w| w.conf).sum::<f32>() / words.len() as f32;
            let text = words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            Detection::new(
                rect_quad(left, top, right - left, bottom - top),
                text,
                (conf / 100.0).clamp(0.0, 1.0),
            )
        })
        .collect()
}
