//! Core pipeline for textlens
//!
//! This crate provides the detection model, the recognition engine seam,
//! and the request pipeline that turns an uploaded image into recognized
//! text plus on-disk artifacts (original copy, annotated debug image,
//! text output).

pub mod annotate;
pub mod config;
pub mod error;
pub mod filter;
pub mod ocr;
pub mod preprocess;
pub mod service;
pub mod store;
pub mod types;

pub use config::ServiceConfig;
pub use error::{PipelineError, Result};
pub use ocr::{TesseractRecognizer, TextRecognizer};
pub use service::{OcrService, Recognition};
pub use store::{ArtifactStore, RequestStamp};
pub use types::*;
