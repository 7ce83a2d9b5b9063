//! textlens REST API server
//!
//! Accepts images over HTTP, runs them through the shared recognition
//! engine, and returns the recognized text as JSON.

mod error;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use core_pipeline::{OcrService, RecognitionParams, ServiceConfig, TextArtifactMode};
use routes::{router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "textlens-server")]
#[command(about = "OCR over HTTP: POST /ocr_file (multipart) or /ocr (base64 JSON)", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "TEXTLENS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "TEXTLENS_PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding uploads/, outputs/ and texts/
    #[arg(long, env = "TEXTLENS_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Tesseract languages, '+' separated
    #[arg(long, env = "TEXTLENS_LANGUAGES", default_value = "tha+eng")]
    languages: String,

    /// Tesseract data directory
    #[arg(long, env = "TEXTLENS_TESSDATA")]
    tessdata: Option<PathBuf>,

    /// Detections below this confidence are dropped
    #[arg(long, env = "TEXTLENS_MIN_CONFIDENCE", default_value_t = core_pipeline::MIN_CONFIDENCE)]
    min_confidence: f32,

    /// Text artifact: timestamped or shared-json
    #[arg(long, env = "TEXTLENS_TEXT_MODE", default_value = "timestamped")]
    text_mode: TextArtifactMode,

    /// TrueType font for debug-image labels
    #[arg(long, env = "TEXTLENS_FONT")]
    font: Option<PathBuf>,

    /// Maximum request body size in bytes
    #[arg(long, env = "TEXTLENS_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

impl Args {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            data_dir: self.data_dir.clone(),
            languages: self.languages.clone(),
            tessdata: self.tessdata.clone(),
            min_confidence: self.min_confidence,
            text_mode: self.text_mode,
            font: self.font.clone(),
            params: RecognitionParams::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.service_config();

    let service = OcrService::from_config(&config).context("Failed to start recognition service")?;
    tracing::info!(
        engine = service.engine().name(),
        languages = ?service.engine().languages(),
        text_mode = %config.text_mode,
        data_dir = %config.data_dir.display(),
        "Recognition service ready"
    );

    let state = Arc::new(AppState { service });
    let app = router(state, args.max_upload_bytes);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
