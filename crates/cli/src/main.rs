//! textlens CLI
//!
//! Runs the recognition pipeline on local images without the HTTP server.
//! Artifacts land in the same uploads/, outputs/ and texts/ layout.
//!
//! Copyright (c) 2025 Michael A Wright

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_pipeline::{OcrService, ServiceConfig, TextArtifactMode};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Shown by `textlens --version`
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\n  host:    ",
    env!("BUILT_HOST"),
    "\n  commit:  ",
    env!("BUILT_GIT_COMMIT_HASH"),
    "\n  built:   ",
    env!("BUILT_TIME_UTC"),
);

#[derive(Parser)]
#[command(name = "textlens", version, long_version = LONG_VERSION)]
#[command(about = "Recognize text in images and keep the artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize text in a local image and print the response JSON
    Recognize {
        /// Image file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory holding uploads/, outputs/ and texts/
        #[arg(short, long, default_value = ".")]
        data_dir: PathBuf,

        /// Tesseract languages, '+' separated
        #[arg(short, long, default_value = "tha+eng")]
        languages: String,

        /// Tesseract data directory
        #[arg(long)]
        tessdata: Option<PathBuf>,

        /// Text artifact: timestamped or shared-json
        #[arg(long, default_value = "timestamped")]
        text_mode: TextArtifactMode,

        /// TrueType font for debug-image labels
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Print version, toolchain and build information
    Version,
}

fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Recognize {
            input,
            data_dir,
            languages,
            tessdata,
            text_mode,
            font,
        } => {
            let config = ServiceConfig {
                data_dir,
                languages,
                tessdata,
                text_mode,
                font,
                ..ServiceConfig::default()
            };
            recognize_file(&config, &input)
        }
        Commands::Version => {
            println!("textlens {}", built_info::PKG_VERSION);
            println!("  target:  {}", built_info::TARGET);
            println!("  rustc:   {}", built_info::RUSTC_VERSION);
            println!("  host:    {}", env!("BUILT_HOST"));
            println!("  commit:  {}", env!("BUILT_GIT_COMMIT_HASH"));
            println!("  built:   {}", env!("BUILT_TIME_UTC"));
            Ok(())
        }
    }
}

fn recognize_file(config: &ServiceConfig, input: &Path) -> Result<()> {
    let bytes =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let service = OcrService::from_config(config).context("Failed to start recognition service")?;
    tracing::info!(input = %input.display(), engine = service.engine().name(), "Recognizing");

    let response = service
        .recognize_upload(&filename, &bytes)
        .with_context(|| format!("Recognition failed for {}", input.display()))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
