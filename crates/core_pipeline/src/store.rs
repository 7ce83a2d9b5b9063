//! Artifact store
//!
//! Owns the on-disk layout (`uploads/`, `outputs/`, `texts/`) and every file
//! a request writes. Per-request artifacts are named after a [`RequestStamp`]
//! and never touched again; the shared JSON result is the only file that is
//! rewritten.

use crate::error::{PipelineError, Result};
use crate::types::TextArtifactMode;
use chrono::Local;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

pub const UPLOAD_DIR: &str = "uploads";
pub const OUTPUT_DIR: &str = "outputs";
pub const TEXT_DIR: &str = "texts";
pub const SHARED_RESULT_FILE: &str = "ocr_result.json";

/// Per-request name prefix: local time plus a short random suffix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestStamp(String);

impl RequestStamp {
    pub fn new() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}_{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            &suffix[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduce a client-supplied filename to a safe final path component
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn image_write_error(path: &Path, e: image::ImageError) -> PipelineError {
    match e {
        image::ImageError::IoError(source) => PipelineError::io(path, source),
        other => PipelineError::io(path, std::io::Error::other(other.to_string())),
    }
}

/// Location of artifact directory `dir` under `root`
///
/// Paths stay relative (`uploads/...`) when serving from the working directory.
fn artifact_dir(root: &Path, dir: &str) -> PathBuf {
    if root == Path::new(".") || root.as_os_str().is_empty() {
        PathBuf::from(dir)
    } else {
        root.join(dir)
    }
}

/// Filesystem layout for request artifacts
#[derive(Debug)]
pub struct ArtifactStore {
    uploads: PathBuf,
    outputs: PathBuf,
    texts: PathBuf,
    mode: TextArtifactMode,
    shared_lock: Mutex<()>,
}

impl ArtifactStore {
    /// Open the store under `root`, creating the artifact directories if absent
    pub fn open(root: impl AsRef<Path>, mode: TextArtifactMode) -> Result<Self> {
        let root = root.as_ref();
        let store = Self {
            uploads: artifact_dir(root, UPLOAD_DIR),
            outputs: artifact_dir(root, OUTPUT_DIR),
            texts: artifact_dir(root, TEXT_DIR),
            mode,
            shared_lock: Mutex::new(()),
        };

        for dir in [&store.uploads, &store.outputs, &store.texts] {
            std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        }

        Ok(store)
    }

    pub fn mode(&self) -> TextArtifactMode {
        self.mode
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs
    }

    pub fn texts_dir(&self) -> &Path {
        &self.texts
    }

    /// Path of the debug image for `stamp`
    pub fn debug_path(&self, stamp: &RequestStamp) -> PathBuf {
        self.outputs.join(format!("{}_debug.png", stamp))
    }

    /// Path of the shared JSON result file
    pub fn shared_result_path(&self) -> PathBuf {
        self.texts.join(SHARED_RESULT_FILE)
    }

    /// Store raw upload bytes as `uploads/{stamp}_{filename}`
    pub fn save_upload(&self, stamp: &RequestStamp, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self
            .uploads
            .join(format!("{}_{}", stamp, sanitize_filename(filename)));
        std::fs::write(&path, bytes).map_err(|e| PipelineError::io(&path, e))?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved upload");
        Ok(path)
    }

    /// Re-encode a decoded base64 image as `uploads/{stamp}_base64.png`
    pub fn save_base64_original(&self, stamp: &RequestStamp, image: &DynamicImage) -> Result<PathBuf> {
        let path = self.uploads.join(format!("{}_base64.png", stamp));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| image_write_error(&path, e))?;
        tracing::info!(path = %path.display(), "Saved base64 image");
        Ok(path)
    }

    /// Write the annotated debug image as PNG
    pub fn save_debug_image(&self, stamp: &RequestStamp, image: &RgbImage) -> Result<PathBuf> {
        let path = self.debug_path(stamp);
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| image_write_error(&path, e))?;
        tracing::info!(path = %path.display(), "Debug image saved");
        Ok(path)
    }

    /// Persist the recognized text according to the store's mode
    pub fn write_text(&self, stamp: &RequestStamp, joined: &str, texts: &[String]) -> Result<PathBuf> {
        match self.mode {
            TextArtifactMode::Timestamped => {
                let path = self.texts.join(format!("{}.txt", stamp));
                std::fs::write(&path, joined.as_bytes()).map_err(|e| PipelineError::io(&path, e))?;
                tracing::info!(path = %path.display(), "Saved text");
                Ok(path)
            }
            TextArtifactMode::SharedJson => self.replace_shared_result(texts),
        }
    }

    /// Overwrite the shared JSON file: serialize, write a temp file, rename over
    fn replace_shared_result(&self, texts: &[String]) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(texts)?;
        let target = self.shared_result_path();

        let _guard = self
            .shared_lock
            .lock()
            .map_err(|_| PipelineError::Task("Shared result lock poisoned".to_string()))?;

        let tmp = self
            .texts
            .join(format!(".{}.{}.tmp", SHARED_RESULT_FILE, Uuid::new_v4().simple()));
        std::fs::write(&tmp, &json).map_err(|e| PipelineError::io(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(PipelineError::io(&target, e));
        }

        tracing::info!(path = %target.display(), entries = texts.len(), "Replaced shared result");
        Ok(target)
    }
}
