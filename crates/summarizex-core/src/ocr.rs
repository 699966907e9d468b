//! OCR engine abstraction.
//!
//! The extractor keeps one engine alive for the whole session and hands it
//! decoded images. Engines own whatever native resources recognition needs
//! and give them back in [`OcrEngine::terminate`].

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;

/// Errors from OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Engine has been terminated")]
    Terminated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(String),
}

/// A text recognition engine.
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &'static str;

    /// Recognize all text in an image. Runs on the blocking pool.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;

    /// Release native resources. Later `recognize` calls fail with
    /// [`OcrError::Terminated`].
    fn terminate(&self);
}

/// Creates the session's OCR engine on first use.
pub trait OcrEngineFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn OcrEngine>, OcrError>;
}

impl<F> OcrEngineFactory for F
where
    F: Fn() -> Result<Arc<dyn OcrEngine>, OcrError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn OcrEngine>, OcrError> {
        self()
    }
}

/// Configuration for the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition language (e.g., "eng", "deu+eng")
    pub language: String,
    /// Path or name of the tesseract binary
    pub tesseract_bin: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            tesseract_bin: PathBuf::from("tesseract"),
        }
    }
}

/// Tesseract OCR via command-line.
///
/// Owns a private scratch directory for the lifetime of the engine; each
/// recognition writes one PNG into it and removes it afterwards.
pub struct TesseractEngine {
    config: OcrConfig,
    workdir: Mutex<Option<TempDir>>,
}

impl TesseractEngine {
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        let workdir = tempfile::Builder::new()
            .prefix("summarizex-ocr-")
            .tempdir()?;
        tracing::debug!(path = ?workdir.path(), "Created OCR scratch directory");
        Ok(Self {
            config,
            workdir: Mutex::new(Some(workdir)),
        })
    }

    /// Factory that builds a fresh engine from `config`.
    pub fn factory(config: OcrConfig) -> impl OcrEngineFactory {
        move || -> Result<Arc<dyn OcrEngine>, OcrError> {
            Ok(Arc::new(TesseractEngine::new(config.clone())?))
        }
    }

    fn scratch_dir(&self) -> Result<PathBuf, OcrError> {
        let guard = self
            .workdir
            .lock()
            .map_err(|_| OcrError::OcrFailed("OCR engine state poisoned".to_string()))?;
        guard
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .ok_or(OcrError::Terminated)
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.config.tesseract_bin)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language])
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!(
                        "tesseract failed: {}",
                        stderr.trim()
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::EngineNotAvailable(format!(
                    "{} not found (install tesseract-ocr)",
                    self.config.tesseract_bin.display()
                )))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let dir = self.scratch_dir()?;

        // Removed on drop, whichever way we leave this function
        let page = tempfile::Builder::new()
            .prefix("page-")
            .suffix(".png")
            .tempfile_in(&dir)?;
        image
            .save_with_format(page.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Image(e.to_string()))?;

        let text = self.run_tesseract(page.path())?;

        tracing::debug!(
            chars = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tesseract recognition finished"
        );
        Ok(text)
    }

    fn terminate(&self) {
        let dir = match self.workdir.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(dir) = dir {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!(path = ?path, "Failed to remove OCR scratch directory: {}", e);
            } else {
                tracing::debug!(path = ?path, "Removed OCR scratch directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_removes_scratch_dir_once() {
        let engine = TesseractEngine::new(OcrConfig::default()).unwrap();
        let dir = engine.scratch_dir().unwrap();
        assert!(dir.exists());

        engine.terminate();
        assert!(!dir.exists());
        engine.terminate();

        let image = DynamicImage::new_rgb8(4, 4);
        assert!(matches!(
            engine.recognize(&image),
            Err(OcrError::Terminated)
        ));
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let engine = TesseractEngine::new(OcrConfig {
            language: "eng".to_string(),
            tesseract_bin: PathBuf::from("/nonexistent/bin/tesseract"),
        })
        .unwrap();

        let image = DynamicImage::new_rgb8(4, 4);
        let err = engine.recognize(&image).unwrap_err();
        assert!(
            matches!(err, OcrError::EngineNotAvailable(_)),
            "Expected EngineNotAvailable, got: {:?}",
            err
        );

        // The per-call PNG is gone even though recognition failed
        let dir = engine.scratch_dir().unwrap();
        assert_eq!(std::fs::read_dir(dir).unwrap().count(), 0);
    }

    #[test]
    fn test_closure_factory() {
        let factory = TesseractEngine::factory(OcrConfig::default());
        let engine = factory.create().unwrap();
        assert_eq!(engine.name(), "tesseract");
        engine.terminate();
    }
}
