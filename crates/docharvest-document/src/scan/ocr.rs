// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine backed by `ocrs`, a pure-Rust OCR engine whose neural network
// models are executed via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled.
//
// # Model Setup
//
// The engine requires two model files in one directory:
//
// - `text-detection.rten` locates text regions in the image.
// - `text-recognition.rten` decodes characters from detected regions.
//
// Running `ocrs-cli` once downloads both into `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is the default model directory.

use std::path::{Path, PathBuf};

use docharvest_core::error::{HarvestError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use super::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expect `text-detection.rten` and `text-recognition.rten` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Use `dir` when given, the default cache otherwise.
    pub fn from_optional_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::from_dir).unwrap_or_default()
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(HarvestError::Ocr(format!(
                    "model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Loaded `ocrs` engine. Model loading is the expensive step, so one engine
/// is built per run and reused for every page.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl OcrEngine {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let detection_model = load_model(&config.detection_model_path)?;
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| HarvestError::Ocr(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        HarvestError::Ocr(format!("failed to load model from {}: {err}", path.display()))
    })
}

impl TextRecognizer for OcrEngine {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize_text(&self, image: &DynamicImage) -> Result<String> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            HarvestError::Ocr(format!("failed to create image source ({width}x{height}): {err}"))
        })?;

        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| HarvestError::Ocr(format!("preprocessing failed: {err}")))?;

        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| HarvestError::Ocr(format!("recognition failed: {err}")))?;

        debug!(line_count = text.lines().count(), "OCR recognition complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir() {
        let config = OcrConfig::from_dir("/tmp/my-models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/tmp/my-models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let err = OcrConfig::from_dir(dir.path()).validate().unwrap_err();
        assert!(err.to_string().contains("text-detection.rten"));
    }

    #[test]
    fn engine_creation_without_models_is_an_ocr_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OcrEngine::new(OcrConfig::from_dir(dir.path())).err().unwrap();
        assert_eq!(err.kind(), docharvest_core::ErrorKind::Ocr);
    }
}
