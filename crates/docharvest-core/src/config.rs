// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

/// Default base directory for filesystem output.
pub const DEFAULT_OUTPUT_DIR: &str = "output_data";

/// Settings for one extraction run.
///
/// Built once and passed into storage and extractor construction; nothing
/// here is read from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Where extracted artifacts are persisted.
    pub output: OutputConfig,
    /// OCR fallback for PDF pages without a text layer.
    pub ocr: OcrSettings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig::Filesystem {
                base_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            },
            ocr: OcrSettings::default(),
        }
    }
}

impl HarvestConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            HarvestError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot possibly work.
    pub fn validate(&self) -> Result<()> {
        match &self.output {
            OutputConfig::Filesystem { base_dir } if base_dir.as_os_str().is_empty() => {
                return Err(HarvestError::Config(
                    "filesystem output needs a base directory".into(),
                ));
            }
            OutputConfig::Database { path, .. } if path.as_os_str().is_empty() => {
                return Err(HarvestError::Config("database output needs a path".into()));
            }
            _ => {}
        }
        if let Some(dir) = &self.ocr.model_dir {
            if dir.as_os_str().is_empty() {
                return Err(HarvestError::Config("OCR model directory is empty".into()));
            }
        }
        Ok(())
    }
}

/// Destination backend, selected once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputConfig {
    /// Fixed subdirectory layout under `base_dir`.
    Filesystem { base_dir: PathBuf },
    /// SQLite database file.
    Database {
        path: PathBuf,
        #[serde(default)]
        on_duplicate: DuplicatePolicy,
    },
}

/// What the database backend does when a source key is saved again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Delete the key's earlier rows of a kind before inserting the new ones.
    #[default]
    Replace,
    /// Insert only; re-extraction leaves duplicate rows.
    Append,
}

/// OCR fallback settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub enabled: bool,
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// `None` means the default model cache.
    pub model_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_writes_to_output_data() {
        let config = HarvestConfig::default();
        assert_eq!(
            config.output,
            OutputConfig::Filesystem {
                base_dir: PathBuf::from("output_data")
            }
        );
        assert!(config.ocr.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_database_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.json");
        std::fs::write(
            &path,
            r#"{ "output": { "mode": "database", "path": "extracted.db" } }"#,
        )
        .unwrap();

        let config = HarvestConfig::load(&path).unwrap();
        assert_eq!(
            config.output,
            OutputConfig::Database {
                path: PathBuf::from("extracted.db"),
                on_duplicate: DuplicatePolicy::Replace,
            }
        );
        assert_eq!(config.ocr, OcrSettings::default());
    }

    #[test]
    fn empty_base_dir_is_rejected() {
        let config = HarvestConfig {
            output: OutputConfig::Filesystem {
                base_dir: PathBuf::new(),
            },
            ..HarvestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = HarvestConfig::load("/nonexistent/harvest.json").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
