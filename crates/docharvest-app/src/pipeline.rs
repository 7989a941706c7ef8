// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline — load, extract, and store each input file in turn.
//
// The storage backend and extractor are built once per run from the
// configuration. Files are processed sequentially; a failing file is
// reported and the batch moves on.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use docharvest_core::config::{HarvestConfig, OcrSettings};
use docharvest_core::error::{ErrorKind, HarvestError, Result};
use docharvest_core::human_errors::humanize_error;
use docharvest_core::types::{ArtifactKind, DocumentFormat, RunId, SourceFile, SourceKey};
use docharvest_document::{Extractor, TextRecognizer, loader_for};
use docharvest_storage::{ArtifactFilter, Storage, StoredArtifact, open_storage};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

/// Outcome of one successfully stored file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub source: SourceKey,
    pub format: DocumentFormat,
    /// Items stored per artifact kind.
    pub counts: BTreeMap<ArtifactKind, usize>,
    /// An earlier file of the same run whose artifacts shared this key and
    /// were overwritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrote: Option<PathBuf>,
}

/// A file that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub error: String,
    pub suggestion: String,
}

/// Per-file results of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: RunId,
    pub succeeded: Vec<FileReport>,
    pub failed: Vec<FileFailure>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives Loader → Extractor → Storage for each input file.
pub struct Pipeline {
    extractor: Extractor,
    storage: Box<dyn Storage>,
    run_id: RunId,
}

impl Pipeline {
    pub fn new(extractor: Extractor, storage: Box<dyn Storage>) -> Self {
        Self {
            extractor,
            storage,
            run_id: RunId::new(),
        }
    }

    /// Open the configured backend and build the extractor.
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        config.validate()?;
        let storage = open_storage(&config.output)?;
        let extractor = match recognizer(&config.ocr) {
            Some(recognizer) => Extractor::with_recognizer(recognizer),
            None => Extractor::new(),
        };
        info!(
            backend = storage.backend(),
            ocr = extractor.has_recognizer(),
            "Pipeline ready"
        );
        Ok(Self::new(extractor, storage))
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Process one file.
    ///
    /// An unrecognised extension fails with `UnsupportedFormat` before any
    /// loader runs. Loader and storage errors propagate; per-kind extraction
    /// failures have already been absorbed by the extractor.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn process(&mut self, path: impl AsRef<Path>) -> Result<FileReport> {
        let source = SourceFile::new(path.as_ref())?;
        let handle = loader_for(source.format).load(&source.path)?;
        let result = self.extractor.extract(handle);
        self.storage.save(&result, &source.key)?;

        let counts = ArtifactKind::ALL
            .into_iter()
            .map(|kind| (kind, result.count(kind)))
            .collect();
        info!(source = %source.key, format = %source.format, "File processed");
        Ok(FileReport {
            path: source.path,
            source: source.key,
            format: source.format,
            counts,
            overwrote: None,
        })
    }

    /// Process every path in order. One file's failure never stops the rest.
    #[instrument(skip_all, fields(run_id = %self.run_id, files = paths.len()))]
    pub fn process_batch<P: AsRef<Path>>(&mut self, paths: &[P]) -> BatchReport {
        let mut report = BatchReport {
            run_id: self.run_id,
            succeeded: Vec::new(),
            failed: Vec::new(),
        };

        let mut seen: HashMap<SourceKey, PathBuf> = HashMap::new();
        for path in paths {
            let path = path.as_ref();
            match self.process(path) {
                Ok(mut file) => {
                    if let Some(previous) = seen.insert(file.source.clone(), file.path.clone()) {
                        warn!(
                            source = %file.source,
                            previous = %previous.display(),
                            path = %file.path.display(),
                            "Source key repeated in this run; earlier artifacts overwritten"
                        );
                        file.overwrote = Some(previous);
                    }
                    report.succeeded.push(file);
                }
                Err(err) => {
                    error!(path = %path.display(), kind = %err.kind(), error = %err, "File failed");
                    report.failed.push(failure(path, &err));
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Batch complete"
        );
        report
    }

    /// Read stored artifacts back from the run's backend.
    pub fn display(&self, filter: &ArtifactFilter) -> Result<Vec<StoredArtifact>> {
        self.storage.display(filter)
    }
}

fn failure(path: &Path, err: &HarvestError) -> FileFailure {
    let human = humanize_error(err);
    FileFailure {
        path: path.to_path_buf(),
        kind: human.kind,
        error: err.to_string(),
        suggestion: human.suggestion,
    }
}

/// The OCR engine for image-only PDF pages, when enabled and available.
#[cfg(feature = "ocr")]
fn recognizer(settings: &OcrSettings) -> Option<Box<dyn TextRecognizer>> {
    use docharvest_document::{OcrConfig, OcrEngine};

    if !settings.enabled {
        return None;
    }
    match OcrEngine::new(OcrConfig::from_optional_dir(settings.model_dir.as_deref())) {
        Ok(engine) => Some(Box::new(engine)),
        Err(err) => {
            warn!(error = %err, "OCR unavailable; image-only pages will have no text");
            None
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn recognizer(settings: &OcrSettings) -> Option<Box<dyn TextRecognizer>> {
    if settings.enabled {
        warn!("Built without the `ocr` feature; image-only pages will have no text");
    }
    None
}
