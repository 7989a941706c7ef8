// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extractor — turns a loaded document into an `ExtractionResult`.
//
// Each artifact kind is extracted independently. A kind whose extraction
// fails degrades to its empty value and the remaining kinds still run.

use std::collections::{BTreeMap, HashSet};

use docharvest_core::error::Result;
use docharvest_core::types::{ArtifactKind, ExtractedImage, ExtractionResult, Table};
use tracing::{debug, info, instrument, warn};

use crate::image::EmbeddedImage;
use crate::loader::DocumentHandle;
use crate::scan::TextRecognizer;

/// The per-format extraction capability. One implementation per format.
pub trait DocumentSource {
    /// Text units in document order: pages, body paragraphs, or slides.
    ///
    /// `recognizer` is consulted only by formats that can lack a text layer.
    fn extract_text(&self, recognizer: Option<&dyn TextRecognizer>) -> Result<Vec<String>>;

    fn extract_links(&self) -> Result<Vec<String>>;

    /// Embedded images in extraction order, not yet indexed.
    fn extract_images(&self) -> Result<Vec<EmbeddedImage>>;

    fn extract_tables(&self) -> Result<Vec<Table>>;

    /// Document properties. Absent properties are omitted.
    fn extract_metadata(&self) -> Result<BTreeMap<String, String>>;
}

/// Runs every extraction routine of a document, isolating failures per kind.
#[derive(Default)]
pub struct Extractor {
    recognizer: Option<Box<dyn TextRecognizer>>,
}

impl Extractor {
    /// An extractor without OCR; image-only PDF pages yield empty text.
    pub fn new() -> Self {
        Self::default()
    }

    /// An extractor that OCRs PDF pages lacking a text layer.
    pub fn with_recognizer(recognizer: Box<dyn TextRecognizer>) -> Self {
        Self {
            recognizer: Some(recognizer),
        }
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Extract all five artifact kinds. Consumes the handle; the parsed
    /// document is dropped once extraction finishes.
    #[instrument(skip_all, fields(format = %handle.format()))]
    pub fn extract(&self, handle: DocumentHandle) -> ExtractionResult {
        let source = handle.source();

        let text = degrade(
            ArtifactKind::Text,
            source.extract_text(self.recognizer.as_deref()),
        );
        let links = dedupe(degrade(ArtifactKind::Link, source.extract_links()));
        let images = degrade(ArtifactKind::Image, source.extract_images())
            .into_iter()
            .zip(1u32..)
            .map(|(image, index)| ExtractedImage {
                index,
                encoding: image.encoding,
                data: image.data,
            })
            .collect();
        let tables = degrade(ArtifactKind::Table, source.extract_tables());
        let metadata = degrade(ArtifactKind::Metadata, source.extract_metadata());

        let result = ExtractionResult {
            text,
            links,
            images,
            tables,
            metadata,
        };
        info!(
            text = result.text.len(),
            links = result.links.len(),
            images = result.images.len(),
            tables = result.tables.len(),
            metadata = result.metadata.len(),
            "Extraction complete"
        );
        result
    }
}

/// Swallow a failed kind, logging it as a partial extraction failure.
fn degrade<T: Default>(kind: ArtifactKind, outcome: Result<T>) -> T {
    match outcome {
        Ok(value) => value,
        Err(err) => {
            warn!(%kind, error = %err, "PartialExtractionFailure: continuing with empty {kind}");
            T::default()
        }
    }
}

/// Drop repeated URLs, keeping the first occurrence.
fn dedupe(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect();
    debug!(links = unique.len(), "Links de-duplicated");
    unique
}
