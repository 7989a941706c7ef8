// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX (WordprocessingML) documents.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use docharvest_core::error::Result;
use docharvest_core::types::{ArtifactKind, Table};
use tracing::{debug, instrument};

use super::package::OfficePackage;
use super::table::{TableDialect, read_tables};
use crate::extract::DocumentSource;
use crate::image::EmbeddedImage;
use crate::scan::TextRecognizer;

/// The main document part every DOCX package must carry.
pub const MAIN_PART: &str = "word/document.xml";

/// An opened Word document.
pub struct DocxDocument {
    package: OfficePackage,
}

impl DocxDocument {
    /// Open a DOCX file, reading the whole package into memory.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = super::read_container(path)?;
        Self::from_bytes(&path.display().to_string(), &data)
    }

    /// Parse a DOCX package already in memory. `label` names it in errors.
    pub fn from_bytes(label: &str, data: &[u8]) -> Result<Self> {
        let package = OfficePackage::from_bytes(label, data, MAIN_PART)?;
        Ok(Self { package })
    }

    fn body(&self, kind: ArtifactKind) -> Result<&[u8]> {
        self.package.require_part(MAIN_PART, kind)
    }
}

impl DocumentSource for DocxDocument {
    /// One unit per non-empty body paragraph; table cell paragraphs are
    /// reported with the tables instead.
    fn extract_text(&self, _recognizer: Option<&dyn TextRecognizer>) -> Result<Vec<String>> {
        let paragraphs = super::paragraph_texts(self.body(ArtifactKind::Text)?)?;
        debug!(paragraphs = paragraphs.len(), "DOCX text extracted");
        Ok(paragraphs)
    }

    fn extract_links(&self) -> Result<Vec<String>> {
        super::hyperlinks_of(&self.package, MAIN_PART, &[b"hyperlink".as_slice()])
    }

    fn extract_images(&self) -> Result<Vec<EmbeddedImage>> {
        super::images_of(&self.package, MAIN_PART, &mut HashSet::new())
    }

    fn extract_tables(&self) -> Result<Vec<Table>> {
        read_tables(self.body(ArtifactKind::Table)?, TableDialect::Word)
    }

    fn extract_metadata(&self) -> Result<BTreeMap<String, String>> {
        self.package.properties()
    }
}
