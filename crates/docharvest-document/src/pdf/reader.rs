// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open existing PDF documents with `lopdf` and pull out their
// text layer, link annotations, image XObjects, layout tables, and info
// dictionary. Pages without a text layer fall back to OCR.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::Table;
use lopdf::{Document, ObjectId};
use tracing::{debug, info, instrument, warn};

use super::{images, info as info_dict, objects, tables};
use crate::extract::DocumentSource;
use crate::image::EmbeddedImage;
use crate::scan::TextRecognizer;

/// An opened PDF document.
pub struct PdfDocument {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HarvestError::FileNotFound(path.to_path_buf()));
        }
        info!("Opening PDF: {}", path.display());

        let document = Document::load(path)
            .map_err(|err| HarvestError::corrupt(path.display(), format!("invalid PDF: {err}")))?;

        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Parse PDF bytes already in memory. `label` names them in errors.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(label: &str, data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| HarvestError::corrupt(label, format!("invalid PDF: {err}")))?;
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// The text layer of one page, trimmed. Empty when the page has none.
    fn page_text(&self, page_number: u32) -> String {
        match self.document.extract_text(&[page_number]) {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                warn!(page = page_number, %err, "Text layer unreadable");
                String::new()
            }
        }
    }

    /// OCR the dominant raster of an image-only page.
    fn recognize_page(
        &self,
        page_number: u32,
        page_id: ObjectId,
        recognizer: Option<&dyn TextRecognizer>,
    ) -> String {
        let candidates = match images::page_images(&self.document, page_id, &mut HashSet::new()) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(page = page_number, %err, "Cannot look for a page raster");
                return String::new();
            }
        };
        let Some(raster) = candidates.iter().max_by_key(|xobject| xobject.area()) else {
            debug!(page = page_number, "Page has neither text nor images");
            return String::new();
        };
        let Some(recognizer) = recognizer else {
            warn!(page = page_number, "Image-only page left empty: no OCR engine configured");
            return String::new();
        };

        let recognized = raster
            .to_dynamic()
            .and_then(|image| recognizer.recognize_text(&image));
        match recognized {
            Ok(text) => {
                info!(page = page_number, chars = text.len(), "Page text recovered by OCR");
                text.trim().to_string()
            }
            Err(err) => {
                warn!(page = page_number, %err, "OCR failed for page");
                String::new()
            }
        }
    }
}

impl DocumentSource for PdfDocument {
    /// One unit per page. Only pages whose text layer is empty are sent to
    /// the recognizer; the rest use their text layer as-is.
    fn extract_text(&self, recognizer: Option<&dyn TextRecognizer>) -> Result<Vec<String>> {
        let pages = self.document.get_pages();
        let mut units = Vec::with_capacity(pages.len());
        for (page_number, page_id) in pages {
            let text = self.page_text(page_number);
            if text.is_empty() {
                units.push(self.recognize_page(page_number, page_id, recognizer));
            } else {
                units.push(text);
            }
        }
        Ok(units)
    }

    fn extract_links(&self) -> Result<Vec<String>> {
        Ok(self
            .document
            .get_pages()
            .into_values()
            .flat_map(|page_id| objects::page_link_uris(&self.document, page_id))
            .collect())
    }

    fn extract_images(&self) -> Result<Vec<EmbeddedImage>> {
        images::document_images(&self.document)
    }

    fn extract_tables(&self) -> Result<Vec<Table>> {
        let mut found = Vec::new();
        for page_id in self.document.get_pages().into_values() {
            found.extend(tables::page_tables(&self.document, page_id)?);
        }
        Ok(found)
    }

    fn extract_metadata(&self) -> Result<BTreeMap<String, String>> {
        Ok(info_dict::document_info(&self.document))
    }
}
