// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docharvest-document — Format loaders and artifact extraction for Docharvest.
//
// Opens PDF, DOCX, and PPTX files and extracts their text, links, images,
// tables, and metadata. PDF pages without a text layer can be recovered with
// OCR (feature `ocr`).

pub mod extract;
pub mod image;
pub mod loader;
pub mod office;
pub mod pdf;
pub mod scan;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export the primary types so callers can use `docharvest_document::Extractor` etc.
pub use extract::{DocumentSource, Extractor};
pub use loader::{DocumentHandle, Loader, loader_for};
pub use office::{DocxDocument, PptxDocument};
pub use pdf::PdfDocument;
pub use scan::TextRecognizer;

#[cfg(feature = "ocr")]
pub use scan::{OcrConfig, OcrEngine};
