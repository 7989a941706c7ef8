// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page text with OCR fallback, link annotations, image
// XObjects, layout-inferred tables, and the info dictionary.

pub(crate) mod images;
pub(crate) mod info;
pub(crate) mod objects;
pub mod reader;
pub(crate) mod tables;

pub use reader::PdfDocument;
