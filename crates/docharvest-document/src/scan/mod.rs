// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Optical character recognition for PDF pages that carry no text layer.

#[cfg(feature = "ocr")]
pub mod ocr;

use docharvest_core::error::Result;
use image::DynamicImage;

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrEngine};

/// Anything that can turn a page raster into text.
///
/// The PDF extractor only calls this for pages whose text layer is empty.
pub trait TextRecognizer {
    fn recognize_text(&self, image: &DynamicImage) -> Result<String>;
}
