// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — embedded image payloads, encoding detection, and decoding.

pub mod processor;

pub use processor::{ImageProcessor, PixelLayout};

use docharvest_core::types::ImageEncoding;
use image::ImageFormat;

/// An image blob found in a document, before extraction-order indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub encoding: ImageEncoding,
    pub data: Vec<u8>,
}

impl EmbeddedImage {
    /// Wrap `data`, detecting its encoding from the bytes and falling back to
    /// the extension of `name_hint` (e.g. `word/media/image1.emf`).
    pub fn detect(data: Vec<u8>, name_hint: &str) -> Self {
        let encoding = sniff_encoding(&data).unwrap_or_else(|| {
            name_hint
                .rsplit_once('.')
                .map(|(_, ext)| ImageEncoding::from_extension(ext))
                .unwrap_or(ImageEncoding::Unknown)
        });
        Self { encoding, data }
    }
}

/// Identify the encoding of an image blob from its leading bytes.
pub fn sniff_encoding(data: &[u8]) -> Option<ImageEncoding> {
    const JP2_SIGNATURE: &[u8] = b"\x00\x00\x00\x0cjP  \r\n\x87\n";
    const J2K_CODESTREAM: &[u8] = b"\xff\x4f\xff\x51";
    if data.starts_with(JP2_SIGNATURE) || data.starts_with(J2K_CODESTREAM) {
        return Some(ImageEncoding::Jpeg2000);
    }

    match image::guess_format(data).ok()? {
        ImageFormat::Png => Some(ImageEncoding::Png),
        ImageFormat::Jpeg => Some(ImageEncoding::Jpeg),
        ImageFormat::Gif => Some(ImageEncoding::Gif),
        ImageFormat::Bmp => Some(ImageEncoding::Bmp),
        ImageFormat::Tiff => Some(ImageEncoding::Tiff),
        ImageFormat::WebP => Some(ImageEncoding::Webp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_png_from_bytes_not_name() {
        let png = ImageProcessor::from_raw_pixels(2, 2, PixelLayout::Gray, 8, &[0; 4])
            .unwrap()
            .to_png_bytes()
            .unwrap();
        let image = EmbeddedImage::detect(png, "word/media/image1.jpeg");
        assert_eq!(image.encoding, ImageEncoding::Png);
    }

    #[test]
    fn falls_back_to_extension_for_vector_formats() {
        let image = EmbeddedImage::detect(vec![1, 0, 0, 0, 0x6c], "ppt/media/image3.emf");
        assert_eq!(image.encoding, ImageEncoding::Emf);

        let image = EmbeddedImage::detect(vec![1, 2, 3], "ppt/media/blob");
        assert_eq!(image.encoding, ImageEncoding::Unknown);
    }
}
