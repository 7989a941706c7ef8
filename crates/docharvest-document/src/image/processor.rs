// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode embedded image payloads (encoded files or raw PDF
// pixel buffers) into a `DynamicImage`, and re-encode them as PNG when the
// source has no file encoding of its own.

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::ArtifactKind;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

/// Colour layout of an uncompressed pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Gray,
    Rgb,
    Cmyk,
}

/// Wrapper around a single decoded image.
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            HarvestError::partial(ArtifactKind::Image, format!("failed to decode image: {err}"))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Build an image from an uncompressed pixel buffer.
    ///
    /// Supports 8 bits per component for every layout and 1 bit per component
    /// for grayscale (rows padded to a byte boundary, 1 = white).
    pub fn from_raw_pixels(
        width: u32,
        height: u32,
        layout: PixelLayout,
        bits_per_component: u8,
        data: &[u8],
    ) -> Result<Self> {
        let (w, h) = (width as usize, height as usize);
        let image = match (layout, bits_per_component) {
            (PixelLayout::Gray, 1) => {
                let row_bytes = w.div_ceil(8);
                let needed = buffer_len(width, height, &[row_bytes, h])?;
                require_len(data, needed)?;
                let mut pixels = Vec::with_capacity(buffer_len(width, height, &[w, h])?);
                for row in data[..needed].chunks_exact(row_bytes.max(1)).take(h) {
                    for x in 0..w {
                        let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                        pixels.push(if bit == 1 { 255 } else { 0 });
                    }
                }
                GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
            }
            (PixelLayout::Gray, 8) => {
                let needed = buffer_len(width, height, &[w, h])?;
                require_len(data, needed)?;
                GrayImage::from_raw(width, height, data[..needed].to_vec())
                    .map(DynamicImage::ImageLuma8)
            }
            (PixelLayout::Rgb, 8) => {
                let needed = buffer_len(width, height, &[w, h, 3])?;
                require_len(data, needed)?;
                RgbImage::from_raw(width, height, data[..needed].to_vec())
                    .map(DynamicImage::ImageRgb8)
            }
            (PixelLayout::Cmyk, 8) => {
                let needed = buffer_len(width, height, &[w, h, 4])?;
                require_len(data, needed)?;
                let rgb: Vec<u8> = data[..needed]
                    .chunks_exact(4)
                    .flat_map(|px| {
                        let k = 255 - u32::from(px[3]);
                        let channel = |c: u8| ((255 - u32::from(c)) * k / 255) as u8;
                        [channel(px[0]), channel(px[1]), channel(px[2])]
                    })
                    .collect();
                RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
            }
            (layout, bits) => {
                return Err(HarvestError::partial(
                    ArtifactKind::Image,
                    format!("unsupported pixel format: {layout:?} at {bits} bits per component"),
                ));
            }
        };

        let image = image.ok_or_else(|| {
            HarvestError::partial(
                ArtifactKind::Image,
                format!("pixel buffer does not match {width}x{height}"),
            )
        })?;
        Ok(Self { image })
    }

    // -- Accessors ------------------------------------------------------------

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as baseline JPEG bytes.
    pub fn to_jpeg_bytes(&self) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgb8(self.image.to_rgb8());
        encode_to_format(&rgb, ImageFormat::Jpeg)
    }
}

/// Product of `factors`, or an error when it does not fit in memory.
fn buffer_len(width: u32, height: u32, factors: &[usize]) -> Result<usize> {
    factors
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| {
            HarvestError::partial(
                ArtifactKind::Image,
                format!("pixel buffer for {width}x{height} is too large"),
            )
        })
}

fn require_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(HarvestError::partial(
            ArtifactKind::Image,
            format!("pixel buffer truncated: {} of {needed} bytes", data.len()),
        ));
    }
    Ok(())
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        HarvestError::partial(ArtifactKind::Image, format!("image encoding failed: {err}"))
    })?;
    Ok(buffer)
}
