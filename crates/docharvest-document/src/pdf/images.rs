// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image XObjects: discovery in content-stream order and conversion into
// stored image blobs or decoded rasters.

use std::collections::HashSet;

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::{ArtifactKind, ImageEncoding};
use image::DynamicImage;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use super::objects::{self, get, get_dict, name, number};
use crate::image::{EmbeddedImage, ImageProcessor, PixelLayout};

/// Form XObjects nested deeper than this are not searched.
const MAX_FORM_DEPTH: usize = 8;

/// An image XObject referenced from a page.
pub(crate) struct ImageXObject<'a> {
    pub id: ObjectId,
    doc: &'a Document,
    stream: &'a Stream,
}

impl<'a> ImageXObject<'a> {
    fn dict(&self) -> &'a Dictionary {
        &self.stream.dict
    }

    fn int(&self, key: &[u8]) -> Option<u32> {
        get(self.doc, self.dict(), key)
            .and_then(number)
            .map(|n| n.max(0.0) as u32)
    }

    /// Pixel area, used to pick a page's dominant raster.
    pub fn area(&self) -> u64 {
        let width = self.int(b"Width").unwrap_or(0);
        let height = self.int(b"Height").unwrap_or(0);
        u64::from(width) * u64::from(height)
    }

    /// The last filter in the chain; it determines the stored encoding.
    fn final_filter(&self) -> Option<&'a [u8]> {
        match objects::get(self.doc, self.dict(), b"Filter")? {
            Object::Name(filter) => Some(filter.as_slice()),
            Object::Array(filters) => filters.last().and_then(name),
            _ => None,
        }
    }

    /// The blob written to storage: DCT and JPX streams verbatim, raw pixel
    /// data wrapped as PNG, anything else verbatim with an unknown encoding.
    pub fn to_embedded(&self) -> EmbeddedImage {
        match self.final_filter() {
            Some(b"DCTDecode") => EmbeddedImage {
                encoding: ImageEncoding::Jpeg,
                data: self.stream.content.clone(),
            },
            Some(b"JPXDecode") => EmbeddedImage {
                encoding: ImageEncoding::Jpeg2000,
                data: self.stream.content.clone(),
            },
            Some(b"FlateDecode") | Some(b"LZWDecode") | None => {
                match self.decode_pixels().and_then(|img| img.to_png_bytes()) {
                    Ok(data) => EmbeddedImage {
                        encoding: ImageEncoding::Png,
                        data,
                    },
                    Err(err) => {
                        debug!(
                            object = ?self.id,
                            %err,
                            "Keeping undecodable pixel stream verbatim"
                        );
                        self.verbatim()
                    }
                }
            }
            Some(_) => self.verbatim(),
        }
    }

    /// Decode into a raster for OCR.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let processor = match self.final_filter() {
            Some(b"DCTDecode") => ImageProcessor::from_bytes(&self.stream.content)?,
            Some(b"FlateDecode") | Some(b"LZWDecode") | None => self.decode_pixels()?,
            Some(other) => {
                return Err(HarvestError::Ocr(format!(
                    "cannot rasterise {} image",
                    String::from_utf8_lossy(other)
                )));
            }
        };
        Ok(processor.into_dynamic())
    }

    fn verbatim(&self) -> EmbeddedImage {
        EmbeddedImage {
            encoding: ImageEncoding::Unknown,
            data: self.stream.content.clone(),
        }
    }

    fn decode_pixels(&self) -> Result<ImageProcessor> {
        let invalid = |reason: &str| HarvestError::partial(ArtifactKind::Image, reason);
        let width = self.int(b"Width").ok_or_else(|| invalid("image without /Width"))?;
        let height = self.int(b"Height").ok_or_else(|| invalid("image without /Height"))?;

        let is_mask = matches!(
            get(self.doc, self.dict(), b"ImageMask"),
            Some(Object::Boolean(true))
        );
        let (layout, bits) = if is_mask {
            (PixelLayout::Gray, 1)
        } else {
            let bits = self.int(b"BitsPerComponent").unwrap_or(8) as u8;
            (self.pixel_layout()?, bits)
        };

        let data = if self.final_filter().is_some() {
            self.stream.decompressed_content().map_err(|err| {
                HarvestError::partial(ArtifactKind::Image, format!("stream decode failed: {err}"))
            })?
        } else {
            self.stream.content.clone()
        };

        ImageProcessor::from_raw_pixels(width, height, layout, bits, &data)
    }

    fn pixel_layout(&self) -> Result<PixelLayout> {
        let space = get(self.doc, self.dict(), b"ColorSpace");
        let family: &[u8] = match space {
            Some(Object::Name(n)) => n.as_slice(),
            Some(Object::Array(parts)) => parts.first().and_then(name).unwrap_or_default(),
            _ => b"DeviceGray",
        };
        match family {
            b"DeviceGray" | b"CalGray" => Ok(PixelLayout::Gray),
            b"DeviceRGB" | b"CalRGB" => Ok(PixelLayout::Rgb),
            b"DeviceCMYK" => Ok(PixelLayout::Cmyk),
            b"ICCBased" => {
                let components = match space {
                    Some(Object::Array(parts)) => parts
                        .get(1)
                        .and_then(|profile| objects::resolve(self.doc, profile))
                        .and_then(|profile| match profile {
                            Object::Stream(s) => get(self.doc, &s.dict, b"N").and_then(number),
                            _ => None,
                        }),
                    _ => None,
                };
                match components.map(|n| n as u32) {
                    Some(1) => Ok(PixelLayout::Gray),
                    Some(4) => Ok(PixelLayout::Cmyk),
                    _ => Ok(PixelLayout::Rgb),
                }
            }
            other => Err(HarvestError::partial(
                ArtifactKind::Image,
                format!("unsupported colour space {}", String::from_utf8_lossy(other)),
            )),
        }
    }
}

/// Image XObjects painted by a page, in `Do` order, including those inside
/// form XObjects. Objects already in `seen` are skipped.
pub(crate) fn page_images<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    seen: &mut HashSet<ObjectId>,
) -> Result<Vec<ImageXObject<'a>>> {
    let content = doc.get_page_content(page_id).map_err(|err| {
        HarvestError::partial(ArtifactKind::Image, format!("page content unreadable: {err}"))
    })?;
    let mut images = Vec::new();
    if let Some(resources) = objects::page_resources(doc, page_id) {
        collect(doc, &content, resources, seen, &mut images, 0)?;
    }
    Ok(images)
}

fn collect<'a>(
    doc: &'a Document,
    content: &[u8],
    resources: &'a Dictionary,
    seen: &mut HashSet<ObjectId>,
    out: &mut Vec<ImageXObject<'a>>,
    depth: usize,
) -> Result<()> {
    let Some(xobjects) = get_dict(doc, resources, b"XObject") else {
        return Ok(());
    };
    let content = Content::decode(content).map_err(|err| {
        HarvestError::partial(ArtifactKind::Image, format!("content stream unreadable: {err}"))
    })?;

    for operation in content.operations.iter().filter(|op| op.operator == "Do") {
        let Some(resource) = operation.operands.first().and_then(name) else {
            continue;
        };
        let Ok(Object::Reference(id)) = xobjects.get(resource) else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };

        match get(doc, &stream.dict, b"Subtype").and_then(name) {
            Some(b"Image") => {
                if seen.insert(*id) {
                    out.push(ImageXObject { id: *id, doc, stream });
                }
            }
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                let form_resources = get_dict(doc, &stream.dict, b"Resources").unwrap_or(resources);
                match stream.decompressed_content() {
                    Ok(form_content) => {
                        collect(doc, &form_content, form_resources, seen, out, depth + 1)?
                    }
                    Err(_) => collect(doc, &stream.content, form_resources, seen, out, depth + 1)?,
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Every image of the document, pages in order, each object once.
pub(crate) fn document_images(doc: &Document) -> Result<Vec<EmbeddedImage>> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        match page_images(doc, page_id, &mut seen) {
            Ok(found) => images.extend(found.iter().map(ImageXObject::to_embedded)),
            Err(err) => warn!(page = page_number, %err, "Skipping images of unreadable page"),
        }
    }
    Ok(images)
}
