// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office Open XML documents — DOCX and PPTX packages.

pub mod docx;
pub mod package;
pub mod pptx;
pub(crate) mod table;
pub(crate) mod xml;

pub use docx::DocxDocument;
pub use package::{OfficePackage, Relationship};
pub use pptx::PptxDocument;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::ArtifactKind;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::image::EmbeddedImage;

/// Read a package file, distinguishing a missing path from an unreadable one.
pub(crate) fn read_container(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => HarvestError::FileNotFound(path.to_path_buf()),
        _ => HarvestError::corrupt(path.display(), err),
    })
}

/// Non-empty paragraphs of a part, outside tables, in document order.
///
/// Runs are concatenated; `tab` inside a run becomes `\t` and `br`/`cr`
/// become `\n`.
pub(crate) fn paragraph_texts(raw: &[u8]) -> Result<Vec<String>> {
    let mut reader = xml::reader(raw);
    let mut open: Vec<String> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut table_depth = 0usize;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(|err| {
            HarvestError::partial(ArtifactKind::Text, format!("malformed XML: {err}"))
        })?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"p" if table_depth == 0 => open.push(String::new()),
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) if table_depth == 0 => {
                let Some(paragraph) = open.last_mut() else {
                    continue;
                };
                match e.local_name().as_ref() {
                    b"tab" if in_run => paragraph.push('\t'),
                    b"br" | b"cr" => paragraph.push('\n'),
                    _ => {}
                }
            }
            Event::Text(t) if in_text && table_depth == 0 => {
                if let Some(paragraph) = open.last_mut() {
                    paragraph.push_str(&xml::text(&t));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"p" if table_depth == 0 => {
                    if let Some(paragraph) = open.pop() {
                        if !paragraph.trim().is_empty() {
                            paragraphs.push(paragraph);
                        }
                    }
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}

/// Relationship ids picked from elements of a part, in document order.
pub(crate) fn collect_references(
    raw: &[u8],
    kind: ArtifactKind,
    pick: impl Fn(&BytesStart<'_>) -> Option<String>,
) -> Result<Vec<String>> {
    let mut reader = xml::reader(raw);
    let mut ids = Vec::new();
    loop {
        let event = reader
            .read_event()
            .map_err(|err| HarvestError::partial(kind, format!("malformed XML: {err}")))?;
        match event {
            Event::Start(e) | Event::Empty(e) => ids.extend(pick(&e)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// External hyperlink targets of `part`: those referenced by one of
/// `elements` first, in document order, then hyperlink relationships nothing
/// referenced.
pub(crate) fn hyperlinks_of(
    package: &OfficePackage,
    part: &str,
    elements: &[&[u8]],
) -> Result<Vec<String>> {
    let raw = package.require_part(part, ArtifactKind::Link)?;
    let relationships = package.relationships(part, ArtifactKind::Link)?;
    let external: HashMap<&str, &Relationship> = relationships
        .iter()
        .filter(|rel| rel.external && rel.is_type("hyperlink"))
        .map(|rel| (rel.id.as_str(), rel))
        .collect();

    let referenced = collect_references(raw, ArtifactKind::Link, |e| {
        elements
            .contains(&e.local_name().as_ref())
            .then(|| xml::relationship_id(e))
            .flatten()
    })?;

    let mut links: Vec<String> = referenced
        .iter()
        .filter_map(|id| external.get(id.as_str()))
        .map(|rel| rel.target.clone())
        .collect();
    links.extend(
        relationships
            .iter()
            .filter(|rel| rel.external && rel.is_type("hyperlink"))
            .filter(|rel| !referenced.contains(&rel.id))
            .map(|rel| rel.target.clone()),
    );
    Ok(links)
}

/// Images of `part`: `a:blip`/`v:imagedata` references in document order,
/// then image relationships nothing referenced. Parts already in `seen` are
/// skipped so an image reused across slides is emitted once.
pub(crate) fn images_of(
    package: &OfficePackage,
    part: &str,
    seen: &mut HashSet<String>,
) -> Result<Vec<EmbeddedImage>> {
    let raw = package.require_part(part, ArtifactKind::Image)?;
    let relationships = package.relationships(part, ArtifactKind::Image)?;
    let by_id: HashMap<&str, &Relationship> = relationships
        .iter()
        .filter(|rel| !rel.external)
        .map(|rel| (rel.id.as_str(), rel))
        .collect();

    let referenced = collect_references(raw, ArtifactKind::Image, |e| {
        match e.local_name().as_ref() {
            b"blip" => xml::attr(e, b"embed"),
            b"imagedata" => xml::relationship_id(e),
            _ => None,
        }
    })?;

    let mut targets: Vec<&str> = referenced
        .iter()
        .filter_map(|id| by_id.get(id.as_str()))
        .map(|rel| rel.target.as_str())
        .collect();
    targets.extend(
        relationships
            .iter()
            .filter(|rel| !rel.external && rel.is_type("image"))
            .map(|rel| rel.target.as_str()),
    );

    let mut images = Vec::new();
    for target in targets {
        if !seen.insert(target.to_string()) {
            continue;
        }
        match package.part(target) {
            Some(data) => images.push(EmbeddedImage::detect(data.to_vec(), target)),
            None => warn!(part = %target, "Image relationship points at a missing part"),
        }
    }
    Ok(images)
}
