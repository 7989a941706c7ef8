// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OOXML package access: the zip container, relationship parts, and the
// core/app property parts shared by DOCX and PPTX.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::ArtifactKind;
use quick_xml::events::Event;
use tracing::debug;
use zip::ZipArchive;

use super::xml;

/// Leading bytes of an OLE2 compound file (legacy `.ppt`, `.doc`).
const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const CORE_PROPERTIES_PART: &str = "docProps/core.xml";
const APP_PROPERTIES_PART: &str = "docProps/app.xml";

/// One entry of a `_rels/*.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    /// Full relationship type URI.
    pub rel_type: String,
    /// Absolute part name for internal targets, the raw URI for external ones.
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the type URI ends with `/<suffix>` (e.g. `hyperlink`, `image`).
    pub fn is_type(&self, suffix: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|last| last == suffix)
    }
}

/// An OOXML package read fully into memory.
pub struct OfficePackage {
    parts: HashMap<String, Vec<u8>>,
}

impl OfficePackage {
    /// Unpack `data`, requiring `main_part` to be present.
    ///
    /// `label` names the source in error messages.
    pub fn from_bytes(label: &str, data: &[u8], main_part: &str) -> Result<Self> {
        if data.starts_with(&OLE2_MAGIC) {
            return Err(HarvestError::corrupt(
                label,
                "legacy binary (OLE2) Office file; only OOXML packages can be read",
            ));
        }

        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|err| HarvestError::corrupt(label, format!("invalid zip container: {err}")))?;

        let mut parts = HashMap::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(|err| {
                HarvestError::corrupt(label, format!("unreadable zip entry {index}: {err}"))
            })?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes).map_err(|err| {
                HarvestError::corrupt(label, format!("failed to inflate {name}: {err}"))
            })?;
            parts.insert(name, bytes);
        }

        if !parts.contains_key(main_part) {
            return Err(HarvestError::corrupt(
                label,
                format!("package has no {main_part} part"),
            ));
        }

        debug!(parts = parts.len(), "OOXML package unpacked");
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// Like [`part`](Self::part), but a missing part is an extraction failure
    /// for `kind`.
    pub fn require_part(&self, name: &str, kind: ArtifactKind) -> Result<&[u8]> {
        self.part(name)
            .ok_or_else(|| HarvestError::partial(kind, format!("missing part {name}")))
    }

    /// Relationships declared by `part`. A part without a `.rels` file has none.
    ///
    /// A malformed `.rels` part fails the extraction of `kind`.
    pub fn relationships(&self, part: &str, kind: ArtifactKind) -> Result<Vec<Relationship>> {
        let Some(raw) = self.part(&rels_part_name(part)) else {
            return Ok(Vec::new());
        };

        let mut reader = xml::reader(raw);
        let mut relationships = Vec::new();
        loop {
            let event = reader.read_event().map_err(|err| {
                HarvestError::partial(kind, format!("malformed relationships of {part}: {err}"))
            })?;
            match event {
                Event::Start(e) | Event::Empty(e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let (Some(id), Some(target)) = (xml::attr(&e, b"Id"), xml::attr(&e, b"Target"))
                    else {
                        continue;
                    };
                    let external = xml::attr(&e, b"TargetMode")
                        .is_some_and(|mode| mode.eq_ignore_ascii_case("External"));
                    relationships.push(Relationship {
                        id,
                        rel_type: xml::attr(&e, b"Type").unwrap_or_default(),
                        target: if external {
                            target
                        } else {
                            resolve_target(part, &target)
                        },
                        external,
                    });
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(relationships)
    }

    /// Document properties from `docProps/core.xml` and `docProps/app.xml`.
    /// Missing parts and empty values are simply absent from the map.
    pub fn properties(&self) -> Result<BTreeMap<String, String>> {
        let mut properties = BTreeMap::new();
        if let Some(core) = self.part(CORE_PROPERTIES_PART) {
            read_properties(core, &mut properties, |name| match name {
                b"title" => Some("title"),
                b"creator" => Some("author"),
                b"subject" => Some("subject"),
                b"keywords" => Some("keywords"),
                b"created" => Some("created"),
                b"modified" => Some("modified"),
                b"lastModifiedBy" => Some("last_modified_by"),
                _ => None,
            })?;
        }
        if let Some(app) = self.part(APP_PROPERTIES_PART) {
            read_properties(app, &mut properties, |name| match name {
                b"Application" => Some("producer"),
                _ => None,
            })?;
        }
        Ok(properties)
    }
}

/// Collect the text of top-level property elements whose local name `key_for` maps.
fn read_properties(
    raw: &[u8],
    into: &mut BTreeMap<String, String>,
    key_for: impl Fn(&[u8]) -> Option<&'static str>,
) -> Result<()> {
    let mut reader = xml::reader(raw);
    let mut current: Option<(&'static str, String)> = None;
    loop {
        let event = reader.read_event().map_err(|err| {
            HarvestError::partial(ArtifactKind::Metadata, format!("malformed properties: {err}"))
        })?;
        match event {
            Event::Start(e) => {
                current = key_for(e.local_name().as_ref()).map(|key| (key, String::new()));
            }
            Event::Text(t) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&xml::text(&t));
                }
            }
            Event::End(_) => {
                if let Some((key, value)) = current.take() {
                    let value = value.trim();
                    if !value.is_empty() {
                        into.insert(key.to_string(), value.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relative relationship target against the directory of `source`.
pub(crate) fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::zip_package;

    #[test]
    fn resolves_relative_targets() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(
            resolve_target("word/document.xml", "media/image1.png"),
            "word/media/image1.png"
        );
        assert_eq!(resolve_target("word/document.xml", "/docProps/core.xml"), "docProps/core.xml");
        assert_eq!(rels_part_name("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
    }

    #[test]
    fn rejects_ole2_container() {
        let mut data = OLE2_MAGIC.to_vec();
        data.extend_from_slice(&[0; 504]);
        let err = OfficePackage::from_bytes("old.ppt", &data, "ppt/presentation.xml")
            .err()
            .unwrap();
        assert_eq!(err.kind(), docharvest_core::ErrorKind::CorruptDocument);
        assert!(err.to_string().contains("OLE2"));
    }

    #[test]
    fn missing_main_part_is_corrupt() {
        let data = zip_package(&[("docProps/core.xml", b"<x/>".as_slice())]);
        let err = OfficePackage::from_bytes("a.docx", &data, "word/document.xml")
            .err()
            .unwrap();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn reads_external_and_internal_relationships() {
        let rels = br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/" TargetMode="External"/>
</Relationships>"#;
        let data = zip_package(&[
            ("word/document.xml", b"<w:document/>".as_slice()),
            ("word/_rels/document.xml.rels", rels.as_slice()),
        ]);
        let package = OfficePackage::from_bytes("a.docx", &data, "word/document.xml").unwrap();
        let relationships = package
            .relationships("word/document.xml", ArtifactKind::Link)
            .unwrap();

        assert_eq!(relationships.len(), 2);
        assert!(relationships[0].is_type("image"));
        assert_eq!(relationships[0].target, "word/media/image1.png");
        assert!(relationships[1].external);
        assert_eq!(relationships[1].target, "https://example.com/");
    }

    #[test]
    fn properties_skip_empty_values() {
        let core = br#"<cp:coreProperties xmlns:cp="c" xmlns:dc="d" xmlns:dcterms="t">
  <dc:title>Quarterly</dc:title>
  <dc:creator>Ada</dc:creator>
  <dc:subject></dc:subject>
  <dcterms:created>2024-01-02T03:04:05Z</dcterms:created>
</cp:coreProperties>"#;
        let data = zip_package(&[
            ("word/document.xml", b"<w:document/>".as_slice()),
            ("docProps/core.xml", core.as_slice()),
        ]);
        let package = OfficePackage::from_bytes("a.docx", &data, "word/document.xml").unwrap();
        let properties = package.properties().unwrap();

        assert_eq!(properties.get("title").map(String::as_str), Some("Quarterly"));
        assert_eq!(properties.get("author").map(String::as_str), Some("Ada"));
        assert_eq!(
            properties.get("created").map(String::as_str),
            Some("2024-01-02T03:04:05Z")
        );
        assert!(!properties.contains_key("subject"));
    }
}
