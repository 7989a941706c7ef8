// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PPTX (PresentationML) documents.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::{ArtifactKind, Table};
use quick_xml::events::Event;
use tracing::{debug, instrument};

use super::package::OfficePackage;
use super::table::{TableDialect, read_tables};
use super::xml;
use crate::extract::DocumentSource;
use crate::image::EmbeddedImage;
use crate::scan::TextRecognizer;

/// The presentation part every PPTX package must carry.
pub const MAIN_PART: &str = "ppt/presentation.xml";

/// An opened presentation with its slides resolved in presentation order.
pub struct PptxDocument {
    package: OfficePackage,
    /// Slide part names, in the order of `p:sldIdLst`.
    slides: Vec<String>,
}

impl PptxDocument {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = super::read_container(path)?;
        Self::from_bytes(&path.display().to_string(), &data)
    }

    /// Parse a PPTX package already in memory. `label` names it in errors.
    pub fn from_bytes(label: &str, data: &[u8]) -> Result<Self> {
        let package = OfficePackage::from_bytes(label, data, MAIN_PART)?;
        let slides = slide_order(&package)
            .map_err(|err| HarvestError::corrupt(label, format!("unreadable slide list: {err}")))?;
        debug!(slides = slides.len(), "Presentation loaded");
        Ok(Self { package, slides })
    }

    fn slide(&self, part: &str, kind: ArtifactKind) -> Result<&[u8]> {
        self.package.require_part(part, kind)
    }
}

/// Resolve `p:sldId r:id` entries through the presentation relationships.
fn slide_order(package: &OfficePackage) -> Result<Vec<String>> {
    let raw = package.require_part(MAIN_PART, ArtifactKind::Text)?;
    let targets: HashMap<String, String> = package
        .relationships(MAIN_PART, ArtifactKind::Text)?
        .into_iter()
        .filter(|rel| !rel.external && rel.is_type("slide"))
        .map(|rel| (rel.id, rel.target))
        .collect();

    let mut reader = xml::reader(raw);
    let mut slides = Vec::new();
    loop {
        let event = reader.read_event().map_err(|err| {
            HarvestError::partial(ArtifactKind::Text, format!("malformed presentation: {err}"))
        })?;
        match event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(target) = xml::relationship_id(&e).and_then(|id| targets.get(&id)) {
                    slides.push(target.clone());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(slides)
}

impl DocumentSource for PptxDocument {
    /// One unit per slide: its shape paragraphs joined by `\n`. A slide
    /// without text still yields an empty unit so units line up with slides.
    fn extract_text(&self, _recognizer: Option<&dyn TextRecognizer>) -> Result<Vec<String>> {
        self.slides
            .iter()
            .map(|part| {
                let paragraphs = super::paragraph_texts(self.slide(part, ArtifactKind::Text)?)?;
                Ok(paragraphs.join("\n"))
            })
            .collect()
    }

    fn extract_links(&self) -> Result<Vec<String>> {
        let mut links = Vec::new();
        for part in &self.slides {
            links.extend(super::hyperlinks_of(
                &self.package,
                part,
                &[b"hlinkClick".as_slice(), b"hlinkHover".as_slice()],
            )?);
        }
        Ok(links)
    }

    fn extract_images(&self) -> Result<Vec<EmbeddedImage>> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();
        for part in &self.slides {
            images.extend(super::images_of(&self.package, part, &mut seen)?);
        }
        Ok(images)
    }

    fn extract_tables(&self) -> Result<Vec<Table>> {
        let mut tables = Vec::new();
        for part in &self.slides {
            tables.extend(read_tables(
                self.slide(part, ArtifactKind::Table)?,
                TableDialect::Drawing,
            )?);
        }
        Ok(tables)
    }

    fn extract_metadata(&self) -> Result<BTreeMap<String, String>> {
        self.package.properties()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{PptxBuilder, tiny_png};

    fn deck() -> PptxDocument {
        let logo = tiny_png();
        let data = PptxBuilder::new()
            .title("Roadmap")
            .slide(|s| {
                s.text("Welcome")
                    .text("Second line")
                    .link("docs", "https://docs.example.com/")
                    .image("logo.png", &logo)
            })
            .slide(|s| s.text("Numbers").table(&[&["q1", "q2"], &["10", "20"]]))
            .slide(|s| s.image("logo.png", &logo))
            .build();
        PptxDocument::from_bytes("deck.pptx", &data).unwrap()
    }

    #[test]
    fn one_text_unit_per_slide_in_order() {
        let text = deck().extract_text(None).unwrap();
        assert_eq!(text.len(), 3);
        assert_eq!(text[0], "Welcome\nSecond line\ndocs");
        assert_eq!(text[1], "Numbers");
        assert_eq!(text[2], "");
    }

    #[test]
    fn slide_links_resolve_through_relationships() {
        let links = deck().extract_links().unwrap();
        assert!(links.contains(&"https://docs.example.com/".to_string()));
    }

    #[test]
    fn shared_image_is_emitted_once() {
        let images = deck().extract_images().unwrap();
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn slide_tables_are_read() {
        let tables = deck().extract_tables().unwrap();
        assert_eq!(tables, vec![vec![vec!["q1", "q2"], vec!["10", "20"]]]);
    }

    #[test]
    fn metadata_title() {
        let metadata = deck().extract_metadata().unwrap();
        assert_eq!(metadata.get("title").map(String::as_str), Some("Roadmap"));
    }
}
