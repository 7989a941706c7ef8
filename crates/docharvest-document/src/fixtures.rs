// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory document builders for tests and benchmarks.
//
// Produces small but structurally real DOCX/PPTX packages (zip + XML parts)
// and PDFs (lopdf object graphs), so no binary fixtures are checked in.
// Builders panic on failure; they only ever write to memory.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use quick_xml::escape::escape;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::image::{ImageProcessor, PixelLayout};

const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

const NS_DECLS: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing""#,
);

/// Zip the given parts, in order, into a package.
pub fn zip_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in parts {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(bytes).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A 2x2 grayscale PNG.
pub fn tiny_png() -> Vec<u8> {
    ImageProcessor::from_raw_pixels(2, 2, PixelLayout::Gray, 8, &[0, 64, 128, 255])
        .and_then(|img| img.to_png_bytes())
        .expect("encode png")
}

/// An 8x8 RGB JPEG.
pub fn tiny_jpeg() -> Vec<u8> {
    let pixels: Vec<u8> = (0..8 * 8 * 3).map(|i| (i * 5 % 256) as u8).collect();
    ImageProcessor::from_raw_pixels(8, 8, PixelLayout::Rgb, 8, &pixels)
        .and_then(|img| img.to_jpeg_bytes())
        .expect("encode jpeg")
}

fn xml_text(text: &str) -> String {
    escape(text).into_owned()
}

/// Relationship entries of one part: `(id, type, target, external)`.
#[derive(Default)]
struct Rels(Vec<(String, &'static str, String, bool)>);

impl Rels {
    fn add(&mut self, rel_type: &'static str, target: &str, external: bool) -> String {
        let id = format!("rId{}", self.0.len() + 1);
        self.0.push((id.clone(), rel_type, target.to_string(), external));
        id
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, rel_type, target, external) in &self.0 {
            let mode = if *external { r#" TargetMode="External""# } else { "" };
            xml.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{rel_type}" Target="{}"{mode}/>"#,
                xml_text(target)
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

fn core_properties(title: Option<&str>, author: Option<&str>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    );
    if let Some(title) = title {
        xml.push_str(&format!("<dc:title>{}</dc:title>", xml_text(title)));
    }
    if let Some(author) = author {
        xml.push_str(&format!("<dc:creator>{}</dc:creator>", xml_text(author)));
    }
    xml.push_str(r#"<dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created>"#);
    xml.push_str("</cp:coreProperties>");
    xml
}

fn root_rels(main_part: &str) -> String {
    let mut rels = Rels::default();
    rels.add(REL_OFFICE_DOCUMENT, main_part, false);
    rels.add(REL_CORE_PROPERTIES, "docProps/core.xml", false);
    rels.to_xml()
}

fn content_types(main_type: &str, main_part: &str, extra: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/{main_part}" ContentType="{main_type}"/>{extra}</Types>"#
    )
}

fn text_run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, xml_text(text))
}

// -- DOCX ---------------------------------------------------------------------

/// Builds a WordprocessingML package body element by element.
#[derive(Default)]
pub struct DocxBuilder {
    title: Option<String>,
    author: Option<String>,
    body: String,
    rels: Rels,
    media: Vec<(String, Vec<u8>)>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&format!("<w:p>{}</w:p>", text_run(text)));
        self
    }

    /// A paragraph whose whole text is an external hyperlink.
    pub fn hyperlink(mut self, text: &str, url: &str) -> Self {
        let id = self.rels.add(REL_HYPERLINK, url, true);
        self.body.push_str(&format!(
            r#"<w:p><w:hyperlink r:id="{id}">{}</w:hyperlink></w:p>"#,
            text_run(text)
        ));
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl><w:tblPr/><w:tblGrid/>");
        self.body.push_str(&word_rows(rows));
        self.body.push_str("</w:tbl>");
        self
    }

    /// A row directly in the body, outside any table.
    pub fn stray_row(mut self, cells: &[&str]) -> Self {
        self.body.push_str(&word_rows(&[cells]));
        self
    }

    /// Body markup inserted verbatim.
    pub fn raw_body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    /// An inline picture stored as `word/media/<name>`.
    pub fn image(mut self, name: &str, bytes: &[u8]) -> Self {
        let id = self.rels.add(REL_IMAGE, &format!("media/{name}"), false);
        self.media.push((format!("word/media/{name}"), bytes.to_vec()));
        self.body.push_str(&format!(
            r#"<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{id}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        ));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let main_part = "word/document.xml";
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {NS_DECLS}><w:body>{}<w:sectPr/></w:body></w:document>"#,
            self.body
        );
        let types = content_types(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            main_part,
            "",
        );
        let root = root_rels(main_part);
        let core = core_properties(self.title.as_deref(), self.author.as_deref());
        let document_rels = self.rels.to_xml();

        let mut parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", types.as_bytes()),
            ("_rels/.rels", root.as_bytes()),
            (main_part, document.as_bytes()),
            ("word/_rels/document.xml.rels", document_rels.as_bytes()),
            ("docProps/core.xml", core.as_bytes()),
        ];
        for (name, bytes) in &self.media {
            parts.push((name.as_str(), bytes.as_slice()));
        }
        zip_package(&parts)
    }
}

fn word_rows(rows: &[&[&str]]) -> String {
    rows.iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|cell| format!("<w:tc><w:tcPr/><w:p>{}</w:p></w:tc>", text_run(cell)))
                .collect();
            format!("<w:tr>{cells}</w:tr>")
        })
        .collect()
}

// -- PPTX ---------------------------------------------------------------------

/// Shapes and relationships of one slide.
#[derive(Default)]
pub struct SlideBuilder {
    shapes: String,
    rels: Rels,
    media: Vec<(String, Vec<u8>)>,
}

impl SlideBuilder {
    fn paragraph_shape(&mut self, paragraph: &str) {
        self.shapes.push_str(&format!(
            "<p:sp><p:nvSpPr/><p:spPr/><p:txBody><a:bodyPr/>{paragraph}</p:txBody></p:sp>"
        ));
    }

    pub fn text(mut self, text: &str) -> Self {
        self.paragraph_shape(&format!(
            "<a:p><a:r><a:t>{}</a:t></a:r></a:p>",
            xml_text(text)
        ));
        self
    }

    /// A text run carrying a click hyperlink.
    pub fn link(mut self, text: &str, url: &str) -> Self {
        let id = self.rels.add(REL_HYPERLINK, url, true);
        self.paragraph_shape(&format!(
            r#"<a:p><a:r><a:rPr><a:hlinkClick r:id="{id}"/></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
            xml_text(text)
        ));
        self
    }

    /// A picture stored as `ppt/media/<name>`; reusing a name shares the part.
    pub fn image(mut self, name: &str, bytes: &[u8]) -> Self {
        let id = self.rels.add(REL_IMAGE, &format!("../media/{name}"), false);
        self.media.push((format!("ppt/media/{name}"), bytes.to_vec()));
        self.shapes.push_str(&format!(
            r#"<p:pic><p:nvPicPr/><p:blipFill><a:blip r:embed="{id}"/></p:blipFill><p:spPr/></p:pic>"#
        ));
        self
    }

    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        let body: String = rows
            .iter()
            .map(|row| {
                let cells: String = row
                    .iter()
                    .map(|cell| {
                        format!(
                            "<a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>",
                            xml_text(cell)
                        )
                    })
                    .collect();
                format!(r#"<a:tr h="370840">{cells}</a:tr>"#)
            })
            .collect();
        self.shapes.push_str(&format!(
            "<p:graphicFrame><p:nvGraphicFramePr/><a:graphic><a:graphicData><a:tbl><a:tblGrid/>{body}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"
        ));
        self
    }
}

/// Builds a PresentationML package slide by slide.
#[derive(Default)]
pub struct PptxBuilder {
    title: Option<String>,
    slides: Vec<SlideBuilder>,
}

impl PptxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn slide(mut self, build: impl FnOnce(SlideBuilder) -> SlideBuilder) -> Self {
        self.slides.push(build(SlideBuilder::default()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let main_part = "ppt/presentation.xml";
        let mut presentation_rels = Rels::default();
        let mut slide_ids = String::new();
        let mut owned: Vec<(String, Vec<u8>)> = Vec::new();
        let mut media: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut overrides = String::new();

        for (index, slide) in self.slides.into_iter().enumerate() {
            let number = index + 1;
            let id = presentation_rels.add(REL_SLIDE, &format!("slides/slide{number}.xml"), false);
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{id}"/>"#, 255 + number));
            overrides.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            ));

            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {NS_DECLS}><p:cSld><p:spTree><p:nvGrpSpPr/><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
                slide.shapes
            );
            owned.push((format!("ppt/slides/slide{number}.xml"), xml.into_bytes()));
            owned.push((
                format!("ppt/slides/_rels/slide{number}.xml.rels"),
                slide.rels.to_xml().into_bytes(),
            ));
            media.extend(slide.media);
        }

        let presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS_DECLS}><p:sldIdLst>{slide_ids}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#
        );
        let types = content_types(
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
            main_part,
            &overrides,
        );
        let root = root_rels(main_part);
        let core = core_properties(self.title.as_deref(), None);
        let presentation_rels = presentation_rels.to_xml();

        let mut parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", types.as_bytes()),
            ("_rels/.rels", root.as_bytes()),
            (main_part, presentation.as_bytes()),
            ("ppt/_rels/presentation.xml.rels", presentation_rels.as_bytes()),
            ("docProps/core.xml", core.as_bytes()),
        ];
        for (name, bytes) in &owned {
            parts.push((name.as_str(), bytes.as_slice()));
        }
        for (name, bytes) in &media {
            parts.push((name.as_str(), bytes.as_slice()));
        }
        zip_package(&parts)
    }
}

// -- PDF ----------------------------------------------------------------------

struct PendingPage {
    operations: Vec<Operation>,
    xobjects: Option<Dictionary>,
    annotations: Vec<ObjectId>,
}

/// Builds a PDF page by page with a WinAnsi Helvetica font.
pub struct PdfBuilder {
    document: Document,
    pages: Vec<PendingPage>,
    title: Option<String>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            document: Document::with_version("1.5"),
            pages: Vec::new(),
            title: None,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// A page with one line of text per entry.
    pub fn text_page(mut self, lines: &[&str]) -> Self {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 760.into()]),
        ];
        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                operations.push(Operation::new("Td", vec![0.into(), (-16).into()]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        operations.push(Operation::new("ET", vec![]));
        self.pages.push(PendingPage {
            operations,
            xobjects: None,
            annotations: Vec::new(),
        });
        self
    }

    /// A page whose only content is a `width`x`height` grayscale raster.
    pub fn image_page(mut self, width: u32, height: u32) -> Self {
        let pixels: Vec<u8> = (0..width * height).map(|i| (i % 251) as u8).collect();
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            pixels,
        );
        let image_id = self.document.add_object(image);
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    i64::from(width).into(),
                    0.into(),
                    0.into(),
                    i64::from(height).into(),
                    72.into(),
                    600.into(),
                ],
            ),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ];
        self.pages.push(PendingPage {
            operations,
            xobjects: Some(dictionary! { "Im1" => image_id }),
            annotations: Vec::new(),
        });
        self
    }

    /// A heading followed by a grid of cells at fixed column offsets.
    pub fn grid_page(mut self, heading: &str, rows: &[&[&str]]) -> Self {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), 760.into()],
            ),
            Operation::new("Tj", vec![Object::string_literal(heading)]),
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let x = 72 + 128 * c as i64;
                let y = 700 - 20 * r as i64;
                operations.push(Operation::new(
                    "Tm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*cell)]));
            }
        }
        operations.push(Operation::new("ET", vec![]));
        self.pages.push(PendingPage {
            operations,
            xobjects: None,
            annotations: Vec::new(),
        });
        self
    }

    /// Attach a URI link annotation to the most recent page.
    pub fn link(mut self, uri: &str) -> Self {
        let annotation = self.document.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![72.into(), 72.into(), 200.into(), 90.into()],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(uri),
            },
        });
        if let Some(page) = self.pages.last_mut() {
            page.annotations.push(annotation);
        }
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let pages_id = self.document.new_object_id();
        let font_id = self.document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in std::mem::take(&mut self.pages) {
            let content = Content {
                operations: page.operations,
            };
            let content_id = self
                .document
                .add_object(Stream::new(dictionary! {}, content.encode().expect("encode content")));
            let mut resources = dictionary! { "Font" => dictionary! { "F1" => font_id } };
            if let Some(xobjects) = page.xobjects {
                resources.set("XObject", xobjects);
            }
            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Contents" => content_id,
                "Resources" => resources,
            };
            if !page.annotations.is_empty() {
                let annots: Vec<Object> =
                    page.annotations.into_iter().map(Object::Reference).collect();
                page_dict.set("Annots", annots);
            }
            kids.push(self.document.add_object(page_dict).into());
        }

        let count = kids.len() as i64;
        self.document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal("docharvest fixtures"),
            "CreationDate" => Object::string_literal("D:20240102030405Z"),
        };
        if let Some(title) = &self.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }
        let info_id = self.document.add_object(info);
        self.document.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes).expect("save pdf");
        bytes
    }
}
