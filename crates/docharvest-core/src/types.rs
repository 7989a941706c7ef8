// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docharvest extraction pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HarvestError, Result};

/// Unique identifier for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported input container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// PowerPoint presentations (`.pptx`, and `.ppt` files holding an OOXML package).
    Ppt,
}

impl DocumentFormat {
    /// Infer the format from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "ppt" | "pptx" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Infer the format from a path, rejecting anything unrecognised.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| {
            HarvestError::UnsupportedFormat(if ext.is_empty() {
                format!("{} has no file extension", path.display())
            } else {
                format!(".{ext} ({})", path.display())
            })
        })
    }

    /// Extensions that map to this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Docx => &["docx"],
            Self::Ppt => &["ppt", "pptx"],
        }
    }

    /// Short lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Ppt => "ppt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of extracted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Text,
    Link,
    Image,
    Table,
    Metadata,
}

impl ArtifactKind {
    /// Every kind, in storage order.
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Text,
        ArtifactKind::Link,
        ArtifactKind::Image,
        ArtifactKind::Table,
        ArtifactKind::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Image => "image",
            Self::Table => "table",
            Self::Metadata => "metadata",
        }
    }

    /// Name of the output subdirectory holding this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "links",
            Self::Image => "images",
            Self::Table => "tables",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "link" | "links" => Ok(Self::Link),
            "image" | "images" => Ok(Self::Image),
            "table" | "tables" => Ok(Self::Table),
            "metadata" => Ok(Self::Metadata),
            other => Err(HarvestError::Config(format!("unknown artifact kind: {other}"))),
        }
    }
}

/// Stable identifier used to namespace the stored artifacts of one input file.
///
/// Derived from the base filename with the extension kept, so `report.pdf` and
/// `report.docx` never share a key. Characters outside `[A-Za-z0-9_-]` become `_`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceKey(String);

impl SourceKey {
    /// Build a key from arbitrary text, sanitising it for use in file names.
    pub fn new(raw: &str) -> Self {
        let sanitised: String = raw
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if sanitised.is_empty() {
            Self("unnamed".to_string())
        } else {
            Self(sanitised)
        }
    }

    /// Derive the key from a file's base name.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(&name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An input file together with its inferred format and storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub key: SourceKey,
}

impl SourceFile {
    /// Describe `path`, failing with `UnsupportedFormat` for unknown extensions.
    ///
    /// Does not touch the filesystem; existence is checked by the loader.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = DocumentFormat::from_path(&path)?;
        let key = SourceKey::from_path(&path);
        Ok(Self { path, format, key })
    }
}

/// Encoding of an extracted image blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Webp,
    Jpeg2000,
    Emf,
    Wmf,
    /// Bytes kept verbatim in an encoding we do not recognise.
    Unknown,
}

impl ImageEncoding {
    /// File extension used when writing the blob to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
            Self::Jpeg2000 => "jp2",
            Self::Emf => "emf",
            Self::Wmf => "wmf",
            Self::Unknown => "bin",
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" | "jpe" => Self::Jpeg,
            "gif" => Self::Gif,
            "bmp" | "dib" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "jp2" | "jpx" | "j2k" => Self::Jpeg2000,
            "emf" => Self::Emf,
            "wmf" => Self::Wmf,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One embedded image, in the order it was extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// 1-based position in extraction order.
    pub index: u32,
    pub encoding: ImageEncoding,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// A table as rows of cell strings, in source order.
pub type Table = Vec<Vec<String>>;

/// Everything extracted from one input file.
///
/// Every field is always present; a format without a feature yields the
/// empty value for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// One entry per page (PDF), body paragraph (DOCX), or slide (PPT).
    pub text: Vec<String>,
    pub links: Vec<String>,
    pub images: Vec<ExtractedImage>,
    pub tables: Vec<Table>,
    /// Absent properties are omitted, never stored as empty strings.
    pub metadata: BTreeMap<String, String>,
}

impl ExtractionResult {
    /// Number of items of the given kind.
    pub fn count(&self, kind: ArtifactKind) -> usize {
        match kind {
            ArtifactKind::Text => self.text.len(),
            ArtifactKind::Link => self.links.len(),
            ArtifactKind::Image => self.images.len(),
            ArtifactKind::Table => self.tables.len(),
            ArtifactKind::Metadata => self.metadata.len(),
        }
    }

    /// The text units joined with newlines, as written to `text/<key>_text.txt`.
    pub fn joined_text(&self) -> String {
        self.text.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_inference_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("ppt"), Some(DocumentFormat::Ppt));
        assert_eq!(DocumentFormat::from_extension("PPTX"), Some(DocumentFormat::Ppt));
        assert_eq!(DocumentFormat::from_extension("doc"), None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = SourceFile::new("notes.txt").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedFormat);

        let err = SourceFile::new("Makefile").unwrap_err();
        assert!(err.to_string().contains("no file extension"));
    }

    #[test]
    fn source_key_keeps_extension_and_sanitises() {
        let file = SourceFile::new("/tmp/in/Quarterly Report.pdf").unwrap();
        assert_eq!(file.format, DocumentFormat::Pdf);
        assert_eq!(file.key.as_str(), "Quarterly_Report_pdf");

        assert_ne!(
            SourceKey::from_path(Path::new("a.pdf")),
            SourceKey::from_path(Path::new("a.docx"))
        );
        assert_eq!(SourceKey::new("").as_str(), "unnamed");
    }

    #[test]
    fn artifact_kind_parses_plural_names() {
        assert_eq!("links".parse::<ArtifactKind>().unwrap(), ArtifactKind::Link);
        assert_eq!("Table".parse::<ArtifactKind>().unwrap(), ArtifactKind::Table);
        assert!("audio".parse::<ArtifactKind>().is_err());
        assert_eq!(ArtifactKind::Image.dir_name(), "images");
    }

    #[test]
    fn empty_result_has_every_field() {
        let result = ExtractionResult::default();
        for kind in ArtifactKind::ALL {
            assert_eq!(result.count(kind), 0);
        }
        assert_eq!(result.joined_text(), "");
    }

    #[test]
    fn image_encoding_extensions() {
        assert_eq!(ImageEncoding::from_extension("JPG"), ImageEncoding::Jpeg);
        assert_eq!(ImageEncoding::Jpeg.extension(), "jpeg");
        assert_eq!(ImageEncoding::from_extension("xyz"), ImageEncoding::Unknown);
    }
}
