// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loaders — open a file of one format and hand back a document handle.

use std::path::Path;

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::DocumentFormat;
use tracing::instrument;

use crate::extract::DocumentSource;
use crate::office::{DocxDocument, PptxDocument};
use crate::pdf::PdfDocument;

/// A parsed document, tagged with its format.
pub enum DocumentHandle {
    Pdf(PdfDocument),
    Docx(DocxDocument),
    Ppt(PptxDocument),
}

impl DocumentHandle {
    pub fn format(&self) -> DocumentFormat {
        match self {
            Self::Pdf(_) => DocumentFormat::Pdf,
            Self::Docx(_) => DocumentFormat::Docx,
            Self::Ppt(_) => DocumentFormat::Ppt,
        }
    }

    /// The format's extraction routines.
    pub fn source(&self) -> &dyn DocumentSource {
        match self {
            Self::Pdf(doc) => doc,
            Self::Docx(doc) => doc,
            Self::Ppt(doc) => doc,
        }
    }
}

/// Opens files of a single format. Loading is read-only.
pub trait Loader {
    fn format(&self) -> DocumentFormat;

    /// Fails with `UnsupportedFormat` when the extension does not belong to
    /// this loader, `FileNotFound` when the path does not resolve, and
    /// `CorruptDocument` when the container cannot be parsed.
    fn load(&self, path: &Path) -> Result<DocumentHandle>;
}

/// Check the extension and existence of `path` before parsing.
fn check_path(path: &Path, format: DocumentFormat) -> Result<()> {
    if DocumentFormat::from_path(path)? != format {
        return Err(HarvestError::UnsupportedFormat(format!(
            "{} is not a {format} file",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(HarvestError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

pub struct PdfLoader;

impl Loader for PdfLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn load(&self, path: &Path) -> Result<DocumentHandle> {
        check_path(path, self.format())?;
        PdfDocument::open(path).map(DocumentHandle::Pdf)
    }
}

pub struct DocxLoader;

impl Loader for DocxLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn load(&self, path: &Path) -> Result<DocumentHandle> {
        check_path(path, self.format())?;
        DocxDocument::open(path).map(DocumentHandle::Docx)
    }
}

/// Loads `.pptx` packages and `.ppt` files that hold one. Legacy binary
/// presentations are reported as corrupt.
pub struct PptLoader;

impl Loader for PptLoader {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Ppt
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    fn load(&self, path: &Path) -> Result<DocumentHandle> {
        check_path(path, self.format())?;
        PptxDocument::open(path).map(DocumentHandle::Ppt)
    }
}

/// The loader for a format.
pub fn loader_for(format: DocumentFormat) -> &'static dyn Loader {
    match format {
        DocumentFormat::Pdf => &PdfLoader,
        DocumentFormat::Docx => &DocxLoader,
        DocumentFormat::Ppt => &PptLoader,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DocxBuilder, PdfBuilder, PptxBuilder};
    use docharvest_core::ErrorKind;

    #[test]
    fn loads_each_format_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("a.pdf", PdfBuilder::new().text_page(&["x"]).build()),
            ("b.docx", DocxBuilder::new().paragraph("x").build()),
            ("c.pptx", PptxBuilder::new().slide(|s| s.text("x")).build()),
            ("d.ppt", PptxBuilder::new().slide(|s| s.text("x")).build()),
        ];
        for (name, bytes) in files {
            let path = dir.path().join(name);
            std::fs::write(&path, bytes).unwrap();
            let format = DocumentFormat::from_path(&path).unwrap();
            let handle = loader_for(format).load(&path).unwrap();
            assert_eq!(handle.format(), format);
        }
    }

    #[test]
    fn extension_mismatch_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, DocxBuilder::new().build()).unwrap();
        let err = PdfLoader.load(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = DocxLoader.load(Path::new("/nonexistent/report.docx")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn damaged_containers_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["bad.pdf", "bad.docx", "bad.pptx"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"definitely not a document").unwrap();
            let format = DocumentFormat::from_path(&path).unwrap();
            let err = loader_for(format).load(&path).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::CorruptDocument, "{name}");
        }
    }

    #[test]
    fn legacy_binary_ppt_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.ppt");
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.resize(1024, 0);
        std::fs::write(&path, bytes).unwrap();
        let err = PptLoader.load(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::CorruptDocument);
    }
}
