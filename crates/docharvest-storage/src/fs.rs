// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filesystem storage — one subdirectory per artifact kind under a base dir.
//
// Layout:
//   <base>/text/<key>_text.txt          newline-joined text units
//   <base>/links/<key>_links.txt        one URL per line
//   <base>/images/<key>_image_<i>.<ext> one file per image, 1-based
//   <base>/tables/table_<key>_<i>.csv   one CSV per table, 1-based
//   <base>/metadata/<key>_metadata.txt  `key: value` per line
//
// Saving a key again overwrites its files; numbered files left over from a
// larger earlier save are removed first.

use std::path::{Path, PathBuf};

use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::{
    ArtifactKind, ExtractedImage, ExtractionResult, ImageEncoding, SourceKey, Table,
};
use tracing::{debug, info, instrument};

use crate::Storage;
use crate::artifact::{ArtifactBody, ArtifactFilter, ArtifactLocation, StoredArtifact};

fn write_err(path: &Path, err: impl std::fmt::Display) -> HarvestError {
    HarvestError::StorageWrite(format!("{}: {err}", path.display()))
}

/// Directory-tree backend.
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    /// Use `base_dir`, creating it and its kind subdirectories if absent.
    #[instrument(skip_all, fields(base_dir = %base_dir.as_ref().display()))]
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        for kind in ArtifactKind::ALL {
            let dir = base_dir.join(kind.dir_name());
            std::fs::create_dir_all(&dir).map_err(|err| write_err(&dir, err))?;
        }
        debug!("filesystem storage ready");
        Ok(Self { base_dir })
    }

    /// Use `base_dir` for reading only. Nothing is created; missing kind
    /// directories read as empty.
    pub fn existing(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.base_dir.join(kind.dir_name())
    }

    pub fn text_path(&self, key: &SourceKey) -> PathBuf {
        self.kind_dir(ArtifactKind::Text).join(format!("{key}_text.txt"))
    }

    pub fn links_path(&self, key: &SourceKey) -> PathBuf {
        self.kind_dir(ArtifactKind::Link).join(format!("{key}_links.txt"))
    }

    pub fn image_path(&self, key: &SourceKey, image: &ExtractedImage) -> PathBuf {
        self.kind_dir(ArtifactKind::Image).join(format!(
            "{key}_image_{}.{}",
            image.index,
            image.encoding.extension()
        ))
    }

    pub fn table_path(&self, key: &SourceKey, index: usize) -> PathBuf {
        self.kind_dir(ArtifactKind::Table)
            .join(format!("table_{key}_{index}.csv"))
    }

    pub fn metadata_path(&self, key: &SourceKey) -> PathBuf {
        self.kind_dir(ArtifactKind::Metadata)
            .join(format!("{key}_metadata.txt"))
    }

    // -- Writing ----------------------------------------------------------------

    fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
        std::fs::write(path, contents).map_err(|err| write_err(path, err))
    }

    fn save_kind(
        &self,
        kind: ArtifactKind,
        result: &ExtractionResult,
        key: &SourceKey,
    ) -> Result<()> {
        match kind {
            ArtifactKind::Text => {
                Self::write_file(&self.text_path(key), result.joined_text().as_bytes())
            }
            ArtifactKind::Link => {
                let body: String = result.links.iter().map(|url| format!("{url}\n")).collect();
                Self::write_file(&self.links_path(key), body.as_bytes())
            }
            ArtifactKind::Image => {
                self.purge_numbered(kind, key)?;
                for image in &result.images {
                    Self::write_file(&self.image_path(key, image), &image.data)?;
                }
                Ok(())
            }
            ArtifactKind::Table => {
                self.purge_numbered(kind, key)?;
                for (table, index) in result.tables.iter().zip(1..) {
                    write_csv(&self.table_path(key, index), table)?;
                }
                Ok(())
            }
            ArtifactKind::Metadata => {
                let body: String = result
                    .metadata
                    .iter()
                    .map(|(name, value)| format!("{name}: {}\n", value.replace('\n', " ")))
                    .collect();
                Self::write_file(&self.metadata_path(key), body.as_bytes())
            }
        }
    }

    /// Remove every numbered image or table file belonging to `key`.
    fn purge_numbered(&self, kind: ArtifactKind, key: &SourceKey) -> Result<()> {
        let dir = self.kind_dir(kind);
        for (path, owner, _) in numbered_files(&dir, kind)? {
            if owner == *key {
                std::fs::remove_file(&path).map_err(|err| write_err(&path, err))?;
                debug!(path = %path.display(), "stale artifact removed");
            }
        }
        Ok(())
    }

    // -- Reading ----------------------------------------------------------------

    fn display_kind(
        &self,
        kind: ArtifactKind,
        filter: &ArtifactFilter,
    ) -> Result<Vec<StoredArtifact>> {
        let dir = self.kind_dir(kind);
        let mut found = Vec::new();

        match kind {
            ArtifactKind::Image | ArtifactKind::Table => {
                for (path, source, index) in numbered_files(&dir, kind)? {
                    if !filter.matches_source(&source) {
                        continue;
                    }
                    let body = if kind == ArtifactKind::Image {
                        let encoding = path
                            .extension()
                            .map(|ext| ImageEncoding::from_extension(&ext.to_string_lossy()))
                            .unwrap_or(ImageEncoding::Unknown);
                        ArtifactBody::image(encoding, std::fs::read(&path)?)
                    } else {
                        ArtifactBody::Table(read_csv(&path)?)
                    };
                    found.push(StoredArtifact {
                        source,
                        index: Some(index),
                        location: ArtifactLocation::File(path),
                        body,
                    });
                }
                found.sort_by(|a, b| (&a.source, a.index).cmp(&(&b.source, b.index)));
            }
            ArtifactKind::Text | ArtifactKind::Link | ArtifactKind::Metadata => {
                let suffix = match kind {
                    ArtifactKind::Text => "_text.txt",
                    ArtifactKind::Link => "_links.txt",
                    _ => "_metadata.txt",
                };
                for (path, name) in sorted_entries(&dir)? {
                    let Some(raw_key) = name.strip_suffix(suffix) else {
                        continue;
                    };
                    let source = SourceKey::new(raw_key);
                    if !filter.matches_source(&source) {
                        continue;
                    }
                    let contents = std::fs::read_to_string(&path)?;
                    let location = ArtifactLocation::File(path);
                    let bodies: Vec<ArtifactBody> = match kind {
                        ArtifactKind::Text => vec![ArtifactBody::Text(contents)],
                        ArtifactKind::Link => contents
                            .lines()
                            .filter(|line| !line.is_empty())
                            .map(|line| ArtifactBody::Link(line.to_string()))
                            .collect(),
                        _ => contents
                            .lines()
                            .filter_map(|line| line.split_once(": "))
                            .map(|(key, value)| ArtifactBody::Metadata {
                                key: key.to_string(),
                                value: value.to_string(),
                            })
                            .collect(),
                    };
                    found.extend(bodies.into_iter().map(|body| StoredArtifact {
                        source: source.clone(),
                        index: None,
                        location: location.clone(),
                        body,
                    }));
                }
            }
        }
        Ok(found)
    }
}

impl Storage for FsStorage {
    fn backend(&self) -> &'static str {
        "filesystem"
    }

    /// Each kind is written on its own; a failure leaves kinds already
    /// written for this key in place.
    #[instrument(skip_all, fields(source = %key))]
    fn save(&mut self, result: &ExtractionResult, key: &SourceKey) -> Result<()> {
        for kind in ArtifactKind::ALL {
            self.save_kind(kind, result, key)?;
            debug!(%kind, count = result.count(kind), "artifacts written");
        }
        info!(base_dir = %self.base_dir.display(), "Artifacts saved");
        Ok(())
    }

    fn display(&self, filter: &ArtifactFilter) -> Result<Vec<StoredArtifact>> {
        let mut found = Vec::new();
        for kind in filter.kinds() {
            found.extend(self.display_kind(kind, filter)?);
        }
        Ok(found)
    }
}

/// Directory entries as `(path, file name)`, sorted by name. A missing
/// directory reads as empty.
fn sorted_entries(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push((entry.path(), entry.file_name().to_string_lossy().into_owned()));
        }
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// Numbered image or table files in `dir` as `(path, source, index)`.
fn numbered_files(dir: &Path, kind: ArtifactKind) -> Result<Vec<(PathBuf, SourceKey, u32)>> {
    let mut files = Vec::new();
    for (path, name) in sorted_entries(dir)? {
        let parsed = match kind {
            ArtifactKind::Image => parse_image_name(&name),
            ArtifactKind::Table => parse_table_name(&name),
            _ => None,
        };
        if let Some((key, index)) = parsed {
            files.push((path, SourceKey::new(key), index));
        }
    }
    Ok(files)
}

/// `<key>_image_<i>.<ext>`
fn parse_image_name(name: &str) -> Option<(&str, u32)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let (key, index) = stem.rsplit_once("_image_")?;
    Some((key, parse_index(index)?))
}

/// `table_<key>_<i>.csv`
fn parse_table_name(name: &str) -> Option<(&str, u32)> {
    let stem = name.strip_prefix("table_")?.strip_suffix(".csv")?;
    let (key, index) = stem.rsplit_once('_')?;
    Some((key, parse_index(index)?))
}

fn parse_index(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|index| *index > 0)
}

fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|err| write_err(path, err))?;
    for row in table {
        writer.write_record(row).map_err(|err| write_err(path, err))?;
    }
    writer.flush().map_err(|err| write_err(path, err))
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| HarvestError::StorageWrite(format!("{}: {err}", path.display())))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|err| HarvestError::StorageWrite(format!("{}: {err}", path.display())))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn image(index: u32, encoding: ImageEncoding, data: &[u8]) -> ExtractedImage {
        ExtractedImage {
            index,
            encoding,
            data: data.to_vec(),
        }
    }

    fn sample() -> ExtractionResult {
        ExtractionResult {
            text: vec!["Page one".into(), "Page two".into()],
            links: vec!["https://example.com/a".into(), "https://example.com/b".into()],
            images: vec![
                image(1, ImageEncoding::Png, b"png-bytes"),
                image(2, ImageEncoding::Jpeg, b"jpeg-bytes"),
            ],
            tables: vec![vec![
                vec!["a".into(), "b".into()],
                vec!["1".into(), "2".into()],
            ]],
            metadata: BTreeMap::from([
                ("author".to_string(), "Ada".to_string()),
                ("title".to_string(), "Report".to_string()),
            ]),
        }
    }

    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        for kind in ArtifactKind::ALL {
            for (path, _) in sorted_entries(&dir.join(kind.dir_name())).unwrap() {
                let bytes = std::fs::read(&path).unwrap();
                files.insert(path, bytes);
            }
        }
        files
    }

    #[test]
    fn writes_the_fixed_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path()).unwrap();
        let key = SourceKey::new("report_pdf");
        storage.save(&sample(), &key).unwrap();

        let base = dir.path();
        assert_eq!(
            std::fs::read_to_string(base.join("text/report_pdf_text.txt")).unwrap(),
            "Page one\nPage two"
        );
        assert_eq!(
            std::fs::read_to_string(base.join("links/report_pdf_links.txt")).unwrap(),
            "https://example.com/a\nhttps://example.com/b\n"
        );
        assert_eq!(
            std::fs::read(base.join("images/report_pdf_image_2.jpeg")).unwrap(),
            b"jpeg-bytes"
        );
        assert!(base.join("images/report_pdf_image_1.png").is_file());
        assert!(base.join("tables/table_report_pdf_1.csv").is_file());
        assert_eq!(
            std::fs::read_to_string(base.join("metadata/report_pdf_metadata.txt")).unwrap(),
            "author: Ada\ntitle: Report\n"
        );
    }

    #[test]
    fn failed_kind_leaves_earlier_kinds_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path()).unwrap();
        let images = dir.path().join("images");
        std::fs::remove_dir(&images).unwrap();
        std::fs::write(&images, b"not a directory").unwrap();

        let key = SourceKey::new("report_pdf");
        let err = storage.save(&sample(), &key).unwrap_err();
        assert_eq!(err.kind(), docharvest_core::ErrorKind::StorageWriteFailure);

        assert_eq!(
            std::fs::read_to_string(storage.text_path(&key)).unwrap(),
            "Page one\nPage two"
        );
        assert_eq!(
            std::fs::read_to_string(storage.links_path(&key)).unwrap(),
            "https://example.com/a\nhttps://example.com/b\n"
        );
        assert!(!storage.metadata_path(&key).exists());
    }

    #[test]
    fn saving_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path()).unwrap();
        let key = SourceKey::new("deck_pptx");

        storage.save(&sample(), &key).unwrap();
        let first = snapshot(dir.path());
        storage.save(&sample(), &key).unwrap();
        assert_eq!(snapshot(dir.path()), first);
    }

    #[test]
    fn resave_drops_stale_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path()).unwrap();
        let key = SourceKey::new("doc_docx");
        let other = SourceKey::new("doc_docx_image_9");
        storage.save(&sample(), &key).unwrap();
        storage.save(&sample(), &other).unwrap();

        let mut smaller = sample();
        smaller.images.truncate(1);
        smaller.tables.clear();
        storage.save(&smaller, &key).unwrap();

        let base = dir.path();
        assert!(base.join("images/doc_docx_image_1.png").is_file());
        assert!(!base.join("images/doc_docx_image_2.jpeg").exists());
        assert!(!base.join("tables/table_doc_docx_1.csv").exists());
        // Another key that merely shares a prefix is untouched.
        assert!(base.join("images/doc_docx_image_9_image_2.jpeg").is_file());
    }

    #[test]
    fn csv_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path()).unwrap();
        let key = SourceKey::new("grid_pdf");
        storage.save(&sample(), &key).unwrap();

        let rows = read_csv(&storage.table_path(&key, 1)).unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["1", "2"]]);
    }

    #[test]
    fn display_filters_by_source_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path()).unwrap();
        storage.save(&sample(), &SourceKey::new("a_pdf")).unwrap();
        storage.save(&sample(), &SourceKey::new("b_docx")).unwrap();

        let everything = storage.display(&ArtifactFilter::all()).unwrap();
        // text + 2 links + 2 images + 1 table + 2 metadata, per source
        assert_eq!(everything.len(), 16);

        let images = storage
            .display(
                &ArtifactFilter::all()
                    .source(SourceKey::new("b_docx"))
                    .kind(ArtifactKind::Image),
            )
            .unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].index, Some(1));
        assert_eq!(
            images[1].body,
            ArtifactBody::image(ImageEncoding::Jpeg, b"jpeg-bytes".to_vec())
        );

        let metadata = storage
            .display(
                &ArtifactFilter::all()
                    .source(SourceKey::new("a_pdf"))
                    .kind(ArtifactKind::Metadata),
            )
            .unwrap();
        assert_eq!(
            metadata[0].body,
            ArtifactBody::Metadata {
                key: "author".into(),
                value: "Ada".into()
            }
        );
    }

    #[test]
    fn empty_result_still_writes_text_links_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FsStorage::new(dir.path()).unwrap();
        let key = SourceKey::new("blank_pdf");
        storage.save(&ExtractionResult::default(), &key).unwrap();

        assert!(storage.text_path(&key).is_file());
        assert!(storage.links_path(&key).is_file());
        assert!(storage.metadata_path(&key).is_file());
    }

    #[test]
    fn reading_a_missing_tree_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("never-written");
        let storage = FsStorage::existing(&base);

        assert!(storage.display(&ArtifactFilter::all()).unwrap().is_empty());
        assert!(!base.exists());
    }

    #[test]
    fn numbered_names_parse_strictly() {
        assert_eq!(parse_image_name("a_pdf_image_3.png"), Some(("a_pdf", 3)));
        assert_eq!(parse_image_name("a_pdf_image_x.png"), None);
        assert_eq!(parse_table_name("table_a_pdf_12.csv"), Some(("a_pdf", 12)));
        assert_eq!(parse_table_name("table_a_pdf_0.csv"), None);
        assert_eq!(parse_table_name("a_pdf_1.csv"), None);
    }
}
