// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SQLite storage — one table per artifact kind, every row keyed by source.
//
// Schema:
//   extracted_text(id, source_key, idx, content)          -- idx 1-based unit
//   extracted_links(id, source_key, url)
//   extracted_images(id, source_key, idx, encoding, data) -- encoding = file extension
//   extracted_tables(id, source_key, idx, row_idx, col_idx, cell_value)
//                                                         -- one row per cell, row/col 0-based
//   extracted_metadata(id, source_key, key, value)

use std::path::Path;

use docharvest_core::config::DuplicatePolicy;
use docharvest_core::error::{HarvestError, Result};
use docharvest_core::types::{ArtifactKind, ExtractionResult, ImageEncoding, SourceKey, Table};
use rusqlite::{Connection, Transaction, params};
use tracing::{debug, info, instrument};

use crate::Storage;
use crate::artifact::{ArtifactBody, ArtifactFilter, ArtifactLocation, StoredArtifact};

// ---------------------------------------------------------------------------
// Local error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` into a `HarvestError::Database`.
fn db_err(e: rusqlite::Error) -> HarvestError {
    HarvestError::Database(e.to_string())
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS extracted_text (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        source_key TEXT    NOT NULL,
        idx        INTEGER NOT NULL,
        content    TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS extracted_links (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        source_key TEXT    NOT NULL,
        url        TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS extracted_images (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        source_key TEXT    NOT NULL,
        idx        INTEGER NOT NULL,
        encoding   TEXT    NOT NULL,
        data       BLOB    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS extracted_tables (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        source_key TEXT    NOT NULL,
        idx        INTEGER NOT NULL,
        row_idx    INTEGER NOT NULL,
        col_idx    INTEGER NOT NULL,
        cell_value TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS extracted_metadata (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        source_key TEXT    NOT NULL,
        key        TEXT    NOT NULL,
        value      TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_text_source     ON extracted_text(source_key);
    CREATE INDEX IF NOT EXISTS idx_links_source    ON extracted_links(source_key);
    CREATE INDEX IF NOT EXISTS idx_images_source   ON extracted_images(source_key);
    CREATE INDEX IF NOT EXISTS idx_tables_source   ON extracted_tables(source_key);
    CREATE INDEX IF NOT EXISTS idx_metadata_source ON extracted_metadata(source_key);
";

fn table_name(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Text => "extracted_text",
        ArtifactKind::Link => "extracted_links",
        ArtifactKind::Image => "extracted_images",
        ArtifactKind::Table => "extracted_tables",
        ArtifactKind::Metadata => "extracted_metadata",
    }
}

/// Database backend. The connection is held for the lifetime of the value
/// and closed on drop.
pub struct SqliteStorage {
    conn: Connection,
    policy: DuplicatePolicy,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`.
    ///
    /// Tables are created if they do not already exist. WAL mode is enabled.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, policy: DuplicatePolicy) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!(?policy, "extraction database opened");
        Ok(Self { conn, policy })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory(policy: DuplicatePolicy) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!(?policy, "in-memory extraction database opened");
        Ok(Self { conn, policy })
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Rows stored for `key` of one kind (cells, for tables).
    pub fn row_count(&self, kind: ArtifactKind, key: &SourceKey) -> Result<u64> {
        self.conn
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE source_key = ?1",
                    table_name(kind)
                ),
                params![key.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    /// Write one kind inside its own transaction.
    fn save_kind(
        &mut self,
        kind: ArtifactKind,
        result: &ExtractionResult,
        key: &SourceKey,
    ) -> Result<()> {
        let tx = self.conn.transaction().map_err(db_err)?;
        if self.policy == DuplicatePolicy::Replace {
            let removed = tx
                .execute(
                    &format!("DELETE FROM {} WHERE source_key = ?1", table_name(kind)),
                    params![key.as_str()],
                )
                .map_err(db_err)?;
            if removed > 0 {
                debug!(%kind, removed, "earlier rows replaced");
            }
        }
        insert_kind(&tx, kind, result, key.as_str())?;
        tx.commit().map_err(db_err)
    }

    fn display_kind(
        &self,
        kind: ArtifactKind,
        filter: &ArtifactFilter,
    ) -> Result<Vec<StoredArtifact>> {
        let source = filter.source.as_ref().map(SourceKey::as_str);
        let sql = match kind {
            ArtifactKind::Text => {
                "SELECT id, source_key, idx, content FROM extracted_text
                 WHERE ?1 IS NULL OR source_key = ?1
                 ORDER BY source_key, id"
            }
            ArtifactKind::Link => {
                "SELECT id, source_key, url FROM extracted_links
                 WHERE ?1 IS NULL OR source_key = ?1
                 ORDER BY source_key, id"
            }
            ArtifactKind::Image => {
                "SELECT id, source_key, idx, encoding, data FROM extracted_images
                 WHERE ?1 IS NULL OR source_key = ?1
                 ORDER BY source_key, id"
            }
            ArtifactKind::Table => {
                "SELECT id, source_key, idx, row_idx, col_idx, cell_value FROM extracted_tables
                 WHERE ?1 IS NULL OR source_key = ?1
                 ORDER BY source_key, id"
            }
            ArtifactKind::Metadata => {
                "SELECT id, source_key, key, value FROM extracted_metadata
                 WHERE ?1 IS NULL OR source_key = ?1
                 ORDER BY source_key, id"
            }
        };
        let table = table_name(kind);
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;

        if kind == ArtifactKind::Table {
            let cells = stmt
                .query_map(params![source], |row| {
                    Ok(Cell {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        idx: row.get(2)?,
                        row: row.get(3)?,
                        col: row.get(4)?,
                        value: row.get(5)?,
                    })
                })
                .map_err(db_err)?;
            let mut collected = Vec::new();
            for cell in cells {
                collected.push(cell.map_err(db_err)?);
            }
            return Ok(assemble_tables(collected));
        }

        let rows = stmt
            .query_map(params![source], |row| {
                let id: i64 = row.get(0)?;
                let source: String = row.get(1)?;
                let (index, body) = match kind {
                    ArtifactKind::Text => (Some(row.get(2)?), ArtifactBody::Text(row.get(3)?)),
                    ArtifactKind::Link => (None, ArtifactBody::Link(row.get(2)?)),
                    ArtifactKind::Image => {
                        let encoding: String = row.get(3)?;
                        (
                            Some(row.get(2)?),
                            ArtifactBody::image(
                                ImageEncoding::from_extension(&encoding),
                                row.get(4)?,
                            ),
                        )
                    }
                    _ => (
                        None,
                        ArtifactBody::Metadata {
                            key: row.get(2)?,
                            value: row.get(3)?,
                        },
                    ),
                };
                Ok(StoredArtifact {
                    source: SourceKey::new(&source),
                    index,
                    location: ArtifactLocation::Row { table, id },
                    body,
                })
            })
            .map_err(db_err)?;

        let mut artifacts = Vec::new();
        for row in rows {
            artifacts.push(row.map_err(db_err)?);
        }
        Ok(artifacts)
    }
}

fn insert_kind(
    tx: &Transaction<'_>,
    kind: ArtifactKind,
    result: &ExtractionResult,
    key: &str,
) -> Result<()> {
    match kind {
        ArtifactKind::Text => {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO extracted_text (source_key, idx, content) VALUES (?1, ?2, ?3)",
                )
                .map_err(db_err)?;
            for (unit, idx) in result.text.iter().zip(1u32..) {
                stmt.execute(params![key, idx, unit]).map_err(db_err)?;
            }
        }
        ArtifactKind::Link => {
            let mut stmt = tx
                .prepare("INSERT INTO extracted_links (source_key, url) VALUES (?1, ?2)")
                .map_err(db_err)?;
            for url in &result.links {
                stmt.execute(params![key, url]).map_err(db_err)?;
            }
        }
        ArtifactKind::Image => {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO extracted_images (source_key, idx, encoding, data)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(db_err)?;
            for image in &result.images {
                stmt.execute(params![key, image.index, image.encoding.extension(), image.data])
                    .map_err(db_err)?;
            }
        }
        ArtifactKind::Table => {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO extracted_tables (source_key, idx, row_idx, col_idx, cell_value)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(db_err)?;
            for (table, idx) in result.tables.iter().zip(1u32..) {
                for (row, row_idx) in table.iter().zip(0u32..) {
                    for (cell, col_idx) in row.iter().zip(0u32..) {
                        stmt.execute(params![key, idx, row_idx, col_idx, cell])
                            .map_err(db_err)?;
                    }
                }
            }
        }
        ArtifactKind::Metadata => {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO extracted_metadata (source_key, key, value) VALUES (?1, ?2, ?3)",
                )
                .map_err(db_err)?;
            for (name, value) in &result.metadata {
                stmt.execute(params![key, name, value]).map_err(db_err)?;
            }
        }
    }
    Ok(())
}

/// One row of `extracted_tables`.
struct Cell {
    id: i64,
    source: String,
    idx: u32,
    row: u32,
    col: u32,
    value: String,
}

/// Rebuild tables from cells ordered by source and insertion.
///
/// Cells of one saved table are inserted row-major, so a position that does
/// not advance marks the start of another save of the same table.
fn assemble_tables(cells: Vec<Cell>) -> Vec<StoredArtifact> {
    let mut tables: Vec<StoredArtifact> = Vec::new();
    let mut last: Option<(String, u32, u32, u32)> = None;

    for cell in cells {
        let continues = last.as_ref().is_some_and(|(source, idx, row, col)| {
            *source == cell.source && *idx == cell.idx && (cell.row, cell.col) > (*row, *col)
        });
        if !continues {
            tables.push(StoredArtifact {
                source: SourceKey::new(&cell.source),
                index: Some(cell.idx),
                location: ArtifactLocation::Row {
                    table: "extracted_tables",
                    id: cell.id,
                },
                body: ArtifactBody::Table(Table::new()),
            });
        }
        if let Some(StoredArtifact {
            body: ArtifactBody::Table(rows),
            ..
        }) = tables.last_mut()
        {
            let (r, c) = (cell.row as usize, cell.col as usize);
            if rows.len() <= r {
                rows.resize_with(r + 1, Vec::new);
            }
            let row = &mut rows[r];
            if row.len() <= c {
                row.resize(c + 1, String::new());
            }
            row[c] = cell.value;
        }
        last = Some((cell.source, cell.idx, cell.row, cell.col));
    }
    tables
}

impl Storage for SqliteStorage {
    fn backend(&self) -> &'static str {
        "database"
    }

    /// Each kind is committed on its own; a failure leaves kinds already
    /// committed for this key in place.
    #[instrument(skip_all, fields(source = %key))]
    fn save(&mut self, result: &ExtractionResult, key: &SourceKey) -> Result<()> {
        for kind in ArtifactKind::ALL {
            self.save_kind(kind, result, key)?;
            debug!(%kind, count = result.count(kind), "rows inserted");
        }
        info!(policy = ?self.policy, "Artifacts saved to database");
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

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use docharvest_core::types::ExtractedImage;

    use super::*;

    fn make_store(policy: DuplicatePolicy) -> SqliteStorage {
        SqliteStorage::open_in_memory(policy).expect("open in-memory database")
    }

    fn sample() -> ExtractionResult {
        ExtractionResult {
            text: vec!["Slide one".into(), "Slide two\nsecond line".into()],
            links: vec!["https://example.com/".into()],
            images: vec![ExtractedImage {
                index: 1,
                encoding: ImageEncoding::Png,
                data: vec![0x89, b'P', b'N', b'G'],
            }],
            tables: vec![
                vec![vec!["a".into(), "b".into()], vec!["1".into(), "2".into()]],
                vec![vec!["only".into()]],
            ],
            metadata: BTreeMap::from([("title".to_string(), "Deck".to_string())]),
        }
    }

    #[test]
    fn save_and_display_round_trip() {
        let mut store = make_store(DuplicatePolicy::Replace);
        let key = SourceKey::new("deck_pptx");
        store.save(&sample(), &key).unwrap();

        let text = store
            .display(&ArtifactFilter::all().kind(ArtifactKind::Text))
            .unwrap();
        assert_eq!(text.len(), 2);
        assert_eq!(text[1].index, Some(2));
        assert_eq!(text[1].body, ArtifactBody::Text("Slide two\nsecond line".into()));

        let tables = store
            .display(&ArtifactFilter::all().kind(ArtifactKind::Table))
            .unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(
            tables[0].body,
            ArtifactBody::Table(vec![vec!["a".into(), "b".into()], vec!["1".into(), "2".into()]])
        );
        assert_eq!(tables[1].index, Some(2));

        let images = store
            .display(&ArtifactFilter::all().kind(ArtifactKind::Image))
            .unwrap();
        assert_eq!(
            images[0].body,
            ArtifactBody::image(ImageEncoding::Png, vec![0x89, b'P', b'N', b'G'])
        );
    }

    #[test]
    fn failed_kind_keeps_committed_kinds() {
        let mut store = make_store(DuplicatePolicy::Replace);
        store.conn.execute_batch("DROP TABLE extracted_tables;").unwrap();

        let key = SourceKey::new("deck_pptx");
        let err = store.save(&sample(), &key).unwrap_err();
        assert_eq!(err.kind(), docharvest_core::ErrorKind::StorageWriteFailure);

        assert_eq!(store.row_count(ArtifactKind::Text, &key).unwrap(), 2);
        assert_eq!(store.row_count(ArtifactKind::Link, &key).unwrap(), 1);
        assert_eq!(store.row_count(ArtifactKind::Image, &key).unwrap(), 1);
        assert_eq!(store.row_count(ArtifactKind::Metadata, &key).unwrap(), 0);
    }

    #[test]
    fn replace_policy_keeps_one_copy() {
        let mut store = make_store(DuplicatePolicy::Replace);
        let key = SourceKey::new("a_pdf");
        store.save(&sample(), &key).unwrap();
        store.save(&sample(), &key).unwrap();

        assert_eq!(store.row_count(ArtifactKind::Text, &key).unwrap(), 2);
        assert_eq!(store.row_count(ArtifactKind::Table, &key).unwrap(), 5);
        assert_eq!(
            store
                .display(&ArtifactFilter::all().kind(ArtifactKind::Table))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn append_policy_duplicates_rows() {
        let mut store = make_store(DuplicatePolicy::Append);
        let key = SourceKey::new("a_pdf");
        store.save(&sample(), &key).unwrap();
        store.save(&sample(), &key).unwrap();

        assert_eq!(store.row_count(ArtifactKind::Link, &key).unwrap(), 2);
        // Repeated saves of the same table stay separate tables.
        let tables = store
            .display(&ArtifactFilter::all().kind(ArtifactKind::Table))
            .unwrap();
        assert_eq!(tables.len(), 4);
        assert_eq!(tables[0].body, tables[2].body);
    }

    #[test]
    fn display_filters_by_source() {
        let mut store = make_store(DuplicatePolicy::Replace);
        store.save(&sample(), &SourceKey::new("a_pdf")).unwrap();
        store.save(&sample(), &SourceKey::new("b_docx")).unwrap();

        let only_b = store
            .display(&ArtifactFilter::all().source(SourceKey::new("b_docx")))
            .unwrap();
        assert!(only_b.iter().all(|artifact| artifact.source.as_str() == "b_docx"));
        // 2 text + 1 link + 1 image + 2 tables + 1 metadata
        assert_eq!(only_b.len(), 7);

        let metadata = store
            .display(&ArtifactFilter::all().kind(ArtifactKind::Metadata))
            .unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].source.as_str(), "a_pdf");
    }

    #[test]
    fn csv_style_round_trip() {
        let mut store = make_store(DuplicatePolicy::Replace);
        let key = SourceKey::new("grid_pdf");
        let result = ExtractionResult {
            tables: vec![vec![vec!["a".into(), "b".into()], vec!["1".into(), "2".into()]]],
            ..ExtractionResult::default()
        };
        store.save(&result, &key).unwrap();

        let tables = store
            .display(&ArtifactFilter::all().source(key).kind(ArtifactKind::Table))
            .unwrap();
        assert_eq!(
            tables[0].body,
            ArtifactBody::Table(vec![vec!["a".into(), "b".into()], vec!["1".into(), "2".into()]])
        );
    }

    #[test]
    fn database_file_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extracted.db");
        let key = SourceKey::new("kept_docx");
        {
            let mut store = SqliteStorage::open(&path, DuplicatePolicy::Replace).unwrap();
            store.save(&sample(), &key).unwrap();
        }
        let store = SqliteStorage::open(&path, DuplicatePolicy::Replace).unwrap();
        assert_eq!(store.row_count(ArtifactKind::Metadata, &key).unwrap(), 1);
    }
}
