// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docharvest-storage — Persistence for extracted artifacts.
//
// A single `Storage` capability with two backends: a fixed directory tree
// (`FsStorage`) and a SQLite database (`SqliteStorage`). Callers depend only
// on `save` and `display`; the backend is chosen once per run from the
// output configuration.

pub mod artifact;
pub mod fs;
pub mod sqlite;

use docharvest_core::config::OutputConfig;
use docharvest_core::error::Result;
use docharvest_core::types::{ExtractionResult, SourceKey};

pub use artifact::{ArtifactBody, ArtifactFilter, ArtifactLocation, StoredArtifact};
pub use fs::FsStorage;
pub use sqlite::SqliteStorage;

/// Somewhere extraction results can be written to and read back from.
pub trait Storage {
    /// Short backend name for logs and reports.
    fn backend(&self) -> &'static str;

    /// Persist every artifact kind of `result` under `key`.
    ///
    /// Kinds are written independently: a `StorageWriteFailure` in one kind
    /// aborts the save without undoing kinds already written.
    fn save(&mut self, result: &ExtractionResult, key: &SourceKey) -> Result<()>;

    /// Stored artifacts matching `filter`, grouped by kind.
    fn display(&self, filter: &ArtifactFilter) -> Result<Vec<StoredArtifact>>;
}

/// Open the backend selected by `config`.
pub fn open_storage(config: &OutputConfig) -> Result<Box<dyn Storage>> {
    let storage: Box<dyn Storage> = match config {
        OutputConfig::Filesystem { base_dir } => Box::new(FsStorage::new(base_dir)?),
        OutputConfig::Database { path, on_duplicate } => {
            Box::new(SqliteStorage::open(path, *on_duplicate)?)
        }
    };
    Ok(storage)
}

/// Open the backend selected by `config` for `display` only. A filesystem
/// destination is read as it is; no directories are created.
pub fn open_storage_for_display(config: &OutputConfig) -> Result<Box<dyn Storage>> {
    let storage: Box<dyn Storage> = match config {
        OutputConfig::Filesystem { base_dir } => Box::new(FsStorage::existing(base_dir)),
        OutputConfig::Database { path, on_duplicate } => {
            Box::new(SqliteStorage::open(path, *on_duplicate)?)
        }
    };
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use docharvest_core::config::DuplicatePolicy;

    use super::*;

    #[test]
    fn config_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let fs = open_storage(&OutputConfig::Filesystem {
            base_dir: dir.path().join("out"),
        })
        .unwrap();
        assert_eq!(fs.backend(), "filesystem");
        assert!(dir.path().join("out/images").is_dir());

        let db = open_storage(&OutputConfig::Database {
            path: dir.path().join("harvest.db"),
            on_duplicate: DuplicatePolicy::Append,
        })
        .unwrap();
        assert_eq!(db.backend(), "database");
    }

    #[test]
    fn display_backend_leaves_the_tree_alone() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("out");
        let fs = open_storage_for_display(&OutputConfig::Filesystem {
            base_dir: base.clone(),
        })
        .unwrap();
        assert_eq!(fs.backend(), "filesystem");
        assert!(fs.display(&ArtifactFilter::all()).unwrap().is_empty());
        assert!(!base.exists());
    }

    #[test]
    fn unwritable_destination_is_a_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = open_storage(&OutputConfig::Filesystem {
            base_dir: PathBuf::from(&blocker),
        })
        .err()
        .unwrap();
        assert_eq!(err.kind(), docharvest_core::ErrorKind::StorageWriteFailure);
    }
}
