// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stored artifacts — what `display` reads back from either backend.

use std::fmt;
use std::path::PathBuf;

use docharvest_core::types::{ArtifactKind, ImageEncoding, SourceKey, Table};
use serde::Serialize;

/// Which stored artifacts to return. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactFilter {
    pub source: Option<SourceKey>,
    pub kind: Option<ArtifactKind>,
}

impl ArtifactFilter {
    /// Match every artifact of every source.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn source(mut self, key: SourceKey) -> Self {
        self.source = Some(key);
        self
    }

    pub fn kind(mut self, kind: ArtifactKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches_source(&self, key: &SourceKey) -> bool {
        self.source.as_ref().is_none_or(|wanted| wanted == key)
    }

    /// The kinds to visit, in storage order.
    pub fn kinds(&self) -> Vec<ArtifactKind> {
        match self.kind {
            Some(kind) => vec![kind],
            None => ArtifactKind::ALL.to_vec(),
        }
    }
}

/// Where an artifact lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactLocation {
    File(PathBuf),
    Row { table: &'static str, id: i64 },
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Row { table, id } => write!(f, "{table}#{id}"),
        }
    }
}

/// The content of one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ArtifactBody {
    Text(String),
    Link(String),
    Image {
        encoding: ImageEncoding,
        size: usize,
        #[serde(skip)]
        data: Vec<u8>,
    },
    Table(Table),
    Metadata { key: String, value: String },
}

impl ArtifactBody {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Text(_) => ArtifactKind::Text,
            Self::Link(_) => ArtifactKind::Link,
            Self::Image { .. } => ArtifactKind::Image,
            Self::Table(_) => ArtifactKind::Table,
            Self::Metadata { .. } => ArtifactKind::Metadata,
        }
    }

    pub fn image(encoding: ImageEncoding, data: Vec<u8>) -> Self {
        Self::Image {
            encoding,
            size: data.len(),
            data,
        }
    }

    /// One-line summary for terminal output.
    pub fn summary(&self) -> String {
        match self {
            Self::Text(text) => {
                let first = text.lines().next().unwrap_or_default();
                format!("{} chars: {first}", text.chars().count())
            }
            Self::Link(url) => url.clone(),
            Self::Image { encoding, size, .. } => format!("{encoding} image, {size} bytes"),
            Self::Table(rows) => {
                let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
                format!("{} rows x {columns} columns", rows.len())
            }
            Self::Metadata { key, value } => format!("{key}: {value}"),
        }
    }
}

/// One persisted artifact together with its identity and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArtifact {
    pub source: SourceKey,
    /// 1-based position for ordered kinds.
    pub index: Option<u32>,
    pub location: ArtifactLocation,
    pub body: ArtifactBody,
}

impl StoredArtifact {
    pub fn kind(&self) -> ArtifactKind {
        self.body.kind()
    }
}
