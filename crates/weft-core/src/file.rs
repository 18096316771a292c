//! File records — the nodes of the knowledge graph.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derive the stored file type from a path's extension, without the dot.
/// Extensionless paths get an empty type.
pub fn file_type_for(path: &str) -> String {
  Path::new(path)
    .extension()
    .map(|ext| ext.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// Input to `KnowledgeStore::upsert_file`. The path is the unique key;
/// re-adding an existing path updates the other fields in place.
#[derive(Debug, Clone, Default)]
pub struct NewFile {
  pub path:      String,
  /// Defaults to the path's extension when omitted.
  pub file_type: Option<String>,
  pub size:      Option<i64>,
  pub mtime:     Option<DateTime<Utc>>,
  /// Opaque content fingerprint supplied by the caller; never computed here.
  pub hash:      Option<String>,
}

impl NewFile {
  pub fn new(path: impl Into<String>) -> Self {
    Self { path: path.into(), ..Self::default() }
  }
}

/// A file row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
  pub id:         i64,
  pub path:       String,
  pub file_type:  String,
  pub size:       Option<i64>,
  pub mtime:      Option<DateTime<Utc>>,
  /// Set on first insert and preserved across upserts.
  pub first_seen: DateTime<Utc>,
  pub hash:       Option<String>,
}
