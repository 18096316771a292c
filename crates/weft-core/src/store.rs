//! The `KnowledgeStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `weft-store-sqlite`).
//! Consumers depend on this abstraction, not on any concrete backend.
//!
//! Writes are upserts throughout and each call is transactionally atomic.
//! Reads never mutate state. The backing store is a single-writer resource:
//! callers run one logical ingestion pipeline at a time, while concurrent
//! reads are safe.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  file::NewFile,
  relation::{NewRelation, RelationKind},
  scan::RelationshipScan,
};

// ─── Query result types ──────────────────────────────────────────────────────

/// One typed, weighted edge incident to a queried file, resolved to the
/// other endpoint's path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborEdge {
  pub path:     String,
  #[serde(rename = "type")]
  pub kind:     RelationKind,
  pub strength: f64,
  pub metadata: Option<serde_json::Value>,
}

/// Single-hop neighborhood of a file: what it references and what
/// references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbors {
  pub path:          String,
  pub outgoing:      Vec<NeighborEdge>,
  pub incoming:      Vec<NeighborEdge>,
  /// Distinct union of both directions' endpoints.
  pub related_files: Vec<String>,
}

/// One entry in the connectivity ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRank {
  pub path:        String,
  #[serde(rename = "type")]
  pub file_type:   String,
  /// Incident edge count, both directions.
  pub connections: i64,
}

/// One match from a path-pattern search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHit {
  pub path:      String,
  #[serde(rename = "type")]
  pub file_type: String,
  pub size:      Option<i64>,
  pub mtime:     Option<chrono::DateTime<chrono::Utc>>,
}

/// One append-only change record, as returned by the timeline query.
/// Timestamps are stored and returned verbatim as supplied by the producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEntry {
  #[serde(rename = "type")]
  pub change_type: String,
  #[serde(rename = "old")]
  pub old_value:   Option<String>,
  #[serde(rename = "new")]
  pub new_value:   Option<String>,
  #[serde(rename = "time")]
  pub timestamp:   String,
}

/// A persisted full-system snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
  pub snapshot_id: String,
  pub timestamp:   String,
  pub hostname:    String,
  pub scan_type:   String,
  /// The full document, verbatim.
  pub payload:     serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
  pub total_files:         i64,
  pub total_relationships: i64,
  pub total_snapshots:     i64,
  pub relationship_types:  BTreeMap<String, i64>,
  pub file_types:          BTreeMap<String, i64>,
}

/// Row counts written while ingesting an extractor result tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScanIngest {
  pub files:         usize,
  pub relationships: usize,
}

/// Outcome of ingesting a full snapshot document.
///
/// A snapshot-storage failure is reported here rather than propagated, so a
/// bad disk never kills the rest of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
  pub snapshot_id:      Option<String>,
  pub snapshot_stored:  bool,
  pub files:            usize,
  pub relationships:    usize,
  pub changes_recorded: usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable file knowledge graph backend.
pub trait KnowledgeStore {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert or update the file keyed by `input.path`; returns the row id.
  /// First-seen time is preserved across upserts.
  fn upsert_file(&self, input: &NewFile) -> Result<i64, Self::Error>;

  /// Upsert both endpoints as files, then upsert the edge keyed by
  /// (source, target, kind). Atomic: either all three rows commit or none.
  fn upsert_relation(&self, input: &NewRelation) -> Result<(), Self::Error>;

  /// Append one change record for `path`, creating the file row if absent.
  /// The timestamp string is stored verbatim.
  fn record_change(
    &self,
    path: &str,
    change_type: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    at: &str,
  ) -> Result<(), Self::Error>;

  /// Persist a full snapshot document, overwriting any snapshot with the
  /// same identifier. The identifier comes from the document's `scan_id`
  /// key, falling back to a timestamp-derived one. Returns the identifier.
  fn store_snapshot(
    &self,
    document: &serde_json::Value,
  ) -> Result<String, Self::Error>;

  /// Walk an extractor result tree and upsert every file and reference.
  fn ingest_scan(
    &self,
    scan: &RelationshipScan,
  ) -> Result<ScanIngest, Self::Error>;

  /// Store a snapshot document and fold its `file_relationships` and
  /// `file_changes.recent_changes` sections into the graph.
  fn ingest_snapshot(
    &self,
    document: &serde_json::Value,
  ) -> Result<IngestReport, Self::Error>;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a stored snapshot by identifier.
  fn snapshot(
    &self,
    snapshot_id: &str,
  ) -> Result<Option<StoredSnapshot>, Self::Error>;

  /// One-hop neighborhood of `path`. `max_depth` is accepted for future
  /// multi-hop traversal; the current behavior is exactly one hop each way.
  /// Fails with the backend's not-found error for unknown paths.
  fn neighbors(
    &self,
    path: &str,
    max_depth: u32,
  ) -> Result<Neighbors, Self::Error>;

  /// Distinct files one edge away from `path` in either direction,
  /// optionally restricted to a subset of kinds. Unknown paths yield an
  /// empty list.
  fn connected_files(
    &self,
    path: &str,
    kinds: Option<&[RelationKind]>,
  ) -> Result<Vec<String>, Self::Error>;

  /// Files ranked by total incident edge count, descending.
  fn top_connected(
    &self,
    limit: usize,
  ) -> Result<Vec<ConnectionRank>, Self::Error>;

  /// Substring match over stored paths, optionally filtered by exact file
  /// type.
  fn search_by_pattern(
    &self,
    pattern: &str,
    file_type: Option<&str>,
  ) -> Result<Vec<FileHit>, Self::Error>;

  /// Change records for `path` newer than the trailing cutoff, newest
  /// first. Unknown paths yield an empty list.
  fn change_timeline(
    &self,
    path: &str,
    days: u32,
  ) -> Result<Vec<ChangeEntry>, Self::Error>;

  fn stats(&self) -> Result<StoreStats, Self::Error>;
}
