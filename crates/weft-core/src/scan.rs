//! Result tree produced by the relationship extractor.
//!
//! These are plain data types; the scanning and graph-building logic lives
//! in `weft-extract`. The store's scan ingester walks this same tree, so it
//! doubles as the interface between extraction and persistence.
//!
//! Ordered maps and sets are used throughout so identical inputs always
//! serialize and rank identically.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::relation::RelationKind;

// ─── Per-directory results ───────────────────────────────────────────────────

/// Everything discovered about one scanned file with at least one reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConnections {
  pub size:       u64,
  pub modified:   Option<DateTime<Utc>>,
  /// Discovered references, grouped by kind. Targets are absolute paths
  /// (relative captures are resolved against the scanned file's directory).
  pub references: BTreeMap<RelationKind, BTreeSet<String>>,
}

impl FileConnections {
  /// Total outgoing reference count across all kinds.
  pub fn reference_count(&self) -> usize {
    self.references.values().map(BTreeSet::len).sum()
  }
}

/// The result of scanning one root directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryScan {
  pub directory:      String,
  pub files_scanned:  usize,
  /// Keyed by source path; only files with at least one reference appear.
  pub connections:    BTreeMap<String, FileConnections>,
  /// Extension histogram over scanned files (`no_extension` for bare names).
  pub file_types:     BTreeMap<String, usize>,
  /// Sample (at most 20) of scanned files that never appear as the target
  /// of any discovered reference.
  pub orphaned_files: Vec<String>,
}

// ─── Dependency graph ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
  /// The file path; doubles as the node identifier.
  pub id:        String,
  pub size:      u64,
  pub modified:  Option<DateTime<Utc>>,
  #[serde(rename = "type")]
  pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
  /// Sequential, assigned in emission order.
  pub id:     usize,
  pub source: String,
  pub target: String,
  #[serde(rename = "type")]
  pub kind:   RelationKind,
}

/// One entry in the most-connected ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedFile {
  pub file:        String,
  pub connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
  pub total_files:       usize,
  pub total_connections: usize,
  /// Top files by outgoing reference count, descending; ties keep the
  /// connection map's order.
  pub most_connected:    Vec<RankedFile>,
  /// Reference counts per kind.
  pub connection_types:  BTreeMap<RelationKind, usize>,
}

/// Nodes, edges, and derived statistics for a set of connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraph {
  pub nodes: Vec<GraphNode>,
  pub edges: Vec<GraphEdge>,
  pub stats: GraphStats,
}

// ─── Whole-scan results ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
  pub directories_scanned:  usize,
  pub total_files_scanned:  usize,
  pub total_connections:    usize,
  /// Top 5 of the global graph's ranking.
  pub most_connected_files: Vec<RankedFile>,
}

/// The complete output of scanning a list of root directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipScan {
  pub scan_time:    DateTime<Utc>,
  /// Per-root results, keyed by the root directory path.
  pub directories:  BTreeMap<String, DirectoryScan>,
  /// Graph over the union of all per-directory connections.
  pub global_graph: DependencyGraph,
  pub summary:      ScanSummary,
}
