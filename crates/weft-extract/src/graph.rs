//! Dependency-graph construction and the multi-directory scan driver.

use std::{collections::BTreeMap, path::PathBuf};

use chrono::Utc;
use tracing::debug;
use weft_core::{
  file::file_type_for,
  relation::RelationKind,
  scan::{
    DependencyGraph, DirectoryScan, FileConnections, GraphEdge, GraphNode,
    GraphStats, RankedFile, RelationshipScan, ScanSummary,
  },
};

use crate::scanner::scan_directory;

/// Number of entries in a graph's most-connected ranking.
pub const RANKING_LIMIT: usize = 10;

/// Number of ranking entries surfaced in the whole-scan summary.
const SUMMARY_RANKING_LIMIT: usize = 5;

/// Build nodes, edges, and statistics from a set of connections.
///
/// Nodes are files with outgoing references; edges get sequential ids in
/// emission order. The ranking sorts by outgoing reference count with a
/// stable sort, so ties keep the connection map's order.
pub fn build_dependency_graph(
  connections: &BTreeMap<String, FileConnections>,
) -> DependencyGraph {
  let mut nodes = Vec::with_capacity(connections.len());
  let mut edges = Vec::new();
  let mut connection_types: BTreeMap<RelationKind, usize> = BTreeMap::new();
  let mut ranking = Vec::with_capacity(connections.len());

  for (path, data) in connections {
    nodes.push(GraphNode {
      id:        path.clone(),
      size:      data.size,
      modified:  data.modified,
      file_type: file_type_for(path),
    });
    ranking.push(RankedFile {
      file:        path.clone(),
      connections: data.reference_count(),
    });

    for (kind, targets) in &data.references {
      *connection_types.entry(kind.clone()).or_insert(0) += targets.len();
      for target in targets {
        edges.push(GraphEdge {
          id:     edges.len(),
          source: path.clone(),
          target: target.clone(),
          kind:   kind.clone(),
        });
      }
    }
  }

  ranking.sort_by(|a, b| b.connections.cmp(&a.connections));
  ranking.truncate(RANKING_LIMIT);

  let stats = GraphStats {
    total_files: nodes.len(),
    total_connections: edges.len(),
    most_connected: ranking,
    connection_types,
  };
  DependencyGraph { nodes, edges, stats }
}

/// Scan every existing root in `directories` and merge the results into a
/// global graph. Nonexistent roots are skipped without error.
pub fn scan_relationships(
  directories: &[PathBuf],
  max_files: usize,
) -> RelationshipScan {
  let mut per_directory: BTreeMap<String, DirectoryScan> = BTreeMap::new();
  let mut merged: BTreeMap<String, FileConnections> = BTreeMap::new();

  for root in directories {
    if !root.exists() {
      debug!(directory = %root.display(), "skipping nonexistent scan root");
      continue;
    }
    let scan = scan_directory(root, max_files);
    merged.extend(
      scan.connections.iter().map(|(k, v)| (k.clone(), v.clone())),
    );
    per_directory.insert(scan.directory.clone(), scan);
  }

  let global_graph = build_dependency_graph(&merged);
  let summary = ScanSummary {
    directories_scanned:  per_directory.len(),
    total_files_scanned:  per_directory.values().map(|d| d.files_scanned).sum(),
    total_connections:    per_directory
      .values()
      .map(|d| d.connections.len())
      .sum(),
    most_connected_files: global_graph
      .stats
      .most_connected
      .iter()
      .take(SUMMARY_RANKING_LIMIT)
      .cloned()
      .collect(),
  };

  RelationshipScan {
    scan_time: Utc::now(),
    directories: per_directory,
    global_graph,
    summary,
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::BTreeSet, fs};

  use super::*;

  fn connections_fixture() -> BTreeMap<String, FileConnections> {
    let mut connections = BTreeMap::new();

    // a.conf: three outgoing references across two kinds.
    let mut a_refs: BTreeMap<RelationKind, BTreeSet<String>> = BTreeMap::new();
    a_refs.insert(
      RelationKind::ConfigInclude,
      BTreeSet::from(["/etc/b.conf".to_owned(), "/etc/c.conf".to_owned()]),
    );
    a_refs.insert(
      RelationKind::PathReference,
      BTreeSet::from(["/var/log/a.log".to_owned()]),
    );
    connections.insert("/etc/a.conf".to_owned(), FileConnections {
      size:       120,
      modified:   None,
      references: a_refs,
    });

    // b.conf: one outgoing reference.
    let mut b_refs: BTreeMap<RelationKind, BTreeSet<String>> = BTreeMap::new();
    b_refs.insert(
      RelationKind::ConfigInclude,
      BTreeSet::from(["/etc/c.conf".to_owned()]),
    );
    connections.insert("/etc/b.conf".to_owned(), FileConnections {
      size:       40,
      modified:   None,
      references: b_refs,
    });

    connections
  }

  #[test]
  fn nodes_cover_files_with_outgoing_references() {
    let graph = build_dependency_graph(&connections_fixture());
    let ids: Vec<_> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["/etc/a.conf", "/etc/b.conf"]);
    assert_eq!(graph.nodes[0].file_type, "conf");
  }

  #[test]
  fn edges_get_sequential_ids() {
    let graph = build_dependency_graph(&connections_fixture());
    assert_eq!(graph.edges.len(), 4);
    let ids: Vec<_> = graph.edges.iter().map(|e| e.id).collect();
    assert_eq!(ids, [0, 1, 2, 3]);
  }

  #[test]
  fn ranking_is_by_outgoing_count_descending() {
    let graph = build_dependency_graph(&connections_fixture());
    let ranked: Vec<_> = graph
      .stats
      .most_connected
      .iter()
      .map(|r| (r.file.as_str(), r.connections))
      .collect();
    assert_eq!(ranked, [("/etc/a.conf", 3), ("/etc/b.conf", 1)]);
  }

  #[test]
  fn stats_count_references_per_kind() {
    let graph = build_dependency_graph(&connections_fixture());
    assert_eq!(graph.stats.total_files, 2);
    assert_eq!(graph.stats.total_connections, 4);
    assert_eq!(
      graph.stats.connection_types[&RelationKind::ConfigInclude],
      3
    );
    assert_eq!(graph.stats.connection_types[&RelationKind::PathReference], 1);
  }

  #[test]
  fn ranking_ties_keep_first_seen_order() {
    let mut connections = BTreeMap::new();
    for name in ["z.conf", "a.conf", "m.conf"] {
      let mut refs: BTreeMap<RelationKind, BTreeSet<String>> = BTreeMap::new();
      refs.insert(
        RelationKind::ConfigInclude,
        BTreeSet::from(["/etc/base.conf".to_owned()]),
      );
      connections.insert(format!("/etc/{name}"), FileConnections {
        size:       1,
        modified:   None,
        references: refs,
      });
    }

    let graph = build_dependency_graph(&connections);
    let files: Vec<_> = graph
      .stats
      .most_connected
      .iter()
      .map(|r| r.file.as_str())
      .collect();
    assert_eq!(files, ["/etc/a.conf", "/etc/m.conf", "/etc/z.conf"]);
  }

  #[test]
  fn driver_merges_directories_into_a_global_graph() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    fs::write(left.path().join("app.conf"), "include \"db.conf\"\n").unwrap();
    fs::write(left.path().join("db.conf"), "x = 1\n").unwrap();
    fs::write(right.path().join("svc.yaml"), "image: redis:7.2\n").unwrap();

    let scan = scan_relationships(
      &[
        left.path().to_path_buf(),
        right.path().to_path_buf(),
        PathBuf::from("/nonexistent/weft/root"),
      ],
      100,
    );

    assert_eq!(scan.summary.directories_scanned, 2);
    assert_eq!(scan.summary.total_files_scanned, 3);
    assert_eq!(scan.summary.total_connections, 2);
    assert_eq!(scan.global_graph.stats.total_files, 2);
    assert_eq!(scan.global_graph.stats.total_connections, 2);
    assert_eq!(scan.summary.most_connected_files.len(), 2);
  }
}
