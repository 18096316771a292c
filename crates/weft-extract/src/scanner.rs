//! Per-file reference scanning and budgeted directory walks.

use std::{
  collections::{BTreeMap, BTreeSet},
  fs,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;
use weft_core::{
  relation::RelationKind,
  scan::{DirectoryScan, FileConnections},
};

use crate::patterns::{REFERENCE_PATTERNS, SCAN_EXTENSIONS};

/// Default per-directory file budget.
pub const DEFAULT_FILE_BUDGET: usize = 1000;

/// Orphaned files are reported up to this many, for inspection rather than
/// exhaustively.
pub const ORPHAN_SAMPLE_LIMIT: usize = 20;

// ─── Single file ─────────────────────────────────────────────────────────────

/// Extract typed references from one file's content.
///
/// Best-effort: an unreadable file yields an empty map, never an error.
/// Binary content is read lossily; pattern matching over the garbled text
/// simply finds nothing. Relative captures are resolved against the
/// scanned file's directory.
pub fn scan_file(path: &Path) -> BTreeMap<RelationKind, BTreeSet<String>> {
  let bytes = match fs::read(path) {
    Ok(bytes) => bytes,
    Err(err) => {
      debug!(path = %path.display(), error = %err, "skipping unreadable file");
      return BTreeMap::new();
    }
  };
  scan_content(path, &String::from_utf8_lossy(&bytes))
}

fn scan_content(
  path: &Path,
  content: &str,
) -> BTreeMap<RelationKind, BTreeSet<String>> {
  let parent = path.parent().unwrap_or_else(|| Path::new("/"));
  let mut references: BTreeMap<RelationKind, BTreeSet<String>> =
    BTreeMap::new();

  for set in REFERENCE_PATTERNS.iter() {
    for pattern in &set.patterns {
      for caps in pattern.captures_iter(content) {
        let Some(capture) = caps.get(1) else { continue };
        let raw = capture.as_str();
        let resolved = if raw.starts_with('/') {
          raw.to_owned()
        } else {
          parent.join(raw).to_string_lossy().into_owned()
        };
        references
          .entry(set.kind.clone())
          .or_default()
          .insert(resolved);
      }
    }
  }

  references
}

// ─── Directory walk ──────────────────────────────────────────────────────────

/// Scan one root directory for file relationships, bounded by `max_files`.
///
/// Candidates are restricted to [`SCAN_EXTENSIONS`], and each extension
/// gets an equal share of the budget so a directory full of one type
/// cannot starve the others. The walk is sorted, so identical trees scan
/// identically.
pub fn scan_directory(root: &Path, max_files: usize) -> DirectoryScan {
  let mut scan = DirectoryScan {
    directory:      root.to_string_lossy().into_owned(),
    files_scanned:  0,
    connections:    BTreeMap::new(),
    file_types:     BTreeMap::new(),
    orphaned_files: Vec::new(),
  };

  let mut scanned_paths = Vec::new();
  for path in collect_candidates(root, max_files) {
    let Ok(meta) = fs::metadata(&path) else {
      // Inaccessible since the walk; skip and keep going.
      continue;
    };

    let path_str = path.to_string_lossy().into_owned();
    let references = scan_file(&path);
    if !references.is_empty() {
      scan.connections.insert(path_str.clone(), FileConnections {
        size: meta.len(),
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        references,
      });
    }

    let type_key = path
      .extension()
      .map(|ext| format!(".{}", ext.to_string_lossy()))
      .unwrap_or_else(|| "no_extension".to_owned());
    *scan.file_types.entry(type_key).or_insert(0) += 1;
    scan.files_scanned += 1;
    scanned_paths.push(path_str);
  }

  // Orphaned: scanned but never the target of any discovered reference.
  let targets: BTreeSet<&String> = scan
    .connections
    .values()
    .flat_map(|c| c.references.values())
    .flatten()
    .collect();
  scan.orphaned_files = scanned_paths
    .iter()
    .filter(|path| !targets.contains(path))
    .take(ORPHAN_SAMPLE_LIMIT)
    .cloned()
    .collect();

  scan
}

/// One sorted recursive walk, bucketed by extension with a per-extension
/// share of the budget, flattened in [`SCAN_EXTENSIONS`] order.
fn collect_candidates(root: &Path, max_files: usize) -> Vec<PathBuf> {
  let per_extension = (max_files / SCAN_EXTENSIONS.len()).max(1);
  let mut buckets: BTreeMap<&str, Vec<PathBuf>> =
    SCAN_EXTENSIONS.iter().map(|ext| (*ext, Vec::new())).collect();

  let walk = WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .filter_map(|entry| entry.ok());
  for entry in walk {
    if !entry.file_type().is_file() {
      continue;
    }
    let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
      continue;
    };
    if let Some(bucket) = buckets.get_mut(ext)
      && bucket.len() < per_extension
    {
      bucket.push(entry.into_path());
    }
  }

  let mut candidates: Vec<PathBuf> = SCAN_EXTENSIONS
    .iter()
    .flat_map(|ext| buckets.remove(*ext).unwrap_or_default())
    .collect();
  candidates.truncate(max_files);
  candidates
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  #[test]
  fn unreadable_file_yields_empty_references() {
    let refs = scan_file(Path::new("/nonexistent/weft/app.conf"));
    assert!(refs.is_empty());
  }

  #[test]
  fn relative_captures_resolve_against_the_file_directory() {
    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("app.conf");
    fs::write(&conf, "include \"db.conf\"\n").unwrap();

    let refs = scan_file(&conf);
    let includes = &refs[&RelationKind::ConfigInclude];
    let expected = dir.path().join("db.conf").to_string_lossy().into_owned();
    assert_eq!(includes.iter().collect::<Vec<_>>(), [&expected]);
  }

  #[test]
  fn absolute_captures_are_kept_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("app.conf");
    fs::write(&conf, "error_log \"/var/log/app.log\";\n").unwrap();

    let refs = scan_file(&conf);
    assert!(refs[&RelationKind::PathReference].contains("/var/log/app.log"));
  }

  #[test]
  fn binary_garbage_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("blob.conf");
    fs::write(&bin, [0u8, 159, 146, 150, 255, 0, 7]).unwrap();

    assert!(scan_file(&bin).is_empty());
  }

  #[test]
  fn scan_directory_reports_connections_and_orphans() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.conf"), "include \"db.conf\"\n").unwrap();
    fs::write(dir.path().join("db.conf"), "port = 5432\n").unwrap();

    let scan = scan_directory(dir.path(), 100);
    assert_eq!(scan.files_scanned, 2);
    assert_eq!(scan.connections.len(), 1);

    let app = dir.path().join("app.conf").to_string_lossy().into_owned();
    let db = dir.path().join("db.conf").to_string_lossy().into_owned();
    let entry = &scan.connections[&app];
    assert!(entry.references[&RelationKind::ConfigInclude].contains(&db));

    // db.conf is a reference target, so it is not orphaned; app.conf,
    // referenced by nothing, is.
    assert_eq!(scan.orphaned_files, [app]);
  }

  #[test]
  fn files_outside_the_allow_list_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.conf"), "x = 1\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "include \"a.conf\"\n").unwrap();
    fs::write(dir.path().join("README"), "plain\n").unwrap();

    let scan = scan_directory(dir.path(), 100);
    assert_eq!(scan.files_scanned, 1);
    assert_eq!(scan.file_types.get(".conf"), Some(&1));
    assert!(!scan.file_types.contains_key(".txt"));
  }

  #[test]
  fn budget_is_shared_per_extension() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..5 {
      fs::write(dir.path().join(format!("c{i}.conf")), "x\n").unwrap();
      fs::write(dir.path().join(format!("j{i}.json")), "{}\n").unwrap();
    }

    // Budget of 16 across 8 extensions: at most 2 files per extension.
    let scan = scan_directory(dir.path(), 16);
    assert_eq!(scan.files_scanned, 4);
    assert_eq!(scan.file_types.get(".conf"), Some(&2));
    assert_eq!(scan.file_types.get(".json"), Some(&2));
  }

  #[test]
  fn scans_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.conf"), "include \"b.conf\"\n").unwrap();
    fs::write(dir.path().join("b.conf"), "include \"c.conf\"\n").unwrap();
    fs::write(dir.path().join("c.conf"), "x = 1\n").unwrap();

    let first = scan_directory(dir.path(), 100);
    let second = scan_directory(dir.path(), 100);
    assert_eq!(
      serde_json::to_value(&first).unwrap(),
      serde_json::to_value(&second).unwrap()
    );
  }
}
