//! Folding extractor results and snapshot documents into the graph.
//!
//! Snapshot documents come from external scanners as well as the in-process
//! extractor, so the document walk is deliberately tolerant: only the
//! `file_relationships` and `file_changes` sections are inspected, missing
//! or oddly-shaped keys are skipped, and unknown top-level keys ride along
//! inside the stored snapshot untouched.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;
use weft_core::{
  file::NewFile,
  relation::{NewRelation, RelationKind},
  scan::RelationshipScan,
  store::{IngestReport, KnowledgeStore, ScanIngest},
};

use crate::{encode::decode_epoch, error::Result, store::SqliteStore};

pub(crate) fn ingest_scan(
  store: &SqliteStore,
  scan: &RelationshipScan,
) -> Result<ScanIngest> {
  let mut counts = ScanIngest::default();
  for directory in scan.directories.values() {
    for (source, data) in &directory.connections {
      store.upsert_file(&NewFile {
        path: source.clone(),
        file_type: None,
        size: i64::try_from(data.size).ok(),
        mtime: data.modified,
        hash: None,
      })?;
      counts.files += 1;

      for (kind, targets) in &data.references {
        for target in targets {
          store.upsert_relation(&NewRelation::new(
            source.as_str(),
            target.as_str(),
            kind.clone(),
          ))?;
          counts.relationships += 1;
        }
      }
    }
  }
  Ok(counts)
}

pub(crate) fn ingest_snapshot(
  store: &SqliteStore,
  document: &Value,
) -> Result<IngestReport> {
  let mut report = IngestReport::default();

  // A snapshot-storage failure downgrades to a warning; the graph sections
  // are still ingested.
  match store.store_snapshot(document) {
    Ok(id) => {
      report.snapshot_id = Some(id);
      report.snapshot_stored = true;
    }
    Err(err) => {
      warn!(error = %err, "failed to store snapshot document");
    }
  }

  if let Some(section) = document.get("file_relationships") {
    ingest_relationship_section(store, section, &mut report)?;
  }
  if let Some(changes) = document
    .pointer("/file_changes/recent_changes")
    .and_then(Value::as_array)
  {
    ingest_recent_changes(store, changes, &mut report)?;
  }

  Ok(report)
}

fn ingest_relationship_section(
  store: &SqliteStore,
  section: &Value,
  report: &mut IngestReport,
) -> Result<()> {
  let Some(directories) =
    section.get("directories").and_then(Value::as_object)
  else {
    return Ok(());
  };

  for directory in directories.values() {
    let Some(connections) =
      directory.get("connections").and_then(Value::as_object)
    else {
      continue;
    };

    for (source, data) in connections {
      store.upsert_file(&NewFile {
        path: source.clone(),
        file_type: None,
        size: data.get("size").and_then(Value::as_i64),
        mtime: data.get("modified").and_then(parse_modified),
        hash: None,
      })?;
      report.files += 1;

      let Some(references) =
        data.get("references").and_then(Value::as_object)
      else {
        continue;
      };
      for (kind, targets) in references {
        let Some(targets) = targets.as_array() else { continue };
        for target in targets.iter().filter_map(Value::as_str) {
          store.upsert_relation(&NewRelation::new(
            source.as_str(),
            target,
            RelationKind::parse(kind),
          ))?;
          report.relationships += 1;
        }
      }
    }
  }
  Ok(())
}

fn ingest_recent_changes(
  store: &SqliteStore,
  changes: &[Value],
  report: &mut IngestReport,
) -> Result<()> {
  for change in changes {
    let Some(file) = change.get("file").and_then(Value::as_str) else {
      continue;
    };
    let kinds: Vec<&str> = change
      .get("changes")
      .and_then(Value::as_array)
      .map(|kinds| kinds.iter().filter_map(Value::as_str).collect())
      .unwrap_or_default();
    let time = change
      .get("time")
      .and_then(Value::as_str)
      .map(str::to_owned)
      .unwrap_or_else(|| Utc::now().to_rfc3339());

    store.record_change(file, &kinds.join(","), None, Some(file), &time)?;
    report.changes_recorded += 1;
  }
  Ok(())
}

/// Modification times arrive either as epoch-second numbers (external
/// scanners) or RFC 3339 strings (our own serialized scans).
fn parse_modified(value: &Value) -> Option<DateTime<Utc>> {
  match value {
    Value::Number(n) => n.as_f64().and_then(decode_epoch),
    Value::String(s) => DateTime::parse_from_rfc3339(s)
      .ok()
      .map(|dt| dt.with_timezone(&Utc)),
    _ => None,
  }
}
