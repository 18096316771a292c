//! Filesystem change events and windowed summaries.
//!
//! Events are produced by the watch layer from raw kernel notifications and
//! consumed either live (polling) or in aggregate (windowed summaries). The
//! summary's `recent_changes` entries use the same shape that snapshot
//! ingestion reads back out of `file_changes.recent_changes`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Change kinds ────────────────────────────────────────────────────────────

/// The fixed vocabulary of change kinds a kernel notification can carry.
/// One raw record may map to several kinds at once.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
  Accessed,
  Modified,
  AttributesChanged,
  ClosedWrite,
  ClosedNowrite,
  Opened,
  MovedFrom,
  MovedTo,
  Created,
  Deleted,
  DeletedSelf,
  MovedSelf,
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// One decoded filesystem change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub timestamp: DateTime<Utc>,
  /// The watched directory the event arrived on, or `"unknown"` if the
  /// kernel handle no longer maps to a registered watch.
  pub directory: String,
  /// Name relative to `directory`; absent for events on the directory
  /// itself (e.g. self-delete).
  pub filename:  Option<String>,
  /// `directory` joined with `filename`, or `directory` alone.
  pub path:      String,
  /// Zero or more recognized kinds decoded from the record's bitmask.
  /// Empty when the mask carried only unrecognized bits.
  #[serde(rename = "event_types")]
  pub kinds:     Vec<ChangeKind>,
  /// Kernel rename-correlation token pairing `moved_from`/`moved_to`.
  pub cookie:    u32,
}

// ─── Windowed summary ────────────────────────────────────────────────────────

/// A `{time, file, changes}` sample; also the shape snapshot ingestion
/// expects under `file_changes.recent_changes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentChange {
  pub time:    DateTime<Utc>,
  pub file:    String,
  pub changes: Vec<ChangeKind>,
}

/// Aggregate view of retained events within a trailing time window.
/// Derived from the in-memory ring only — it reflects what has been polled,
/// not ground truth since session start if the ring has wrapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSummary {
  pub period_minutes:       u32,
  pub total_events:         usize,
  pub files_changed:        BTreeSet<String>,
  pub directories_affected: BTreeSet<String>,
  pub event_breakdown:      BTreeMap<ChangeKind, u64>,
  /// At most the first 10 in-window events, oldest first.
  pub recent_changes:       Vec<RecentChange>,
}
