//! Encoding between domain types and SQLite columns.
//!
//! Timestamps are RFC 3339 TEXT, except file mtimes, which are epoch-second
//! REALs to stay interchangeable with snapshot documents produced by
//! external scanners. Relationship kinds are stored as their discriminant
//! strings and edge metadata as compact JSON text.

use chrono::{DateTime, Utc};
use weft_core::{relation::RelationKind, store::NeighborEdge};

use crate::error::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|err| Error::DateParse(format!("{s:?}: {err}")))
}

pub fn encode_epoch(dt: DateTime<Utc>) -> f64 {
  dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6
}

pub fn decode_epoch(secs: f64) -> Option<DateTime<Utc>> {
  let whole = secs.floor();
  let nanos = ((secs - whole) * 1e9).round() as u32;
  DateTime::from_timestamp(whole as i64, nanos)
}

pub fn encode_metadata(
  metadata: Option<&serde_json::Value>,
) -> Result<Option<String>> {
  metadata
    .map(serde_json::to_string)
    .transpose()
    .map_err(Error::from)
}

pub fn decode_metadata(
  text: Option<String>,
) -> Result<Option<serde_json::Value>> {
  text
    .as_deref()
    .map(serde_json::from_str)
    .transpose()
    .map_err(Error::from)
}

/// Raw edge row, as selected with the far endpoint's path joined in.
pub struct RawNeighbor {
  pub path:     String,
  pub kind:     String,
  pub strength: f64,
  pub metadata: Option<String>,
}

impl RawNeighbor {
  pub fn into_edge(self) -> Result<NeighborEdge> {
    Ok(NeighborEdge {
      path:     self.path,
      kind:     RelationKind::parse(&self.kind),
      strength: self.strength,
      metadata: decode_metadata(self.metadata)?,
    })
  }
}
