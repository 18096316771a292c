//! Relationship kinds and edge inputs.
//!
//! An edge is a typed, weighted, directed reference from one file to
//! another. The kind taxonomy is open: the extractor emits the four
//! built-in kinds, external scanners may supply their own.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ─── RelationKind ────────────────────────────────────────────────────────────

/// The kind of a discovered reference edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
  /// `include` / `source` / `@import` / `require` directives in config.
  ConfigInclude,
  /// A quoted absolute path literal.
  PathReference,
  /// A language-level import statement.
  LanguageImport,
  /// A container image, base-image, or volume directive.
  ContainerReference,
  /// An extractor- or scanner-defined kind outside the built-in taxonomy.
  Other(String),
}

impl RelationKind {
  /// The discriminant string stored in `relationships.relationship_type`.
  pub fn as_str(&self) -> &str {
    match self {
      Self::ConfigInclude => "config_include",
      Self::PathReference => "path_reference",
      Self::LanguageImport => "language_import",
      Self::ContainerReference => "container_reference",
      Self::Other(s) => s,
    }
  }

  /// Total inverse of [`as_str`](Self::as_str); unknown strings become
  /// [`RelationKind::Other`].
  pub fn parse(s: &str) -> Self {
    match s {
      "config_include" => Self::ConfigInclude,
      "path_reference" => Self::PathReference,
      "language_import" => Self::LanguageImport,
      "container_reference" => Self::ContainerReference,
      other => Self::Other(other.to_owned()),
    }
  }
}

impl std::fmt::Display for RelationKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for RelationKind {
  fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for RelationKind {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    let s = String::deserialize(de)?;
    Ok(Self::parse(&s))
  }
}

// ─── NewRelation ─────────────────────────────────────────────────────────────

/// Input to `KnowledgeStore::upsert_relation`. Both endpoints are upserted
/// as files if absent.
#[derive(Debug, Clone)]
pub struct NewRelation {
  pub source:   String,
  pub target:   String,
  pub kind:     RelationKind,
  /// Opaque caller-supplied weight; the core never computes it.
  pub strength: f64,
  pub metadata: Option<serde_json::Value>,
}

impl NewRelation {
  /// Convenience constructor with the default strength of 1.0.
  pub fn new(
    source: impl Into<String>,
    target: impl Into<String>,
    kind: RelationKind,
  ) -> Self {
    Self {
      source:   source.into(),
      target:   target.into(),
      kind,
      strength: 1.0,
      metadata: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_round_trips_through_strings() {
    for kind in [
      RelationKind::ConfigInclude,
      RelationKind::PathReference,
      RelationKind::LanguageImport,
      RelationKind::ContainerReference,
      RelationKind::Other("symlink".into()),
    ] {
      assert_eq!(RelationKind::parse(kind.as_str()), kind);
    }
  }

  #[test]
  fn kind_serializes_as_plain_string() {
    let json = serde_json::to_string(&RelationKind::ConfigInclude).unwrap();
    assert_eq!(json, "\"config_include\"");

    let back: RelationKind = serde_json::from_str("\"hardlink\"").unwrap();
    assert_eq!(back, RelationKind::Other("hardlink".into()));
  }

  #[test]
  fn new_relation_defaults_strength_to_one() {
    let rel =
      NewRelation::new("/etc/a.conf", "/etc/b.conf", RelationKind::ConfigInclude);
    assert_eq!(rel.strength, 1.0);
    assert!(rel.metadata.is_none());
  }
}
