//! The built-in reference pattern table.
//!
//! Fixed and not externally configurable: each relationship kind carries
//! one or more text patterns whose first capture group is the referenced
//! path (or module / image name). Application order follows table order so
//! results are reproducible.

use once_cell::sync::Lazy;
use regex::Regex;
use weft_core::relation::RelationKind;

/// Extensions eligible for scanning, in budget-allocation order.
pub const SCAN_EXTENSIONS: [&str; 8] =
  ["conf", "cfg", "yml", "yaml", "json", "py", "sh", "service"];

pub struct PatternSet {
  pub kind:     RelationKind,
  pub patterns: Vec<Regex>,
}

pub static REFERENCE_PATTERNS: Lazy<Vec<PatternSet>> = Lazy::new(|| {
  vec![
    // include / source / @import / require directives
    PatternSet {
      kind:     RelationKind::ConfigInclude,
      patterns: compile(&[
        r#"include\s+["']?([^"';\s]+)["']?"#,
        r#"source\s+["']?([^"';\s]+)["']?"#,
        r#"@import\s+["']?([^"';\s]+)["']?"#,
        r#"require\s+["']?([^"';\s]+)["']?"#,
      ]),
    },
    // quoted absolute path literals
    PatternSet {
      kind:     RelationKind::PathReference,
      patterns: compile(&[
        r#"["'](/[^"';\s]+\.[a-z]{2,4})["']"#,
        r#"["'](/[^"';\s]+\.conf)["']"#,
        r#"["'](/[^"';\s]+\.log)["']"#,
      ]),
    },
    // line-anchored import statements
    PatternSet {
      kind:     RelationKind::LanguageImport,
      patterns: compile(&[
        r"(?m)^from\s+([a-zA-Z_][a-zA-Z0-9_\.]*)\s+import",
        r"(?m)^import\s+([a-zA-Z_][a-zA-Z0-9_\.]*)",
      ]),
    },
    // container image / base image / volume directives
    PatternSet {
      kind:     RelationKind::ContainerReference,
      patterns: compile(&[
        r#"image:\s*["']?([^"':\s]+:[^"':\s]+)["']?"#,
        r"FROM\s+([^\s]+)",
        r#"volume:\s*["']?([^"':\s]+)["']?"#,
      ]),
    },
  ]
});

fn compile(sources: &[&str]) -> Vec<Regex> {
  sources
    .iter()
    .map(|src| Regex::new(src).expect("built-in pattern is valid"))
    .collect()
}
