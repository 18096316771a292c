//! Static relationship extraction.
//!
//! Walks directory trees under a file-count budget, applies the built-in
//! reference pattern table to text-based files, and produces per-directory
//! and merged global dependency graphs (`weft_core::scan` types).
//!
//! Extraction is best-effort throughout: unreadable or binary-garbled
//! files yield empty reference sets and scanning continues. Results are
//! deterministic for identical input trees.

pub mod graph;
pub mod patterns;
pub mod scanner;

pub use graph::{build_dependency_graph, scan_relationships};
pub use scanner::{DEFAULT_FILE_BUDGET, scan_directory, scan_file};
