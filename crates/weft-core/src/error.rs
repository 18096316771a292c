//! Error types for `weft-core`.

use thiserror::Error;

/// Domain-level errors shared across backends; backend-specific failures
/// (database, I/O) live in the backend crates and wrap this with `#[from]`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  /// A query referenced a path the store has never seen.
  #[error("file not found: {0}")]
  FileNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
