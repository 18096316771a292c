//! Error type for `weft-watch`.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
  /// The OS change-notification mechanism could not be initialized, or no
  /// requested directory could be watched. Callers are expected to fall
  /// back to a disabled session rather than treat this as fatal.
  #[error("monitoring unavailable: {0}")]
  Unavailable(String),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

pub type Result<T, E = WatchError> = std::result::Result<T, E>;
