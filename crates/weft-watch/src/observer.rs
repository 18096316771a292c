//! The [`ChangeObserver`] seam between the watch session and OS
//! notification APIs.
//!
//! One concrete implementation exists per target OS notification mechanism
//! (currently [`inotify`](crate::inotify) on Linux), plus [`NoopObserver`]
//! for the "monitoring unavailable" fallback. The session is generic over
//! this trait, so decoding and summarization stay OS-agnostic.

use std::{path::PathBuf, time::Duration};

use weft_core::event::ChangeEvent;

use crate::error::Result;

pub trait ChangeObserver {
  /// Open the underlying notification channel and register a watch on each
  /// directory. Returns the number of watches successfully registered;
  /// individual registration failures are skipped, only failure to open
  /// the channel itself is an error.
  fn start(&mut self, directories: &[PathBuf]) -> Result<usize>;

  /// Block up to `timeout` for new notifications and return the decoded
  /// events. A timeout is an empty list, not an error.
  fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>>;

  /// Release the channel and all watch state. Idempotent.
  fn stop(&mut self);
}

/// Observer for platforms or environments where no native notification
/// channel is available: registers nothing and always polls empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ChangeObserver for NoopObserver {
  fn start(&mut self, _directories: &[PathBuf]) -> Result<usize> { Ok(0) }

  fn poll(&mut self, _timeout: Duration) -> Result<Vec<ChangeEvent>> {
    Ok(Vec::new())
  }

  fn stop(&mut self) {}
}
