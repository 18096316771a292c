//! Filesystem change observation: raw notification decoding, the
//! [`ChangeObserver`](observer::ChangeObserver) OS seam, and the polling
//! [`WatchSession`].
//!
//! Monitoring is a best-effort enhancement, never a hard dependency of the
//! rest of the system. When the OS channel cannot be opened, callers fall
//! back to [`WatchSession::disabled`], which always polls empty instead of
//! failing the host.

pub mod decode;
pub mod error;
pub mod observer;
pub mod ring;
pub mod session;

#[cfg(target_os = "linux")]
pub mod inotify;

pub use error::{Result, WatchError};
pub use session::WatchSession;
