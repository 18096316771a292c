//! Linux inotify implementation of [`ChangeObserver`].
//!
//! Talks to the kernel directly: `inotify_init1` opens the channel,
//! `inotify_add_watch` registers one watch per directory, `poll(2)` bounds
//! the wait, and `read(2)` fills the raw buffer handed to the pure decoder.

use std::{
  collections::HashMap, ffi::CString, io, os::unix::ffi::OsStrExt as _,
  path::{Path, PathBuf}, time::Duration,
};

use chrono::Utc;
use tracing::warn;
use weft_core::event::ChangeEvent;

use crate::{
  decode::{DEFAULT_WATCH_MASK, decode_events},
  error::{Result, WatchError},
  observer::ChangeObserver,
};

/// Matches the kernel's minimum sensible read size for one batch; the
/// decoder handles a record truncated at this boundary.
const READ_BUF_LEN: usize = 4096;

pub struct InotifyObserver {
  fd:      Option<i32>,
  mask:    u32,
  watches: HashMap<i32, String>,
}

impl InotifyObserver {
  pub fn new() -> Self { Self::with_mask(DEFAULT_WATCH_MASK) }

  /// Observer with a caller-chosen registration bitmask instead of
  /// [`DEFAULT_WATCH_MASK`].
  pub fn with_mask(mask: u32) -> Self {
    Self { fd: None, mask, watches: HashMap::new() }
  }

  /// The handle-to-directory table for currently registered watches.
  pub fn watches(&self) -> &HashMap<i32, String> { &self.watches }

  fn add_watch(&mut self, fd: i32, directory: &Path) -> bool {
    let Ok(c_path) = CString::new(directory.as_os_str().as_bytes()) else {
      warn!(directory = %directory.display(), "path contains NUL; not watchable");
      return false;
    };

    let wd = unsafe { libc::inotify_add_watch(fd, c_path.as_ptr(), self.mask) };
    if wd < 0 {
      warn!(
        directory = %directory.display(),
        error = %io::Error::last_os_error(),
        "failed to register watch"
      );
      return false;
    }

    self
      .watches
      .insert(wd, directory.to_string_lossy().into_owned());
    true
  }
}

impl Default for InotifyObserver {
  fn default() -> Self { Self::new() }
}

impl ChangeObserver for InotifyObserver {
  fn start(&mut self, directories: &[PathBuf]) -> Result<usize> {
    self.stop();

    let fd = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
    if fd < 0 {
      return Err(WatchError::Unavailable(
        io::Error::last_os_error().to_string(),
      ));
    }
    self.fd = Some(fd);

    let mut registered = 0;
    for directory in directories {
      if self.add_watch(fd, directory) {
        registered += 1;
      }
    }
    Ok(registered)
  }

  fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
    let Some(fd) = self.fd else {
      return Ok(Vec::new());
    };

    let mut pfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

    let ready = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if ready < 0 {
      let err = io::Error::last_os_error();
      if err.kind() == io::ErrorKind::Interrupted {
        return Ok(Vec::new());
      }
      return Err(WatchError::Io(err));
    }
    if ready == 0 || pfd.revents & libc::POLLIN == 0 {
      // Timed out, or the channel was closed under an in-flight poll.
      return Ok(Vec::new());
    }

    let mut buf = [0u8; READ_BUF_LEN];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), READ_BUF_LEN) };
    if n < 0 {
      let err = io::Error::last_os_error();
      if matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
      ) {
        return Ok(Vec::new());
      }
      return Err(WatchError::Io(err));
    }

    Ok(decode_events(&buf[..n as usize], &self.watches, Utc::now()))
  }

  fn stop(&mut self) {
    if let Some(fd) = self.fd.take() {
      for wd in self.watches.keys() {
        unsafe { libc::inotify_rm_watch(fd, *wd) };
      }
      unsafe { libc::close(fd) };
    }
    self.watches.clear();
  }
}

impl Drop for InotifyObserver {
  fn drop(&mut self) { self.stop(); }
}
