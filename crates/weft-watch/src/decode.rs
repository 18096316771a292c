//! Pure decoder for raw kernel change-notification buffers.
//!
//! The wire format is a sequence of fixed 16-byte headers (`i32` watch
//! handle, `u32` kind bitmask, `u32` rename cookie, `u32` name length) each
//! followed by `name length` bytes of NUL-padded name, in native
//! endianness. Decoding is a pure function of the buffer, the caller's
//! handle-to-directory map, and the caller's clock reading; it never
//! touches the OS.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use weft_core::event::{ChangeEvent, ChangeKind};

// ─── Kind bitmask ────────────────────────────────────────────────────────────

pub const IN_ACCESS: u32 = 0x0000_0001;
pub const IN_MODIFY: u32 = 0x0000_0002;
pub const IN_ATTRIB: u32 = 0x0000_0004;
pub const IN_CLOSE_WRITE: u32 = 0x0000_0008;
pub const IN_CLOSE_NOWRITE: u32 = 0x0000_0010;
pub const IN_OPEN: u32 = 0x0000_0020;
pub const IN_MOVED_FROM: u32 = 0x0000_0040;
pub const IN_MOVED_TO: u32 = 0x0000_0080;
pub const IN_CREATE: u32 = 0x0000_0100;
pub const IN_DELETE: u32 = 0x0000_0200;
pub const IN_DELETE_SELF: u32 = 0x0000_0400;
pub const IN_MOVE_SELF: u32 = 0x0000_0800;

/// Registration mask for new watches: creation, deletion, modification,
/// and the rename pair.
pub const DEFAULT_WATCH_MASK: u32 =
  IN_MODIFY | IN_CREATE | IN_DELETE | IN_MOVED_TO | IN_MOVED_FROM;

/// Sentinel directory for records whose watch handle is no longer (or was
/// never) registered.
pub const UNKNOWN_DIRECTORY: &str = "unknown";

const MASK_KINDS: [(u32, ChangeKind); 12] = [
  (IN_ACCESS, ChangeKind::Accessed),
  (IN_MODIFY, ChangeKind::Modified),
  (IN_ATTRIB, ChangeKind::AttributesChanged),
  (IN_CLOSE_WRITE, ChangeKind::ClosedWrite),
  (IN_CLOSE_NOWRITE, ChangeKind::ClosedNowrite),
  (IN_OPEN, ChangeKind::Opened),
  (IN_MOVED_FROM, ChangeKind::MovedFrom),
  (IN_MOVED_TO, ChangeKind::MovedTo),
  (IN_CREATE, ChangeKind::Created),
  (IN_DELETE, ChangeKind::Deleted),
  (IN_DELETE_SELF, ChangeKind::DeletedSelf),
  (IN_MOVE_SELF, ChangeKind::MovedSelf),
];

const HEADER_LEN: usize = 16;

/// Translate a record bitmask into symbolic kinds. Unrecognized bits are
/// ignored, so an unknown-only mask yields an empty list.
pub fn kinds_from_mask(mask: u32) -> Vec<ChangeKind> {
  MASK_KINDS
    .iter()
    .filter(|(bit, _)| mask & bit != 0)
    .map(|(_, kind)| *kind)
    .collect()
}

// ─── Decoding ────────────────────────────────────────────────────────────────

fn read_i32(buf: &[u8], at: usize) -> i32 {
  i32::from_ne_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
  u32::from_ne_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Decode every complete record in `buf` into structured events, all
/// stamped with `now`.
///
/// Defensive boundary conditions, neither of which aborts the batch: a
/// record whose declared name length overruns the buffer is skipped, and a
/// trailing partial header ends decoding. The output never holds more
/// events than the buffer holds complete headers.
pub fn decode_events(
  buf: &[u8],
  watches: &HashMap<i32, String>,
  now: DateTime<Utc>,
) -> Vec<ChangeEvent> {
  let mut events = Vec::new();
  let mut i = 0;

  while i + HEADER_LEN <= buf.len() {
    let wd = read_i32(buf, i);
    let mask = read_u32(buf, i + 4);
    let cookie = read_u32(buf, i + 8);
    let name_len = read_u32(buf, i + 12) as usize;

    let name_start = i + HEADER_LEN;
    let name_end = name_start.saturating_add(name_len);
    if name_end > buf.len() {
      debug!(wd, name_len, "skipping truncated notification record");
      i = name_end;
      continue;
    }

    let name_bytes = &buf[name_start..name_end];
    let trimmed = match name_bytes.iter().rposition(|&b| b != 0) {
      Some(last) => &name_bytes[..=last],
      None => &[],
    };
    let filename = (!trimmed.is_empty())
      .then(|| String::from_utf8_lossy(trimmed).into_owned());

    let directory = watches
      .get(&wd)
      .cloned()
      .unwrap_or_else(|| UNKNOWN_DIRECTORY.to_owned());
    let path = match &filename {
      Some(name) => format!("{}/{name}", directory.trim_end_matches('/')),
      None => directory.clone(),
    };

    events.push(ChangeEvent {
      timestamp: now,
      directory,
      filename,
      path,
      kinds: kinds_from_mask(mask),
      cookie,
    });

    i = name_end;
  }

  events
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(wd: i32, mask: u32, cookie: u32, name: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&wd.to_ne_bytes());
    buf.extend_from_slice(&mask.to_ne_bytes());
    buf.extend_from_slice(&cookie.to_ne_bytes());
    buf.extend_from_slice(&(name.len() as u32).to_ne_bytes());
    buf.extend_from_slice(name);
    buf
  }

  fn watches() -> HashMap<i32, String> {
    HashMap::from([(1, "/etc".to_owned()), (2, "/var/log".to_owned())])
  }

  #[test]
  fn decodes_record_with_padded_name() {
    let buf = record(1, IN_CREATE, 0, b"hosts\0\0\0");
    let events = decode_events(&buf, &watches(), Utc::now());

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].directory, "/etc");
    assert_eq!(events[0].filename.as_deref(), Some("hosts"));
    assert_eq!(events[0].path, "/etc/hosts");
    assert_eq!(events[0].kinds, vec![ChangeKind::Created]);
  }

  #[test]
  fn nameless_record_targets_the_directory_itself() {
    let buf = record(2, IN_DELETE_SELF, 0, b"");
    let events = decode_events(&buf, &watches(), Utc::now());

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].filename, None);
    assert_eq!(events[0].path, "/var/log");
    assert_eq!(events[0].kinds, vec![ChangeKind::DeletedSelf]);
  }

  #[test]
  fn stale_handle_resolves_to_unknown() {
    let buf = record(99, IN_MODIFY, 0, b"ghost\0");
    let events = decode_events(&buf, &watches(), Utc::now());

    assert_eq!(events[0].directory, UNKNOWN_DIRECTORY);
    assert_eq!(events[0].path, "unknown/ghost");
  }

  #[test]
  fn multi_bit_mask_yields_multiple_kinds() {
    let buf = record(1, IN_MODIFY | IN_ATTRIB, 0, b"passwd\0\0");
    let events = decode_events(&buf, &watches(), Utc::now());

    assert_eq!(
      events[0].kinds,
      vec![ChangeKind::Modified, ChangeKind::AttributesChanged]
    );
  }

  #[test]
  fn unrecognized_mask_bits_yield_empty_kinds() {
    // 0x8000 (IN_IGNORED) is outside the recognized vocabulary.
    let buf = record(1, 0x8000, 0, b"x\0");
    let events = decode_events(&buf, &watches(), Utc::now());

    assert_eq!(events.len(), 1);
    assert!(events[0].kinds.is_empty());
  }

  #[test]
  fn decodes_consecutive_records() {
    let mut buf = record(1, IN_MOVED_FROM, 7, b"old\0");
    buf.extend(record(1, IN_MOVED_TO, 7, b"new\0"));
    let events = decode_events(&buf, &watches(), Utc::now());

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].cookie, 7);
    assert_eq!(events[1].cookie, 7);
    assert_eq!(events[0].path, "/etc/old");
    assert_eq!(events[1].path, "/etc/new");
  }

  #[test]
  fn overrunning_name_length_skips_the_record() {
    let mut buf = record(1, IN_CREATE, 0, b"good\0\0\0\0");
    // Claims 64 name bytes but provides none.
    let mut bad = record(1, IN_DELETE, 0, &[]);
    bad[12..16].copy_from_slice(&64u32.to_ne_bytes());
    buf.extend(bad);

    let events = decode_events(&buf, &watches(), Utc::now());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path, "/etc/good");
  }

  #[test]
  fn trailing_partial_header_is_ignored() {
    let mut buf = record(1, IN_MODIFY, 0, b"ok\0\0");
    buf.extend_from_slice(&[0xff; 7]);

    let events = decode_events(&buf, &watches(), Utc::now());
    assert_eq!(events.len(), 1);
  }

  #[test]
  fn empty_buffer_decodes_to_nothing() {
    assert!(decode_events(&[], &watches(), Utc::now()).is_empty());
  }
}
