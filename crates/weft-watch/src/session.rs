//! [`WatchSession`] — ownership of active watches, the retained event
//! ring, and per-kind counters.
//!
//! The session is single-threaded and cooperative: [`WatchSession::poll`]
//! is the only blocking operation (bounded by its timeout) and the caller
//! drives it from a loop. There is no background decoding thread.

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use tracing::debug;
use weft_core::event::{ChangeEvent, ChangeKind, ChangeSummary, RecentChange};

use crate::{
  error::{Result, WatchError},
  observer::{ChangeObserver, NoopObserver},
  ring::EventRing,
};

/// Default number of retained events.
pub const DEFAULT_RING_CAPACITY: usize = 1000;

/// Maximum number of `recent_changes` samples in a summary.
pub const SUMMARY_SAMPLE_LIMIT: usize = 10;

pub struct WatchSession<O> {
  observer: O,
  ring:     EventRing,
  counts:   BTreeMap<ChangeKind, u64>,
  active:   bool,
}

impl WatchSession<NoopObserver> {
  /// A session that is never active and always polls empty — the standard
  /// fallback when native monitoring is unavailable.
  pub fn disabled() -> Self { Self::new(NoopObserver) }
}

#[cfg(target_os = "linux")]
impl WatchSession<crate::inotify::InotifyObserver> {
  /// A session over the native Linux notification channel.
  pub fn native() -> Self { Self::new(crate::inotify::InotifyObserver::new()) }
}

impl<O: ChangeObserver> WatchSession<O> {
  pub fn new(observer: O) -> Self {
    Self::with_capacity(observer, DEFAULT_RING_CAPACITY)
  }

  pub fn with_capacity(observer: O, capacity: usize) -> Self {
    Self {
      observer,
      ring: EventRing::new(capacity),
      counts: BTreeMap::new(),
      active: false,
    }
  }

  /// Open the notification channel and register a watch on every existing
  /// directory in `directories`; nonexistent ones are skipped without
  /// error. Returns the number of watches registered, or
  /// [`WatchError::Unavailable`] if the channel cannot be opened or no
  /// directory could be watched.
  pub fn start(&mut self, directories: &[PathBuf]) -> Result<usize> {
    let existing: Vec<PathBuf> = directories
      .iter()
      .filter(|dir| {
        let exists = dir.exists();
        if !exists {
          debug!(directory = %dir.display(), "skipping nonexistent watch directory");
        }
        exists
      })
      .cloned()
      .collect();

    let registered = self.observer.start(&existing)?;
    if registered == 0 {
      self.observer.stop();
      return Err(WatchError::Unavailable(
        "no requested directory could be watched".into(),
      ));
    }

    self.active = true;
    Ok(registered)
  }

  pub fn is_active(&self) -> bool { self.active }

  /// Pull pending events, retaining them in the ring and updating the
  /// cumulative counters. Returns immediately-empty when the session has
  /// not been started, and an empty list on timeout.
  pub fn poll(&mut self, timeout: Duration) -> Result<Vec<ChangeEvent>> {
    if !self.active {
      return Ok(Vec::new());
    }

    let events = self.observer.poll(timeout)?;
    for event in &events {
      for kind in &event.kinds {
        *self.counts.entry(*kind).or_insert(0) += 1;
      }
      self.ring.push(event.clone());
    }
    Ok(events)
  }

  /// Aggregate the retained ring over the trailing `minutes` window. Reads
  /// only what has been polled so far; it never touches the OS channel.
  pub fn windowed_summary(&self, minutes: u32) -> ChangeSummary {
    self.summary_at(Utc::now(), minutes)
  }

  fn summary_at(&self, now: DateTime<Utc>, minutes: u32) -> ChangeSummary {
    let cutoff = now - chrono::Duration::minutes(i64::from(minutes));

    let mut summary = ChangeSummary {
      period_minutes:       minutes,
      total_events:         0,
      files_changed:        Default::default(),
      directories_affected: Default::default(),
      event_breakdown:      BTreeMap::new(),
      recent_changes:       Vec::new(),
    };

    for event in self.ring.iter().filter(|e| e.timestamp >= cutoff) {
      summary.total_events += 1;
      summary.files_changed.insert(event.path.clone());
      summary.directories_affected.insert(event.directory.clone());
      for kind in &event.kinds {
        *summary.event_breakdown.entry(*kind).or_insert(0) += 1;
      }
      if summary.recent_changes.len() < SUMMARY_SAMPLE_LIMIT {
        summary.recent_changes.push(RecentChange {
          time:    event.timestamp,
          file:    event.path.clone(),
          changes: event.kinds.clone(),
        });
      }
    }

    summary
  }

  /// Cumulative per-kind counters since the session was created. Unlike
  /// the ring these never wrap.
  pub fn event_counts(&self) -> &BTreeMap<ChangeKind, u64> { &self.counts }

  /// Release the channel and all watch state. Idempotent; an in-flight
  /// poll on another session handle is unaffected because sessions are
  /// exclusively owned.
  pub fn stop(&mut self) {
    self.observer.stop();
    self.active = false;
  }
}

#[cfg(test)]
mod tests {
  use std::collections::VecDeque;

  use super::*;

  /// Replays pre-scripted event batches; one batch per poll.
  struct ScriptedObserver {
    batches: VecDeque<Vec<ChangeEvent>>,
  }

  impl ScriptedObserver {
    fn new(batches: Vec<Vec<ChangeEvent>>) -> Self {
      Self { batches: batches.into() }
    }
  }

  impl ChangeObserver for ScriptedObserver {
    fn start(&mut self, directories: &[PathBuf]) -> Result<usize> {
      Ok(directories.len())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Vec<ChangeEvent>> {
      Ok(self.batches.pop_front().unwrap_or_default())
    }

    fn stop(&mut self) {}
  }

  fn event(path: &str, kinds: Vec<ChangeKind>, age_minutes: i64) -> ChangeEvent {
    let directory = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("/");
    ChangeEvent {
      timestamp: Utc::now() - chrono::Duration::minutes(age_minutes),
      directory: directory.to_owned(),
      filename:  path.rsplit('/').next().map(str::to_owned),
      path:      path.to_owned(),
      kinds,
      cookie:    0,
    }
  }

  fn started_session(batches: Vec<Vec<ChangeEvent>>) -> WatchSession<ScriptedObserver> {
    let dir = std::env::temp_dir();
    let mut session = WatchSession::new(ScriptedObserver::new(batches));
    session.start(&[dir]).unwrap();
    session
  }

  #[test]
  fn poll_before_start_is_empty_and_does_not_block() {
    let mut session =
      WatchSession::new(ScriptedObserver::new(vec![vec![event(
        "/etc/hosts",
        vec![ChangeKind::Modified],
        0,
      )]]));

    let events = session.poll(Duration::from_secs(3600)).unwrap();
    assert!(events.is_empty());
    assert!(!session.is_active());
  }

  #[test]
  fn start_with_only_missing_directories_is_unavailable() {
    let mut session = WatchSession::new(ScriptedObserver::new(vec![]));
    let result =
      session.start(&[PathBuf::from("/nonexistent/weft/session/dir")]);
    assert!(matches!(result, Err(WatchError::Unavailable(_))));
    assert!(!session.is_active());
  }

  #[test]
  fn disabled_session_polls_empty() {
    let mut session = WatchSession::disabled();
    let events = session.poll(Duration::from_millis(5)).unwrap();
    assert!(events.is_empty());
  }

  #[test]
  fn poll_retains_events_and_counts_kinds() {
    let mut session = started_session(vec![
      vec![
        event("/etc/hosts", vec![ChangeKind::Modified], 0),
        event("/etc/passwd", vec![ChangeKind::Modified, ChangeKind::AttributesChanged], 0),
      ],
      vec![event("/etc/hosts", vec![ChangeKind::Deleted], 0)],
    ]);

    let first = session.poll(Duration::from_millis(1)).unwrap();
    assert_eq!(first.len(), 2);
    let second = session.poll(Duration::from_millis(1)).unwrap();
    assert_eq!(second.len(), 1);

    assert_eq!(session.event_counts()[&ChangeKind::Modified], 2);
    assert_eq!(session.event_counts()[&ChangeKind::AttributesChanged], 1);
    assert_eq!(session.event_counts()[&ChangeKind::Deleted], 1);
  }

  #[test]
  fn windowed_summary_filters_to_the_trailing_window() {
    // Events spread across ten minutes; only the trailing five count.
    let mut session = started_session(vec![vec![
      event("/etc/old.conf", vec![ChangeKind::Modified], 9),
      event("/etc/older.conf", vec![ChangeKind::Deleted], 7),
      event("/etc/recent.conf", vec![ChangeKind::Modified], 3),
      event("/var/log/app.log", vec![ChangeKind::Created], 1),
    ]]);
    session.poll(Duration::from_millis(1)).unwrap();

    let summary = session.windowed_summary(5);
    assert_eq!(summary.total_events, 2);
    assert!(summary.files_changed.contains("/etc/recent.conf"));
    assert!(summary.files_changed.contains("/var/log/app.log"));
    assert!(!summary.files_changed.contains("/etc/old.conf"));
    assert_eq!(summary.directories_affected.len(), 2);
    assert_eq!(summary.event_breakdown[&ChangeKind::Modified], 1);
    assert_eq!(summary.event_breakdown[&ChangeKind::Created], 1);
    assert_eq!(summary.recent_changes.len(), 2);
  }

  #[test]
  fn summary_sample_is_bounded_to_ten() {
    let batch: Vec<ChangeEvent> = (0..25)
      .map(|i| event(&format!("/etc/f{i}.conf"), vec![ChangeKind::Modified], 0))
      .collect();
    let mut session = started_session(vec![batch]);
    session.poll(Duration::from_millis(1)).unwrap();

    let summary = session.windowed_summary(5);
    assert_eq!(summary.total_events, 25);
    assert_eq!(summary.recent_changes.len(), SUMMARY_SAMPLE_LIMIT);
  }

  #[test]
  fn summary_reflects_only_the_retained_ring() {
    let batch: Vec<ChangeEvent> = (0..6)
      .map(|i| event(&format!("/etc/f{i}.conf"), vec![ChangeKind::Modified], 0))
      .collect();
    let dir = std::env::temp_dir();
    let mut session =
      WatchSession::with_capacity(ScriptedObserver::new(vec![batch]), 4);
    session.start(&[dir]).unwrap();
    session.poll(Duration::from_millis(1)).unwrap();

    // The ring wrapped: only the newest four events remain visible.
    let summary = session.windowed_summary(5);
    assert_eq!(summary.total_events, 4);
    assert!(!summary.files_changed.contains("/etc/f0.conf"));
    assert!(summary.files_changed.contains("/etc/f5.conf"));
  }

  #[test]
  fn stop_deactivates_and_is_idempotent() {
    let mut session = started_session(vec![]);
    session.stop();
    session.stop();
    assert!(!session.is_active());
    assert!(session.poll(Duration::from_millis(1)).unwrap().is_empty());
  }
}
