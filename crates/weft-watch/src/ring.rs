//! Fixed-capacity ring of retained change events.
//!
//! A plain arena of slots plus a head index: insertion is O(1), once full
//! the oldest event is overwritten, and iteration walks oldest to newest.

use weft_core::event::ChangeEvent;

pub struct EventRing {
  slots: Vec<Option<ChangeEvent>>,
  head:  usize,
  len:   usize,
}

impl EventRing {
  pub fn new(capacity: usize) -> Self {
    Self { slots: vec![None; capacity.max(1)], head: 0, len: 0 }
  }

  pub fn capacity(&self) -> usize { self.slots.len() }

  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }

  pub fn push(&mut self, event: ChangeEvent) {
    let cap = self.slots.len();
    if self.len == cap {
      self.slots[self.head] = Some(event);
      self.head = (self.head + 1) % cap;
    } else {
      let tail = (self.head + self.len) % cap;
      self.slots[tail] = Some(event);
      self.len += 1;
    }
  }

  /// Retained events, oldest first.
  pub fn iter(&self) -> impl Iterator<Item = &ChangeEvent> {
    let cap = self.slots.len();
    (0..self.len)
      .filter_map(move |k| self.slots[(self.head + k) % cap].as_ref())
  }
}
