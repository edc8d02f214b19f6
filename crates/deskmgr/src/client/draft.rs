/*!
Debounced local edits.

A [`Draft`] is the local copy of one field the user edits at high frequency.
Edits change only the draft; [`poll`](Draft::poll) hands out the value to
commit once the user has been quiet for the configured delay. While edits are
pending, or before the store confirmed the last commit, authoritative values
for the field are ignored so they can't revert what the user is typing. An
echo equal to the draft is not a change, which breaks the
edit-commit-echo-edit loop.

Time is passed in by the caller, so the draft itself never sleeps.
*/

use std::time::{Duration, Instant};

/// A locally edited value committed once edits pause.
#[derive(Debug, Clone)]
pub struct Draft<T> {
  value: T,
  delay: Duration,
  /// Time of the last edit not yet handed out for commit.
  last_edit: Option<Instant>,
  /// A commit was handed out and not acknowledged yet.
  in_flight: bool,
  /// Deliveries older than this predate our last commit.
  acknowledged: u64,
}

impl<T: Clone + PartialEq> Draft<T> {
  pub const fn new(value: T, delay: Duration) -> Self {
    Self {
      value,
      delay,
      last_edit: None,
      in_flight: false,
      acknowledged: 0,
    }
  }

  /// Value to display.
  pub const fn value(&self) -> &T {
    &self.value
  }

  /// Uncommitted local changes exist.
  pub const fn is_dirty(&self) -> bool {
    self.last_edit.is_some() || self.in_flight
  }

  /// Local edit. Restarts the quiet period; an edit equal to the current
  /// value is ignored.
  pub fn edit(&mut self, value: T, now: Instant) -> bool {
    if value == self.value {
      return false;
    }
    self.value = value;
    self.last_edit = Some(now);
    true
  }

  /// Value to commit, once the quiet period since the last edit elapsed.
  pub fn poll(&mut self, now: Instant) -> Option<T> {
    let last_edit = self.last_edit?;
    if now.saturating_duration_since(last_edit) < self.delay {
      return None;
    }
    self.last_edit = None;
    self.in_flight = true;
    Some(self.value.clone())
  }

  /// When the pending commit becomes due, if any.
  pub fn deadline(&self) -> Option<Instant> {
    self.last_edit.map(|t| t + self.delay)
  }

  /// The commit handed out by `poll` landed at store `version`.
  pub fn acknowledge(&mut self, version: u64) {
    self.in_flight = false;
    self.acknowledged = self.acknowledged.max(version);
  }

  /// Authoritative value from the store. Applied only when the draft is
  /// clean and the delivery isn't older than our last commit. Returns whether
  /// the displayed value changed.
  pub fn receive(&mut self, version: u64, value: T) -> bool {
    if self.is_dirty() || version < self.acknowledged || value == self.value {
      return false;
    }
    self.value = value;
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DELAY: Duration = Duration::from_millis(500);

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  #[test]
  fn burst_commits_once_with_latest_value() {
    let t0 = Instant::now();
    let mut draft = Draft::new(String::new(), DELAY);

    draft.edit("a".into(), t0);
    draft.edit("ab".into(), t0 + ms(100));
    draft.edit("abc".into(), t0 + ms(200));

    assert_eq!(draft.poll(t0 + ms(600)), None, "still inside quiet period");
    assert_eq!(draft.poll(t0 + ms(700)), Some("abc".to_owned()));
    assert_eq!(draft.poll(t0 + ms(2000)), None, "committed once");
  }

  #[test]
  fn incoming_values_do_not_clobber_typing() {
    let t0 = Instant::now();
    let mut draft = Draft::new("x".to_owned(), DELAY);
    draft.edit("xy".into(), t0);

    assert!(!draft.receive(3, "x".into()));
    assert_eq!(draft.value(), "xy");
  }

  #[test]
  fn echo_of_commit_is_not_a_change() {
    let t0 = Instant::now();
    let mut draft = Draft::new(String::new(), DELAY);
    draft.edit("abc".into(), t0);
    draft.poll(t0 + DELAY).unwrap();
    draft.acknowledge(7);

    assert!(!draft.receive(7, "abc".into()));
    assert!(!draft.receive(6, "ab".into()), "older than our commit");
    assert_eq!(draft.value(), "abc");
    assert!(!draft.is_dirty());
  }

  #[test]
  fn remote_change_applies_when_quiet() {
    let mut draft = Draft::new("mine".to_owned(), DELAY);
    assert!(draft.receive(2, "theirs".into()));
    assert_eq!(draft.value(), "theirs");
  }

  #[test]
  fn edit_equal_to_value_does_not_schedule_commit() {
    let t0 = Instant::now();
    let mut draft = Draft::new("same".to_owned(), DELAY);
    assert!(!draft.edit("same".into(), t0));
    assert_eq!(draft.deadline(), None);
  }
}
