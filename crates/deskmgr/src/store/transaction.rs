/*!
Transactions over the registry.

A transaction reads through its own staged writes (read-your-writes) and is
applied as one unit when the closure passed to `Desk::transact` returns `Ok`.
The registry lock is held exclusively for the whole transaction, so reads made
while deciding what to write can't be invalidated before the write lands.
*/

use std::collections::{BTreeMap, BTreeSet};

use super::{Registry, Tables};
use crate::types::{DeskError, DeskResult, Process, ProcessId, UserId, Window, WindowId};

/// Staged writes. `None` marks a deletion.
#[derive(Debug, Default)]
pub(crate) struct Writes {
  pub(crate) processes: BTreeMap<ProcessId, Option<Process>>,
  pub(crate) windows: BTreeMap<WindowId, Option<Window>>,
}

pub(crate) struct Transaction<'a> {
  base: &'a Registry,
  writes: Writes,
}

impl<'a> Transaction<'a> {
  pub(crate) fn new(base: &'a Registry) -> Self {
    Self {
      base,
      writes: Writes::default(),
    }
  }

  pub(crate) fn put_process(&mut self, process: Process) {
    self.writes.processes.insert(process.id, Some(process));
  }

  pub(crate) fn delete_process(&mut self, id: ProcessId) {
    self.writes.processes.insert(id, None);
  }

  pub(crate) fn put_window(&mut self, window: Window) {
    self.writes.windows.insert(window.id, Some(window));
  }

  pub(crate) fn delete_window(&mut self, id: WindowId) {
    self.writes.windows.insert(id, None);
  }

  /// Check referential integrity of the staged result.
  ///
  /// Every written window must belong to a live process of the same user, and
  /// a deleted process must not leave windows behind.
  pub(crate) fn validate(&self) -> DeskResult<()> {
    for window in self.writes.windows.values().flatten() {
      let Some(process) = self.process(window.process_id) else {
        return Err(DeskError::Internal(format!(
          "window {} references missing process {}",
          window.id, window.process_id
        )));
      };
      if process.user_id != window.user_id {
        return Err(DeskError::Internal(format!(
          "window {} and process {} disagree on owner",
          window.id, process.id
        )));
      }
    }

    for (id, write) in &self.writes.processes {
      if write.is_none() && !self.window_ids_for_process(*id).is_empty() {
        return Err(DeskError::Internal(format!(
          "process {id} deleted while it still has windows"
        )));
      }
    }
    Ok(())
  }

  pub(crate) fn into_writes(self) -> Writes {
    self.writes
  }
}

impl Tables for Transaction<'_> {
  fn process(&self, id: ProcessId) -> Option<Process> {
    match self.writes.processes.get(&id) {
      Some(staged) => staged.clone(),
      None => self.base.process(id),
    }
  }

  fn window(&self, id: WindowId) -> Option<Window> {
    match self.writes.windows.get(&id) {
      Some(staged) => staged.clone(),
      None => self.base.window(id),
    }
  }

  fn process_ids_for_user(&self, user: &UserId) -> BTreeSet<ProcessId> {
    let mut ids = self.base.process_ids_for_user(user);
    for (id, write) in &self.writes.processes {
      match write {
        Some(process) if process.user_id == *user => {
          ids.insert(*id);
        }
        Some(_) => {}
        None => {
          ids.remove(id);
        }
      }
    }
    ids
  }

  fn window_ids_for_user(&self, user: &UserId) -> BTreeSet<WindowId> {
    let mut ids = self.base.window_ids_for_user(user);
    for (id, write) in &self.writes.windows {
      match write {
        Some(window) if window.user_id == *user => {
          ids.insert(*id);
        }
        Some(_) => {}
        None => {
          ids.remove(id);
        }
      }
    }
    ids
  }

  fn window_ids_for_process(&self, process: ProcessId) -> BTreeSet<WindowId> {
    let mut ids = self.base.window_ids_for_process(process);
    for (id, write) in &self.writes.windows {
      match write {
        Some(window) if window.process_id == process => {
          ids.insert(*id);
        }
        Some(_) => {}
        None => {
          ids.remove(id);
        }
      }
    }
    ids
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Event, ProcessProps, Rect, ViewState};

  fn registry() -> (Registry, async_broadcast::Receiver<Event>) {
    let (tx, rx) = async_broadcast::broadcast(64);
    (Registry::new(tx), rx)
  }

  fn process(user: &str) -> Process {
    Process {
      id: ProcessId::new(),
      user_id: UserId::from(user),
      props: ProcessProps::TextPreview {
        file: None,
        text: String::new(),
      },
    }
  }

  fn window(process: &Process) -> Window {
    Window {
      id: WindowId::new(),
      process_id: process.id,
      user_id: process.user_id.clone(),
      rect: Rect::new(0.0, 0.0, 400.0, 300.0),
      title: "Window".to_owned(),
      icon: None,
      view_state: ViewState::INITIAL,
    }
  }

  #[test]
  fn staged_writes_are_visible_inside_transaction() {
    let (registry, _rx) = registry();
    let p = process("alice");
    let w = window(&p);

    let mut tx = Transaction::new(&registry);
    tx.put_process(p.clone());
    tx.put_window(w.clone());

    assert_eq!(tx.process(p.id), Some(p.clone()));
    assert_eq!(tx.windows_for_process(p.id), vec![w.clone()]);
    assert_eq!(tx.windows_for_user(&p.user_id), vec![w]);
    assert!(
      registry.process(p.id).is_none(),
      "registry unchanged before apply"
    );
  }

  #[test]
  fn apply_updates_indexes_and_bumps_version() {
    let (mut registry, _rx) = registry();
    let p = process("alice");
    let w = window(&p);

    let mut tx = Transaction::new(&registry);
    tx.put_process(p.clone());
    tx.put_window(w.clone());
    tx.validate().unwrap();
    let writes = tx.into_writes();
    let commit = registry.apply(writes).expect("changes applied");
    let touched = commit.touched;

    assert_eq!(registry.version(), 1);
    assert!(touched.users.contains(&p.user_id));
    assert!(touched.processes.contains(&p.id));
    assert_eq!(registry.windows_for_user(&p.user_id), vec![w]);
  }

  #[test]
  fn identical_writes_do_not_bump_version() {
    let (mut registry, _rx) = registry();
    let p = process("alice");

    let mut tx = Transaction::new(&registry);
    tx.put_process(p.clone());
    let writes = tx.into_writes();
    registry.apply(writes);

    let mut tx = Transaction::new(&registry);
    tx.put_process(p);
    let writes = tx.into_writes();
    assert!(registry.apply(writes).is_none(), "no-op write");
    assert_eq!(registry.version(), 1);
  }

  #[test]
  fn orphan_window_fails_validation() {
    let (registry, _rx) = registry();
    let p = process("alice");

    let mut tx = Transaction::new(&registry);
    tx.put_window(window(&p));
    assert!(matches!(tx.validate(), Err(DeskError::Internal(_))));
  }

  #[test]
  fn deleting_process_with_windows_fails_validation() {
    let (mut registry, _rx) = registry();
    let p = process("alice");
    let w = window(&p);

    let mut tx = Transaction::new(&registry);
    tx.put_process(p.clone());
    tx.put_window(w.clone());
    let writes = tx.into_writes();
    registry.apply(writes);

    let mut tx = Transaction::new(&registry);
    tx.delete_process(p.id);
    assert!(tx.validate().is_err());

    tx.delete_window(w.id);
    assert!(tx.validate().is_ok(), "cascade makes the delete valid");
  }

  #[test]
  fn apply_emits_events_in_order() {
    let (mut registry, mut rx) = registry();
    let p = process("alice");
    let w = window(&p);

    let mut tx = Transaction::new(&registry);
    tx.put_process(p);
    tx.put_window(w);
    let writes = tx.into_writes();
    let commit = registry.apply(writes).expect("changes applied");
    assert!(rx.try_recv().is_err(), "nothing emitted before broadcast");

    registry.broadcast(commit.events);
    assert!(matches!(rx.try_recv(), Ok(Event::ProcessAdded { .. })));
    assert!(matches!(rx.try_recv(), Ok(Event::WindowAdded { .. })));
    assert!(matches!(rx.try_recv(), Ok(Event::Commit { version: 1 })));
  }
}
