/*!
Registry - the authoritative record of all processes and windows.

All fields are private. Reads go through [`Tables`]; writes only happen by
applying a committed [`Transaction`]. This guarantees:
- Indexes are always updated
- Events are always emitted
- No window outlives its process

## Module Structure

- `mod.rs` - Registry struct, indexes, commit application
- `transaction.rs` - staged writes with read-your-writes semantics
*/

mod transaction;

pub(crate) use transaction::{Transaction, Writes};

use async_broadcast::Sender;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{Event, Process, ProcessId, Query, UserId, Window, WindowId};

/// Point and indexed range reads shared by the registry and open transactions.
pub(crate) trait Tables {
  fn process(&self, id: ProcessId) -> Option<Process>;
  fn window(&self, id: WindowId) -> Option<Window>;
  fn process_ids_for_user(&self, user: &UserId) -> BTreeSet<ProcessId>;
  fn window_ids_for_user(&self, user: &UserId) -> BTreeSet<WindowId>;
  fn window_ids_for_process(&self, process: ProcessId) -> BTreeSet<WindowId>;

  /// All of a user's processes, ordered by id.
  fn processes_for_user(&self, user: &UserId) -> Vec<Process> {
    self
      .process_ids_for_user(user)
      .into_iter()
      .filter_map(|id| self.process(id))
      .collect()
  }

  /// All of a user's windows, ordered by id.
  fn windows_for_user(&self, user: &UserId) -> Vec<Window> {
    self
      .window_ids_for_user(user)
      .into_iter()
      .filter_map(|id| self.window(id))
      .collect()
  }

  /// Highest stack order among the user's open windows.
  fn max_stack_order(&self, user: &UserId) -> Option<i64> {
    self
      .windows_for_user(user)
      .iter()
      .filter_map(|w| w.view_state.stack_order())
      .max()
  }

  /// All windows of one process, ordered by id.
  fn windows_for_process(&self, process: ProcessId) -> Vec<Window> {
    self
      .window_ids_for_process(process)
      .into_iter()
      .filter_map(|id| self.window(id))
      .collect()
  }
}

/// Keys touched by one commit. Used to decide which queries to re-run.
#[derive(Debug, Default)]
pub(crate) struct Touched {
  pub(crate) users: HashSet<UserId>,
  pub(crate) processes: HashSet<ProcessId>,
}

impl Touched {
  pub(crate) fn affects(&self, query: &Query) -> bool {
    match query {
      Query::Processes { user } | Query::Windows { user } | Query::ActiveWindow { user } => {
        self.users.contains(user)
      }
      Query::WindowsForProcess { process } => self.processes.contains(process),
    }
  }
}

/// Outcome of applying one transaction's writes.
///
/// The events are held back until [`Registry::broadcast`] so that the feed
/// never announces a commit the subscriptions have not seen yet.
#[derive(Debug)]
pub(crate) struct Commit {
  pub(crate) touched: Touched,
  pub(crate) events: Vec<Event>,
}

/// Internal state storage with automatic event emission.
pub(crate) struct Registry {
  // Event emission
  events_tx: Sender<Event>,

  // Primary tables
  processes: HashMap<ProcessId, Process>,
  windows: HashMap<WindowId, Window>,

  // Indexes
  processes_by_user: HashMap<UserId, BTreeSet<ProcessId>>,
  windows_by_user: HashMap<UserId, BTreeSet<WindowId>>,
  windows_by_process: HashMap<ProcessId, BTreeSet<WindowId>>,

  /// Bumped once per commit that changed anything.
  version: u64,
}

impl Registry {
  pub(crate) fn new(events_tx: Sender<Event>) -> Self {
    Self {
      events_tx,
      processes: HashMap::new(),
      windows: HashMap::new(),
      processes_by_user: HashMap::new(),
      windows_by_user: HashMap::new(),
      windows_by_process: HashMap::new(),
      version: 0,
    }
  }

  pub(crate) const fn version(&self) -> u64 {
    self.version
  }

  /// Emit an event.
  fn emit(&self, event: Event) {
    if let Err(e) = self.events_tx.try_broadcast(event) {
      if e.is_full() {
        log::error!(
          "Event channel overflow - events are being dropped. \
           Consider increasing event_channel_capacity or processing events faster."
        );
      }
    }
  }

  /// Emit a commit's events, ending with [`Event::Commit`].
  pub(crate) fn broadcast(&self, events: Vec<Event>) {
    for event in events {
      self.emit(event);
    }
  }

  /// Apply the staged writes of a finished transaction.
  ///
  /// Writes equal to the stored value are skipped. Returns `None` if nothing
  /// changed (no version bump, no events). Nothing is emitted here; the
  /// caller passes [`Commit::events`] to [`Registry::broadcast`].
  pub(crate) fn apply(&mut self, writes: Writes) -> Option<Commit> {
    let mut touched = Touched::default();
    let mut events = Vec::new();

    // Additions and updates first (processes before their windows), then
    // deletions (windows before their process).
    for (id, write) in &writes.processes {
      if let Some(process) = write {
        if let Some(event) = self.put_process(process.clone()) {
          touched.users.insert(process.user_id.clone());
          touched.processes.insert(*id);
          events.push(event);
        }
      }
    }
    for (id, write) in &writes.windows {
      match write {
        Some(window) => {
          if let Some(event) = self.put_window(window.clone()) {
            touched.users.insert(window.user_id.clone());
            touched.processes.insert(window.process_id);
            events.push(event);
          }
        }
        None => {
          if let Some(window) = self.delete_window(*id) {
            touched.users.insert(window.user_id);
            touched.processes.insert(window.process_id);
            events.push(Event::WindowRemoved { window_id: *id });
          }
        }
      }
    }
    for (id, write) in &writes.processes {
      if write.is_none() {
        if let Some(process) = self.delete_process(*id) {
          touched.users.insert(process.user_id);
          touched.processes.insert(*id);
          events.push(Event::ProcessRemoved { process_id: *id });
        }
      }
    }

    if events.is_empty() {
      return None;
    }

    self.version += 1;
    events.push(Event::Commit {
      version: self.version,
    });
    Some(Commit { touched, events })
  }

  fn put_process(&mut self, process: Process) -> Option<Event> {
    let id = process.id;
    match self.processes.get(&id) {
      Some(existing) if *existing == process => None,
      Some(_) => {
        self.processes.insert(id, process.clone());
        Some(Event::ProcessChanged { process })
      }
      None => {
        self
          .processes_by_user
          .entry(process.user_id.clone())
          .or_default()
          .insert(id);
        self.processes.insert(id, process.clone());
        Some(Event::ProcessAdded { process })
      }
    }
  }

  fn delete_process(&mut self, id: ProcessId) -> Option<Process> {
    let process = self.processes.remove(&id)?;
    remove_from_index(&mut self.processes_by_user, &process.user_id, &id);
    self.windows_by_process.remove(&id);
    Some(process)
  }

  fn put_window(&mut self, window: Window) -> Option<Event> {
    let id = window.id;
    match self.windows.get(&id) {
      Some(existing) if *existing == window => None,
      Some(_) => {
        self.windows.insert(id, window.clone());
        Some(Event::WindowChanged { window })
      }
      None => {
        self
          .windows_by_user
          .entry(window.user_id.clone())
          .or_default()
          .insert(id);
        self
          .windows_by_process
          .entry(window.process_id)
          .or_default()
          .insert(id);
        self.windows.insert(id, window.clone());
        Some(Event::WindowAdded { window })
      }
    }
  }

  fn delete_window(&mut self, id: WindowId) -> Option<Window> {
    let window = self.windows.remove(&id)?;
    remove_from_index(&mut self.windows_by_user, &window.user_id, &id);
    remove_from_index(&mut self.windows_by_process, &window.process_id, &id);
    Some(window)
  }
}

fn remove_from_index<K, V>(index: &mut HashMap<K, BTreeSet<V>>, key: &K, value: &V)
where
  K: std::hash::Hash + Eq,
  V: Ord,
{
  if let Some(set) = index.get_mut(key) {
    set.remove(value);
    if set.is_empty() {
      index.remove(key);
    }
  }
}

impl Tables for Registry {
  fn process(&self, id: ProcessId) -> Option<Process> {
    self.processes.get(&id).cloned()
  }

  fn window(&self, id: WindowId) -> Option<Window> {
    self.windows.get(&id).cloned()
  }

  fn process_ids_for_user(&self, user: &UserId) -> BTreeSet<ProcessId> {
    self.processes_by_user.get(user).cloned().unwrap_or_default()
  }

  fn window_ids_for_user(&self, user: &UserId) -> BTreeSet<WindowId> {
    self.windows_by_user.get(user).cloned().unwrap_or_default()
  }

  fn window_ids_for_process(&self, process: ProcessId) -> BTreeSet<WindowId> {
    self
      .windows_by_process
      .get(&process)
      .cloned()
      .unwrap_or_default()
  }
}
