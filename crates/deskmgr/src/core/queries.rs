/*!
Scoped reads and query evaluation.

Reads return owned snapshots of committed state. Explicit point reads report
`NotFound` to the caller; range reads of something that no longer exists are
simply empty.
*/

use super::Desk;
use crate::machine;
use crate::store::Tables;
use crate::types::{
  ActiveWindow, DeskError, DeskResult, Process, ProcessId, Query, QueryResult, UserId, Versioned,
  Window, WindowId,
};

/// Evaluate a query against committed (or staged) state.
pub(crate) fn evaluate(state: &impl Tables, query: &Query) -> QueryResult {
  match query {
    Query::Processes { user } => QueryResult::Processes(state.processes_for_user(user)),
    Query::Windows { user } => QueryResult::Windows(state.windows_for_user(user)),
    Query::WindowsForProcess { process } => {
      QueryResult::Windows(state.windows_for_process(*process))
    }
    Query::ActiveWindow { user } => QueryResult::ActiveWindow(active(state, user).map(Box::new)),
  }
}

/// The active window is derived from the window set on every read.
fn active(state: &impl Tables, user: &UserId) -> Option<ActiveWindow> {
  let windows = state.windows_for_user(user);
  let window = machine::active_window(&windows)?.clone();
  let process = state.process(window.process_id)?;
  Some(ActiveWindow { window, process })
}

impl Desk {
  /// All of the user's processes, ordered by id.
  pub fn list_processes(&self, user: &UserId) -> Vec<Process> {
    self.read(|s| s.processes_for_user(user))
  }

  /// All of the user's windows, ordered by id.
  pub fn list_windows(&self, user: &UserId) -> Vec<Window> {
    self.read(|s| s.windows_for_user(user))
  }

  /// Windows of one of the user's processes. Empty once the process closed.
  pub fn list_windows_for_process(
    &self,
    user: &UserId,
    process: ProcessId,
  ) -> DeskResult<Vec<Window>> {
    self.read(|s| match s.process(process) {
      Some(p) if p.user_id != *user => Err(DeskError::not_owner(user, format!("process {process}"))),
      Some(_) | None => Ok(s.windows_for_process(process)),
    })
  }

  /// The user's single active open window, joined with its process.
  pub fn find_active(&self, user: &UserId) -> Option<ActiveWindow> {
    self.read(|s| active(s, user))
  }

  /// Highest stack order among the user's open windows.
  pub fn max_stack_order(&self, user: &UserId) -> Option<i64> {
    self.read(|s| s.max_stack_order(user))
  }

  /// One of the caller's processes.
  pub fn process(&self, user: &UserId, id: ProcessId) -> DeskResult<Process> {
    let process = self
      .read(|s| s.process(id))
      .ok_or(DeskError::ProcessNotFound(id))?;
    if process.user_id != *user {
      return Err(DeskError::not_owner(user, format!("process {id}")));
    }
    Ok(process)
  }

  /// One of the caller's windows.
  pub fn window(&self, user: &UserId, id: WindowId) -> DeskResult<Window> {
    let window = self
      .read(|s| s.window(id))
      .ok_or(DeskError::WindowNotFound(id))?;
    if window.user_id != *user {
      return Err(DeskError::not_owner(user, format!("window {id}")));
    }
    Ok(window)
  }

  /// One-shot evaluation of a query, with the same access rules as
  /// [`subscribe`](Desk::subscribe).
  pub fn query(&self, caller: &UserId, query: &Query) -> DeskResult<Versioned<QueryResult>> {
    match query {
      Query::Processes { user } | Query::Windows { user } | Query::ActiveWindow { user }
        if user != caller =>
      {
        return Err(DeskError::not_owner(caller, format!("data of user {user}")));
      }
      Query::WindowsForProcess { process } => {
        self.list_windows_for_process(caller, *process)?;
      }
      Query::Processes { .. } | Query::Windows { .. } | Query::ActiveWindow { .. } => {}
    }
    Ok(self.read(|s| Versioned::new(s.version(), evaluate(s, query))))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ProcessProps, ProcessSpec};

  fn image(name: &str) -> ProcessSpec {
    ProcessSpec::new(ProcessProps::ImagePreview {
      file: crate::types::FileRef::new(name, name),
    })
  }

  #[test]
  fn point_reads_report_missing_records() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    assert_eq!(
      desk.process(&alice, ProcessId(u32::MAX)),
      Err(DeskError::ProcessNotFound(ProcessId(u32::MAX)))
    );
    assert_eq!(
      desk.window(&alice, WindowId(u32::MAX)),
      Err(DeskError::WindowNotFound(WindowId(u32::MAX)))
    );
  }

  #[test]
  fn point_reads_enforce_ownership() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    let id = desk.start(&bob, image("cat.png")).unwrap();

    assert!(matches!(
      desk.process(&alice, id),
      Err(DeskError::OwnershipViolation { .. })
    ));
    assert!(desk.process(&bob, id).is_ok());
  }

  #[test]
  fn lists_are_scoped_to_user() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    desk.start(&alice, image("a.png")).unwrap();
    desk.start(&alice, image("b.png")).unwrap();
    desk.start(&bob, image("c.png")).unwrap();

    assert_eq!(desk.list_processes(&alice).len(), 2);
    assert_eq!(desk.list_windows(&alice).len(), 2);
    assert_eq!(desk.list_windows(&bob).len(), 1);
  }

  #[test]
  fn active_window_is_joined_with_its_process() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    assert!(desk.find_active(&alice).is_none());

    let id = desk.start(&alice, image("a.png")).unwrap();
    let active = desk.find_active(&alice).unwrap();
    assert_eq!(active.process.id, id);
    assert_eq!(active.window.process_id, id);
  }

  #[test]
  fn one_shot_query_matches_subscription() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    desk.start(&alice, image("a.png")).unwrap();
    let query = Query::ActiveWindow { user: alice.clone() };

    let once = desk.query(&alice, &query).unwrap();
    let sub = desk.subscribe(&alice, query).unwrap();
    assert_eq!(once, sub.current());
  }
}
