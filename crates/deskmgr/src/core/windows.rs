/*!
Window state machine operations.

Each operation is one transaction: re-read the caller's windows, plan the
transition with the pure functions in [`machine`](crate::machine), stage the
changed records. A window that vanished (closed concurrently) or is in a
state the operation doesn't apply to resolves to `Unchanged`; touching
another user's window is always an error.
*/

use super::Desk;
use crate::machine::{self, Transition};
use crate::store::{Tables, Transaction};
use crate::types::{
  DeskError, DeskResult, ProcessId, Rect, UserId, ViewState, Window, WindowId,
};

/// Geometry and chrome for a window opened on an existing process.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
  pub title: String,
  pub icon: Option<String>,
  pub rect: Rect,
}

impl Desk {
  /// Make the window the user's single active window.
  pub fn activate(&self, user: &UserId, id: WindowId) -> DeskResult<Transition> {
    self.transition(user, id, "activate", |windows| {
      machine::plan_activate(windows, id)
    })
  }

  /// Put the window above every other open window of the user.
  pub fn bring_to_front(&self, user: &UserId, id: WindowId) -> DeskResult<Transition> {
    self.transition(user, id, "bring_to_front", |windows| {
      machine::plan_bring_to_front(windows, id)
    })
  }

  /// Activate, then raise. Two transactions; the raise step yields to a
  /// focus that committed in between.
  pub fn focus(&self, user: &UserId, id: WindowId) -> DeskResult<Transition> {
    let activated = self.activate(user, id)?;
    let raised = self.transition(user, id, "focus", |windows| {
      machine::plan_raise_focused(windows, id)
    })?;
    Ok(activated.and(raised))
  }

  /// Minimize an open window. It loses its stack order and activation.
  pub fn minimize(&self, user: &UserId, id: WindowId) -> DeskResult<Transition> {
    self.transition(user, id, "minimize", |windows| {
      machine::plan_minimize(windows, id)
    })
  }

  /// Return a minimized or maximized window to `open`, active and on top.
  pub fn restore(&self, user: &UserId, id: WindowId) -> DeskResult<Transition> {
    self.transition(user, id, "restore", |windows| {
      machine::plan_restore(windows, id)
    })
  }

  /// Maximize into `bounds` (default: the configured desktop bounds), or
  /// restore a maximized window.
  pub fn toggle_maximize(
    &self,
    user: &UserId,
    id: WindowId,
    bounds: Option<Rect>,
  ) -> DeskResult<Transition> {
    let bounds = bounds.unwrap_or(self.config.desktop_bounds);
    self.transition(user, id, "toggle_maximize", |windows| {
      machine::plan_toggle_maximize(windows, id, bounds)
    })
  }

  /// Commit a complete rectangle for an open window.
  pub fn update_geometry(&self, user: &UserId, id: WindowId, rect: Rect) -> DeskResult<Transition> {
    self.transition(user, id, "update_geometry", |windows| {
      machine::plan_update_geometry(windows, id, rect)
    })
  }

  /// Clear the user's active window without activating another.
  pub fn deactivate_active(&self, user: &UserId) -> DeskResult<Transition> {
    self.transact(|tx| {
      let windows = tx.windows_for_user(user);
      Ok(stage(tx, machine::plan_deactivate(&windows)))
    })
  }

  /// Open an additional window on an existing process, then focus it.
  pub fn open_window(
    &self,
    user: &UserId,
    process: ProcessId,
    spec: WindowSpec,
  ) -> DeskResult<WindowId> {
    let id = self.transact(|tx| {
      let owner = tx
        .process(process)
        .ok_or(DeskError::ProcessNotFound(process))?
        .user_id;
      if owner != *user {
        return Err(DeskError::not_owner(user, format!("process {process}")));
      }
      let window = new_window(process, user, spec);
      let id = window.id;
      tx.put_window(window);
      Ok(id)
    })?;

    self.focus(user, id)?;
    Ok(id)
  }

  /// Shared shape of every single-window transition.
  fn transition(
    &self,
    user: &UserId,
    id: WindowId,
    op: &str,
    plan: impl FnOnce(&[Window]) -> Vec<Window>,
  ) -> DeskResult<Transition> {
    let outcome = self.transact(|tx| {
      let Some(window) = tx.window(id) else {
        log::debug!("{op}: window {id} no longer exists");
        return Ok(Transition::Unchanged);
      };
      if window.user_id != *user {
        return Err(DeskError::not_owner(user, format!("window {id}")));
      }
      let windows = tx.windows_for_user(user);
      Ok(stage(tx, plan(&windows)))
    });
    match &outcome {
      Ok(Transition::Unchanged) => log::debug!("{op}: window {id} unchanged"),
      Ok(Transition::Applied) => {}
      Err(e) => log::warn!("{op} rejected for {user}: {e}"),
    }
    outcome
  }
}

pub(super) fn new_window(process: ProcessId, user: &UserId, spec: WindowSpec) -> Window {
  Window {
    id: WindowId::new(),
    process_id: process,
    user_id: user.clone(),
    rect: spec.rect,
    title: spec.title,
    icon: spec.icon,
    view_state: ViewState::INITIAL,
  }
}

fn stage(tx: &mut Transaction<'_>, changes: Vec<Window>) -> Transition {
  let transition = Transition::from_changed(!changes.is_empty());
  for window in changes {
    tx.put_window(window);
  }
  transition
}
