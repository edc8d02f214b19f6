/*!
Window state machine.

Transition planning as pure functions over one user's window list. Each
`plan_*` returns the windows whose record changes (already updated); an empty
plan means the transition does not apply and nothing is written.

The server applies plans inside a transaction after re-reading the user's
windows; clients run the same functions on their cached view to predict the
outcome of an operation before the server confirms it.
*/

use serde::Serialize;
use ts_rs::TS;

use crate::types::{Rect, ViewState, Window, WindowId};

/// Outcome of a state-machine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Transition {
  /// State changed.
  Applied,
  /// Nothing to do: already in the requested state, the window is in a state
  /// where the operation doesn't apply, or it no longer exists.
  Unchanged,
}

impl Transition {
  /// `Applied` if anything changed.
  pub const fn from_changed(changed: bool) -> Self {
    if changed {
      Transition::Applied
    } else {
      Transition::Unchanged
    }
  }

  /// Whether the operation committed a change.
  pub const fn is_applied(self) -> bool {
    matches!(self, Transition::Applied)
  }

  /// `Applied` if either step applied.
  #[must_use]
  pub const fn and(self, other: Transition) -> Transition {
    Transition::from_changed(self.is_applied() || other.is_applied())
  }
}

/// Next free stack order: one above the highest open window.
pub fn next_stack_order(windows: &[Window]) -> i64 {
  windows
    .iter()
    .filter_map(|w| w.view_state.stack_order())
    .max()
    .map_or(1, |max| max + 1)
}

/// The open, active window, if any.
pub fn active_window(windows: &[Window]) -> Option<&Window> {
  windows.iter().find(|w| w.is_active())
}

fn find(windows: &[Window], target: WindowId) -> Option<&Window> {
  windows.iter().find(|w| w.id == target)
}

fn with_view(window: &Window, view_state: ViewState) -> Window {
  Window {
    view_state,
    ..window.clone()
  }
}

/// Every active window other than `except`, flipped inactive.
fn deactivate_others(windows: &[Window], except: WindowId) -> Vec<Window> {
  windows
    .iter()
    .filter(|w| w.id != except)
    .filter_map(|w| match w.view_state {
      ViewState::Open {
        stack_order,
        is_active: true,
      } => Some(with_view(
        w,
        ViewState::Open {
          stack_order,
          is_active: false,
        },
      )),
      ViewState::Open { .. } | ViewState::Minimized | ViewState::Maximized { .. } => None,
    })
    .collect()
}

/// Make `target` the single active window. Open windows only.
pub fn plan_activate(windows: &[Window], target: WindowId) -> Vec<Window> {
  let Some(window) = find(windows, target) else {
    return Vec::new();
  };
  let ViewState::Open {
    stack_order,
    is_active,
  } = window.view_state
  else {
    return Vec::new();
  };

  let mut changes = deactivate_others(windows, target);
  if !is_active {
    changes.push(with_view(
      window,
      ViewState::Open {
        stack_order,
        is_active: true,
      },
    ));
  }
  changes
}

/// Give `target` a fresh stack order above every open window.
///
/// A window that is already strictly on top keeps its order.
pub fn plan_bring_to_front(windows: &[Window], target: WindowId) -> Vec<Window> {
  let Some(window) = find(windows, target) else {
    return Vec::new();
  };
  let ViewState::Open {
    stack_order,
    is_active,
  } = window.view_state
  else {
    return Vec::new();
  };

  if is_strictly_on_top(windows, target, stack_order) {
    return Vec::new();
  }
  vec![with_view(
    window,
    ViewState::Open {
      stack_order: next_stack_order(windows),
      is_active,
    },
  )]
}

/// Second half of focus: raise `target` once it has been activated.
///
/// If another focus won the race and `target` is no longer active, it is
/// left where it is so the winner stays on top. The exception is a window
/// still sharing its order with another (e.g. two fresh windows at order 0):
/// it gets a fresh order and the active window is lifted above it.
pub fn plan_raise_focused(windows: &[Window], target: WindowId) -> Vec<Window> {
  let Some(window) = find(windows, target) else {
    return Vec::new();
  };
  let ViewState::Open {
    stack_order,
    is_active,
  } = window.view_state
  else {
    return Vec::new();
  };

  if is_active {
    return plan_bring_to_front(windows, target);
  }

  let collides = windows
    .iter()
    .any(|w| w.id != target && w.view_state.stack_order() == Some(stack_order));
  if !collides {
    return Vec::new();
  }

  let fresh = next_stack_order(windows);
  let mut changes = vec![with_view(
    window,
    ViewState::Open {
      stack_order: fresh,
      is_active: false,
    },
  )];
  if let Some(active) = active_window(windows) {
    changes.push(with_view(
      active,
      ViewState::Open {
        stack_order: fresh + 1,
        is_active: true,
      },
    ));
  }
  changes
}

fn is_strictly_on_top(windows: &[Window], target: WindowId, stack_order: i64) -> bool {
  windows
    .iter()
    .filter(|w| w.id != target)
    .filter_map(|w| w.view_state.stack_order())
    .all(|other| other < stack_order)
}

/// Minimize an open window. Its stack order and activation are dropped.
pub fn plan_minimize(windows: &[Window], target: WindowId) -> Vec<Window> {
  match find(windows, target) {
    Some(window) if window.is_open() => vec![with_view(window, ViewState::Minimized)],
    Some(_) | None => Vec::new(),
  }
}

/// Bring a minimized or maximized window back to `open`, on top and active.
///
/// Leaving `maximized` re-applies the stored restore geometry.
pub fn plan_restore(windows: &[Window], target: WindowId) -> Vec<Window> {
  let Some(window) = find(windows, target) else {
    return Vec::new();
  };
  let rect = match window.view_state {
    ViewState::Open { .. } => return Vec::new(),
    ViewState::Minimized => window.rect,
    ViewState::Maximized { restore } => restore,
  };
  reopen(windows, window, rect)
}

/// Maximize an open window into `bounds`, or restore a maximized one.
pub fn plan_toggle_maximize(windows: &[Window], target: WindowId, bounds: Rect) -> Vec<Window> {
  let Some(window) = find(windows, target) else {
    return Vec::new();
  };
  match window.view_state {
    ViewState::Open { .. } => vec![Window {
      rect: bounds,
      view_state: ViewState::Maximized {
        restore: window.rect,
      },
      ..window.clone()
    }],
    ViewState::Maximized { restore } => reopen(windows, window, restore),
    ViewState::Minimized => Vec::new(),
  }
}

fn reopen(windows: &[Window], window: &Window, rect: Rect) -> Vec<Window> {
  let mut changes = deactivate_others(windows, window.id);
  changes.push(Window {
    rect,
    view_state: ViewState::Open {
      stack_order: next_stack_order(windows),
      is_active: true,
    },
    ..window.clone()
  });
  changes
}

/// Replace the geometry of an open window with a complete rectangle.
pub fn plan_update_geometry(windows: &[Window], target: WindowId, rect: Rect) -> Vec<Window> {
  match find(windows, target) {
    Some(window) if window.is_open() && window.rect != rect => vec![Window {
      rect,
      ..window.clone()
    }],
    Some(_) | None => Vec::new(),
  }
}

/// Deactivate the active window without activating another.
pub fn plan_deactivate(windows: &[Window]) -> Vec<Window> {
  match active_window(windows) {
    Some(active) => vec![with_view(
      active,
      ViewState::Open {
        stack_order: active.view_state.stack_order().unwrap_or_default(),
        is_active: false,
      },
    )],
    None => Vec::new(),
  }
}

/// Apply a plan to a window list, replacing changed records in place.
pub fn apply_plan(windows: &mut [Window], changes: Vec<Window>) {
  for change in changes {
    if let Some(slot) = windows.iter_mut().find(|w| w.id == change.id) {
      *slot = change;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ProcessId, UserId};

  fn window(id: u32, view_state: ViewState) -> Window {
    Window {
      id: WindowId(id),
      process_id: ProcessId(id),
      user_id: UserId::from("alice"),
      rect: Rect::new(10.0 * f64::from(id), 20.0, 400.0, 300.0),
      title: format!("Window {id}"),
      icon: None,
      view_state,
    }
  }

  fn open(id: u32, stack_order: i64, is_active: bool) -> Window {
    window(
      id,
      ViewState::Open {
        stack_order,
        is_active,
      },
    )
  }

  fn applied(mut windows: Vec<Window>, changes: Vec<Window>) -> Vec<Window> {
    apply_plan(&mut windows, changes);
    windows
  }

  fn view(windows: &[Window], id: u32) -> ViewState {
    windows
      .iter()
      .find(|w| w.id == WindowId(id))
      .map(|w| w.view_state)
      .unwrap()
  }

  mod activate {
    use super::*;

    #[test]
    fn flips_previous_active_window() {
      let windows = vec![open(1, 1, true), open(2, 2, false)];
      let after = applied(windows.clone(), plan_activate(&windows, WindowId(2)));

      assert_eq!(
        view(&after, 1),
        ViewState::Open {
          stack_order: 1,
          is_active: false
        },
        "previous window keeps its order"
      );
      assert!(view(&after, 2).is_active());
    }

    #[test]
    fn already_active_is_noop() {
      let windows = vec![open(1, 1, true), open(2, 2, false)];
      assert!(plan_activate(&windows, WindowId(1)).is_empty());
    }

    #[test]
    fn non_open_window_is_noop() {
      let windows = vec![open(1, 1, true), window(2, ViewState::Minimized)];
      assert!(plan_activate(&windows, WindowId(2)).is_empty());
    }

    #[test]
    fn missing_window_is_noop() {
      let windows = vec![open(1, 1, true)];
      assert!(plan_activate(&windows, WindowId(9)).is_empty());
    }
  }

  mod bring_to_front {
    use super::*;

    #[test]
    fn assigns_max_plus_one() {
      let windows = vec![open(1, 4, false), open(2, 7, true)];
      let changes = plan_bring_to_front(&windows, WindowId(1));
      assert_eq!(changes.len(), 1);
      assert_eq!(changes[0].view_state.stack_order(), Some(8));
      assert!(!changes[0].is_active(), "activation untouched");
    }

    #[test]
    fn already_on_top_is_noop() {
      let windows = vec![open(1, 4, false), open(2, 7, true)];
      assert!(plan_bring_to_front(&windows, WindowId(2)).is_empty());
    }

    #[test]
    fn tie_at_top_is_broken() {
      let windows = vec![open(1, 0, false), open(2, 0, false)];
      let changes = plan_bring_to_front(&windows, WindowId(2));
      assert_eq!(changes[0].view_state.stack_order(), Some(1));
    }
  }

  mod raise_focused {
    use super::*;

    #[test]
    fn superseded_window_stays_below_winner() {
      // A lost the race: B is active and raised already.
      let windows = vec![open(1, 3, false), open(2, 5, true)];
      assert!(plan_raise_focused(&windows, WindowId(1)).is_empty());
    }

    #[test]
    fn colliding_superseded_window_is_separated() {
      let windows = vec![open(1, 0, false), open(2, 0, true), open(3, 0, false)];
      let after = applied(windows.clone(), plan_raise_focused(&windows, WindowId(1)));

      assert_eq!(view(&after, 1).stack_order(), Some(1));
      assert_eq!(view(&after, 2).stack_order(), Some(2), "active stays on top");
      assert!(view(&after, 2).is_active());
    }
  }

  mod minimize_restore {
    use super::*;

    #[test]
    fn minimize_drops_order_and_activation() {
      let windows = vec![open(1, 3, true)];
      let after = applied(windows.clone(), plan_minimize(&windows, WindowId(1)));
      assert_eq!(view(&after, 1), ViewState::Minimized);
    }

    #[test]
    fn minimize_is_idempotent() {
      let windows = vec![window(1, ViewState::Minimized)];
      assert!(plan_minimize(&windows, WindowId(1)).is_empty());
    }

    #[test]
    fn minimize_ignores_maximized() {
      let windows = vec![window(
        1,
        ViewState::Maximized {
          restore: Rect::new(0.0, 0.0, 10.0, 10.0),
        },
      )];
      assert!(plan_minimize(&windows, WindowId(1)).is_empty());
    }

    #[test]
    fn restore_from_minimized_gets_fresh_top_order() {
      let windows = vec![window(1, ViewState::Minimized), open(2, 9, true)];
      let after = applied(windows.clone(), plan_restore(&windows, WindowId(1)));

      assert_eq!(
        view(&after, 1),
        ViewState::Open {
          stack_order: 10,
          is_active: true
        }
      );
      assert!(!view(&after, 2).is_active());
    }

    #[test]
    fn restore_open_window_is_noop() {
      let windows = vec![open(1, 1, false)];
      assert!(plan_restore(&windows, WindowId(1)).is_empty());
    }
  }

  mod toggle_maximize {
    use super::*;

    const DESKTOP: Rect = Rect::new(0.0, 0.0, 1280.0, 800.0);

    #[test]
    fn maximize_captures_restore_geometry() {
      let windows = vec![open(1, 1, true)];
      let before = windows[0].rect;
      let after = applied(
        windows.clone(),
        plan_toggle_maximize(&windows, WindowId(1), DESKTOP),
      );

      assert_eq!(after[0].rect, DESKTOP);
      assert_eq!(after[0].view_state, ViewState::Maximized { restore: before });
    }

    #[test]
    fn round_trip_restores_exact_rect() {
      let windows = vec![open(1, 1, true), open(2, 2, false)];
      let before = windows[0].rect;
      let maximized = applied(
        windows.clone(),
        plan_toggle_maximize(&windows, WindowId(1), DESKTOP),
      );
      let restored = applied(
        maximized.clone(),
        plan_toggle_maximize(&maximized, WindowId(1), DESKTOP),
      );

      assert_eq!(restored[0].rect, before);
      assert_eq!(
        restored[0].view_state,
        ViewState::Open {
          stack_order: 3,
          is_active: true
        }
      );
    }

    #[test]
    fn minimized_is_noop() {
      let windows = vec![window(1, ViewState::Minimized)];
      assert!(plan_toggle_maximize(&windows, WindowId(1), DESKTOP).is_empty());
    }
  }

  mod geometry {
    use super::*;

    #[test]
    fn open_window_takes_whole_rect() {
      let windows = vec![open(1, 1, true)];
      let rect = Rect::new(5.0, 6.0, 700.0, 500.0);
      let after = applied(
        windows.clone(),
        plan_update_geometry(&windows, WindowId(1), rect),
      );
      assert_eq!(after[0].rect, rect);
    }

    #[test]
    fn minimized_window_ignores_geometry() {
      let windows = vec![window(1, ViewState::Minimized)];
      let rect = Rect::new(5.0, 6.0, 700.0, 500.0);
      assert!(plan_update_geometry(&windows, WindowId(1), rect).is_empty());
    }
  }

  mod deactivate {
    use super::*;

    #[test]
    fn clears_active_without_replacement() {
      let windows = vec![open(1, 1, false), open(2, 2, true)];
      let after = applied(windows.clone(), plan_deactivate(&windows));
      assert!(active_window(&after).is_none());
      assert_eq!(view(&after, 2).stack_order(), Some(2));
    }

    #[test]
    fn nothing_active_is_noop() {
      let windows = vec![open(1, 1, false)];
      assert!(plan_deactivate(&windows).is_empty());
    }
  }
}
