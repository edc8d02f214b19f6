/*! Window record and its view state. */

use super::{ProcessId, Rect, UserId, WindowId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// View state of a window.
///
/// Stack order and activation only exist while `Open`; minimizing drops them,
/// and returning to `Open` always assigns a fresh order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum ViewState {
  Open {
    #[serde(rename = "stackOrder")]
    stack_order: i64,
    #[serde(rename = "isActive")]
    is_active: bool,
  },
  Minimized,
  Maximized {
    /// Geometry to apply verbatim when leaving the maximized state.
    restore: Rect,
  },
}

impl ViewState {
  /// State of a freshly created window, before it is focused.
  pub const INITIAL: ViewState = ViewState::Open {
    stack_order: 0,
    is_active: false,
  };

  pub const fn is_open(&self) -> bool {
    matches!(self, ViewState::Open { .. })
  }

  /// True only for the open, active window.
  pub const fn is_active(&self) -> bool {
    matches!(
      self,
      ViewState::Open {
        is_active: true,
        ..
      }
    )
  }

  /// Stack order while open.
  pub const fn stack_order(&self) -> Option<i64> {
    match self {
      ViewState::Open { stack_order, .. } => Some(*stack_order),
      ViewState::Minimized | ViewState::Maximized { .. } => None,
    }
  }
}

/// An on-screen window owned by a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Window {
  pub id: WindowId,
  pub process_id: ProcessId,
  /// Copied from the owning process at creation; never changes.
  pub user_id: UserId,
  pub rect: Rect,
  pub title: String,
  pub icon: Option<String>,
  pub view_state: ViewState,
}

impl Window {
  pub const fn is_open(&self) -> bool {
    self.view_state.is_open()
  }

  pub const fn is_active(&self) -> bool {
    self.view_state.is_active()
  }
}
