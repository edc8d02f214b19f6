/*!
Optimistic query cache.

A cache holds the last authoritative result of a query plus the intents the
user issued since. What the UI shows is the authoritative value with the
pending intents replayed on top. A newer authoritative delivery replaces the
whole thing and drops the intents; nothing is merged field by field.
*/

use std::fmt::Debug;

use crate::machine;
use crate::types::{Versioned, Window, WindowId};

/// A state that can predict the outcome of a user intent.
pub trait Predict: Clone {
  /// The user actions this state can predict.
  type Intent: Clone + Debug;

  /// Expected state after the server applies `intent`.
  #[must_use]
  fn predict(&self, intent: &Self::Intent) -> Self;
}

/// User actions on windows applied locally before the server confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
  /// Activate and raise a window.
  Focus(WindowId),
  /// Minimize a window.
  Minimize(WindowId),
  /// Clear the active window.
  Deactivate,
}

impl Predict for Vec<Window> {
  type Intent = Intent;

  fn predict(&self, intent: &Intent) -> Self {
    let mut next = self.clone();
    match *intent {
      Intent::Focus(id) => {
        let changes = machine::plan_activate(&next, id);
        machine::apply_plan(&mut next, changes);
        let changes = machine::plan_raise_focused(&next, id);
        machine::apply_plan(&mut next, changes);
      }
      Intent::Minimize(id) => {
        let changes = machine::plan_minimize(&next, id);
        machine::apply_plan(&mut next, changes);
      }
      Intent::Deactivate => {
        let changes = machine::plan_deactivate(&next);
        machine::apply_plan(&mut next, changes);
      }
    }
    next
  }
}

/// Last authoritative value of a query plus locally predicted intents.
#[derive(Debug, Clone)]
pub struct QueryCache<T: Predict> {
  authoritative: Versioned<T>,
  pending: Vec<T::Intent>,
}

impl<T: Predict> QueryCache<T> {
  /// Cache holding `initial` and no intents.
  pub const fn new(initial: Versioned<T>) -> Self {
    Self {
      authoritative: initial,
      pending: Vec::new(),
    }
  }

  /// Record an intent. It shows in [`view`](Self::view) until the next
  /// authoritative delivery.
  pub fn apply(&mut self, intent: T::Intent) {
    self.pending.push(intent);
  }

  /// Take an authoritative delivery. Returns `false` for anything not newer
  /// than what is already held.
  pub fn receive(&mut self, delivery: Versioned<T>) -> bool {
    if delivery.version <= self.authoritative.version {
      return false;
    }
    self.authoritative = delivery;
    self.pending.clear();
    true
  }

  /// What to display: the authoritative value with pending intents applied.
  pub fn view(&self) -> T {
    self
      .pending
      .iter()
      .fold(self.authoritative.value.clone(), |state, intent| {
        state.predict(intent)
      })
  }

  /// Withdraw the most recent intent. Earlier intents stay until a
  /// delivery replaces them.
  pub fn retract_last(&mut self) -> Option<T::Intent> {
    self.pending.pop()
  }

  /// Last authoritative delivery, without intents.
  pub const fn authoritative(&self) -> &Versioned<T> {
    &self.authoritative
  }

  /// Version of the last authoritative delivery.
  pub const fn version(&self) -> u64 {
    self.authoritative.version
  }

  /// Whether any intent is still awaiting a delivery.
  pub fn has_pending(&self) -> bool {
    !self.pending.is_empty()
  }
}
