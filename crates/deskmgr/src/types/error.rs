/*! Error types for deskmgr operations. */

use super::{ProcessId, ProcessKind, UserId, WindowId};

/// Errors that can occur during deskmgr operations.
///
/// Stale or no-op transitions are not errors; they resolve to
/// [`Transition::Unchanged`](crate::Transition::Unchanged).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeskError {
  #[error("Process not found: {0}")]
  ProcessNotFound(ProcessId),

  #[error("Window not found: {0}")]
  WindowNotFound(WindowId),

  #[error("User {user} does not own {target}")]
  OwnershipViolation { user: UserId, target: String },

  #[error("Props of kind {got:?} cannot be applied to a {expected:?} process")]
  KindMismatch {
    expected: ProcessKind,
    got: ProcessKind,
  },

  #[error("Upstream service failed: {0}")]
  Upstream(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl DeskError {
  pub(crate) fn not_owner(user: &UserId, target: impl std::fmt::Display) -> Self {
    DeskError::OwnershipViolation {
      user: user.clone(),
      target: target.to_string(),
    }
  }
}

/// Result type for deskmgr operations.
pub type DeskResult<T> = Result<T, DeskError>;
