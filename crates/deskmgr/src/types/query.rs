/*! Named read queries and their result sets. */

use super::{Process, ProcessId, UserId, Window};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A read query clients can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "query", rename_all = "snake_case")]
#[ts(export)]
pub enum Query {
  /// All processes owned by a user.
  Processes { user: UserId },
  /// All windows owned by a user.
  Windows { user: UserId },
  /// All windows owned by one process.
  WindowsForProcess { process: ProcessId },
  /// The user's active open window, joined with its process.
  ActiveWindow { user: UserId },
}

/// The active window together with its owning process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActiveWindow {
  pub window: Window,
  pub process: Process,
}

/// Result set of a [`Query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum QueryResult {
  Processes(Vec<Process>),
  Windows(Vec<Window>),
  ActiveWindow(Option<Box<ActiveWindow>>),
}

impl QueryResult {
  pub fn windows(&self) -> Option<&[Window]> {
    match self {
      QueryResult::Windows(windows) => Some(windows),
      QueryResult::Processes(_) | QueryResult::ActiveWindow(_) => None,
    }
  }

  pub fn processes(&self) -> Option<&[Process]> {
    match self {
      QueryResult::Processes(processes) => Some(processes),
      QueryResult::Windows(_) | QueryResult::ActiveWindow(_) => None,
    }
  }
}

/// A value stamped with the store version it was read at.
///
/// Versions only grow, so a consumer can drop anything older than what it
/// already holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Versioned<T> {
  pub version: u64,
  pub value: T,
}

impl<T> Versioned<T> {
  pub const fn new(version: u64, value: T) -> Self {
    Self { version, value }
  }
}
