/*! Branded ID types for type-safe entity references. */

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use ts_rs::TS;

/// Opaque identity of the user issuing an operation.
///
/// Authentication happens elsewhere; every operation receives the caller's
/// identity as an already-trusted value.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, Display, From, Into,
)]
#[ts(export)]
pub struct UserId(pub String);

impl From<&str> for UserId {
  fn from(value: &str) -> Self {
    Self(value.to_owned())
  }
}

/// Process identifier.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  TS,
  Display,
  From,
  Into,
)]
#[ts(export)]
pub struct ProcessId(pub u32);

/// Window identifier.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  TS,
  Display,
  From,
  Into,
)]
#[ts(export)]
pub struct WindowId(pub u32);

/// Global counters for id generation. Start at 1 (0 could be confused with "null").
static PROCESS_COUNTER: AtomicU32 = AtomicU32::new(1);
static WINDOW_COUNTER: AtomicU32 = AtomicU32::new(1);

impl ProcessId {
  /// Generate a new unique `ProcessId`.
  pub fn new() -> Self {
    Self(PROCESS_COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

impl Default for ProcessId {
  fn default() -> Self {
    Self::new()
  }
}

impl WindowId {
  /// Generate a new unique `WindowId`.
  pub fn new() -> Self {
    Self(WINDOW_COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

impl Default for WindowId {
  fn default() -> Self {
    Self::new()
  }
}

/// Conversation thread owned by the agent service.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Display, From, Into,
)]
#[ts(export)]
pub struct ThreadId(pub String);

/// File known to the blob store.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Display, From, Into,
)]
#[ts(export)]
pub struct FileId(pub String);

impl From<&str> for FileId {
  fn from(value: &str) -> Self {
    Self(value.to_owned())
  }
}
