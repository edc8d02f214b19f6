/*! Change events emitted by the store on every commit. */

use super::{Process, ProcessId, Window, WindowId};
use serde::Serialize;
use ts_rs::TS;

/// Events emitted when committed state changes.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "event", content = "data")]
#[ts(export)]
pub enum Event {
  #[serde(rename = "process:added")]
  ProcessAdded { process: Process },
  #[serde(rename = "process:changed")]
  ProcessChanged { process: Process },
  #[serde(rename = "process:removed")]
  ProcessRemoved { process_id: ProcessId },

  #[serde(rename = "window:added")]
  WindowAdded { window: Window },
  #[serde(rename = "window:changed")]
  WindowChanged { window: Window },
  #[serde(rename = "window:removed")]
  WindowRemoved { window_id: WindowId },

  /// Emitted last for every transaction that changed something.
  #[serde(rename = "commit")]
  Commit { version: u64 },
}
