/*! Core types for deskmgr.

Regenerate TypeScript types: `cargo test -p deskmgr export_bindings`
*/

#![allow(missing_docs)]

mod error;
mod event;
mod geometry;
mod ids;
mod process;
mod query;
mod window;

pub use error::{DeskError, DeskResult};
pub use event::Event;
pub use geometry::{Point, Rect, Size};
pub use ids::{FileId, ProcessId, ThreadId, UserId, WindowId};
pub use process::{FileRef, Process, ProcessKind, ProcessProps, ProcessPropsPatch, ProcessSpec};
pub use query::{ActiveWindow, Query, QueryResult, Versioned};
pub use window::{ViewState, Window};
