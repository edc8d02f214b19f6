/*!
deskmgr - window and process lifecycle manager for multi-client web desktops

```
use deskmgr::{Client, Desk, ProcessProps, ProcessSpec, UserId};

let desk = Desk::new();
let alice = UserId::from("alice");

// Start a process; its window opens focused and on top
let notes = desk.start(&alice, ProcessSpec::new(ProcessProps::TextPreview {
    file: None,
    text: String::new(),
}))?;
let window = desk.list_windows_for_process(&alice, notes)?[0].id;

// State machine operations are transactions; stale ones resolve to Unchanged
desk.minimize(&alice, window)?;
desk.restore(&alice, window)?;

// A client sees its intents immediately, then converges on pushed results
let mut client = Client::connect(&desk, alice.clone())?;
client.deactivate()?;
assert!(client.active_window().is_none());
client.pump()?;
assert_eq!(client.windows(), desk.list_windows(&alice));
# Ok::<(), deskmgr::DeskError>(())
```
*/

mod client;
mod collaborators;
mod config;
mod core;
mod store;

pub mod machine;
pub mod motion;

mod types;
pub use types::*;

pub use crate::client::{
  Client, DragSession, Draft, Intent, Predict, QueryCache, ResizeSession, DRAG_THRESHOLD,
};
pub use crate::collaborators::{
  attach_upload, memory, send_message, start_chat, AgentMessage, AgentService, BlobStore,
  UploadHandle, UpstreamError,
};
pub use crate::config::Config;
pub use crate::core::{Desk, DeskBuilder, Subscription, WindowSpec};
pub use crate::machine::Transition;
pub use crate::motion::{ResizeEdge, ResizeLimits};
