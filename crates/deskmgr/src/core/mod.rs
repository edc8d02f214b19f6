/*!
Core Desk instance - owns the store, the change feed and query subscriptions.

# Module Structure

- `mod.rs` - Desk struct, construction, transactions, events
- `windows.rs` - window state machine operations (focus, minimize, ...)
- `processes.rs` - process lifecycle (start, update props, close)
- `queries.rs` - scoped reads and query evaluation
- `subscriptions.rs` - push delivery of query results

# Example

```
use deskmgr::{Desk, ProcessProps, ProcessSpec, Query, UserId};

let desk = Desk::new();
let alice = UserId::from("alice");

let process = desk.start(&alice, ProcessSpec::new(ProcessProps::TextPreview {
    file: None,
    text: "hello".into(),
}))?;

let active = desk.find_active(&alice).expect("new process is focused");
assert_eq!(active.process.id, process);

let windows = desk.subscribe(&alice, Query::Windows { user: alice.clone() })?;
assert_eq!(windows.current().value.windows().map(<[_]>::len), Some(1));
# Ok::<(), deskmgr::DeskError>(())
```
*/

mod processes;
mod queries;
mod subscriptions;
mod windows;

pub(crate) use queries::evaluate;
pub use subscriptions::Subscription;
pub use windows::WindowSpec;

use async_broadcast::{InactiveReceiver, Sender};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::sync::Arc;

use crate::config::Config;
use crate::store::{Registry, Transaction};
use crate::types::{DeskResult, Event};
use subscriptions::SubscriptionRegistry;

/// The authoritative desktop state for all users.
///
/// Clone is cheap (Arc bumps) - share freely across threads and connections.
pub struct Desk {
  state: Arc<RwLock<Registry>>,
  subscriptions: Arc<Mutex<SubscriptionRegistry>>,
  events_tx: Sender<Event>,
  events_keepalive: InactiveReceiver<Event>,
  config: Arc<Config>,
}

impl Clone for Desk {
  fn clone(&self) -> Self {
    Self {
      state: Arc::clone(&self.state),
      subscriptions: Arc::clone(&self.subscriptions),
      events_tx: self.events_tx.clone(),
      events_keepalive: self.events_keepalive.clone(),
      config: Arc::clone(&self.config),
    }
  }
}

impl std::fmt::Debug for Desk {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Desk")
      .field("version", &self.version())
      .finish_non_exhaustive()
  }
}

impl Default for Desk {
  fn default() -> Self {
    Self::new()
  }
}

/// Builder for configuring a Desk.
///
/// # Example
///
/// ```
/// use deskmgr::{Desk, Rect};
///
/// let desk = Desk::builder()
///     .desktop_bounds(Rect::new(0.0, 0.0, 1920.0, 1040.0))
///     .event_channel_capacity(64)
///     .build();
/// assert_eq!(desk.config().event_channel_capacity, 64);
/// ```
#[derive(Debug, Default, Clone)]
#[must_use = "Builder does nothing until .build() is called"]
pub struct DeskBuilder {
  config: Config,
}

impl DeskBuilder {
  /// Replace the whole configuration.
  pub fn config(mut self, config: Config) -> Self {
    self.config = config;
    self
  }

  /// Area maximized windows fill when the caller supplies none.
  pub const fn desktop_bounds(mut self, bounds: crate::types::Rect) -> Self {
    self.config.desktop_bounds = bounds;
    self
  }

  /// Capacity of the change-event channel. Default: 1000.
  pub const fn event_channel_capacity(mut self, capacity: usize) -> Self {
    self.config.event_channel_capacity = capacity;
    self
  }

  /// Create the desk.
  pub fn build(self) -> Desk {
    Desk::with_config(self.config)
  }
}

impl Desk {
  /// Create an empty desk with default configuration.
  pub fn new() -> Self {
    Self::builder().build()
  }

  /// Start configuring a desk.
  pub fn builder() -> DeskBuilder {
    DeskBuilder::default()
  }

  fn with_config(config: Config) -> Self {
    let (mut tx, rx) = async_broadcast::broadcast(config.event_channel_capacity.max(1));
    tx.set_overflow(true); // Drop oldest messages when full

    Desk {
      state: Arc::new(RwLock::new(Registry::new(tx.clone()))),
      subscriptions: Arc::new(Mutex::new(SubscriptionRegistry::default())),
      events_tx: tx,
      events_keepalive: rx.deactivate(),
      config: Arc::new(config),
    }
  }

  /// Receive every committed change as a stream of [`Event`]s.
  pub fn subscribe_events(&self) -> async_broadcast::Receiver<Event> {
    self.events_keepalive.activate_cloned()
  }

  /// Version of the last commit that changed anything.
  pub fn version(&self) -> u64 {
    self.state.read().version()
  }

  /// Configuration the desk was built with.
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Read committed state.
  #[inline]
  pub(crate) fn read<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
    f(&self.state.read())
  }

  /// Run `f` as one serializable transaction.
  ///
  /// The store is locked exclusively while `f` runs. If `f` returns `Ok` and
  /// the staged writes keep the store consistent they are applied as a unit,
  /// then every subscription the commit touched is refreshed, and only then
  /// are the commit's events broadcast. On `Err` nothing is written.
  pub(crate) fn transact<R>(
    &self,
    f: impl FnOnce(&mut Transaction<'_>) -> DeskResult<R>,
  ) -> DeskResult<R> {
    let mut state = self.state.write();
    let (value, writes) = {
      let mut tx = Transaction::new(&state);
      let value = f(&mut tx)?;
      tx.validate()?;
      (value, tx.into_writes())
    };

    if let Some(commit) = state.apply(writes) {
      // Readers may proceed, but no other commit can start until the
      // subscriptions and the event feed have seen this one.
      let state = RwLockWriteGuard::downgrade(state);
      self.subscriptions.lock().publish(&state, &commit.touched);
      state.broadcast(commit.events);
    }
    Ok(value)
  }
}
