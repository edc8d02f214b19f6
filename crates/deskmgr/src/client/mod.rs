/*!
Client reconciliation layer.

A [`Client`] is one connected view of a user's desktop. It keeps the
subscribed query results locally, shows user intents immediately through an
optimistic overlay, debounces text edits, and runs drag/resize math locally
until the pointer is released.

# Module Structure

- `mod.rs` - Client: subscriptions, intents, pumping deliveries
- `overlay.rs` - `QueryCache` and the `Predict` trait
- `draft.rs` - debounced local edits
- `interaction.rs` - drag and resize sessions
*/

mod draft;
mod interaction;
mod overlay;

pub use draft::Draft;
pub use interaction::{DragSession, ResizeSession, DRAG_THRESHOLD};
pub use overlay::{Intent, Predict, QueryCache};

use std::collections::HashMap;
use std::time::Instant;

use crate::core::{Desk, Subscription};
use crate::machine::{self, Transition};
use crate::motion::{ResizeEdge, ResizeLimits};
use crate::types::{
  DeskError, DeskResult, Point, Process, ProcessId, ProcessProps, ProcessPropsPatch, Query,
  QueryResult, UserId, Versioned, Window, WindowId,
};

/// An in-process client bound to one user.
#[derive(Debug)]
pub struct Client {
  desk: Desk,
  user: UserId,
  windows_sub: Subscription,
  windows: QueryCache<Vec<Window>>,
  processes_sub: Subscription,
  processes: Versioned<Vec<Process>>,
  texts: HashMap<ProcessId, Draft<String>>,
}

impl Client {
  /// Subscribe to the user's windows and processes.
  pub fn connect(desk: &Desk, user: UserId) -> DeskResult<Self> {
    let mut windows_sub = desk.subscribe(&user, Query::Windows { user: user.clone() })?;
    let mut processes_sub = desk.subscribe(&user, Query::Processes { user: user.clone() })?;
    let windows = QueryCache::new(windows_of(windows_sub.latest())?);
    let processes = processes_of(processes_sub.latest())?;

    Ok(Self {
      desk: desk.clone(),
      user,
      windows_sub,
      windows,
      processes_sub,
      processes,
      texts: HashMap::new(),
    })
  }

  /// The user this client acts for.
  pub const fn user(&self) -> &UserId {
    &self.user
  }

  /// Windows as displayed, including unconfirmed intents.
  pub fn windows(&self) -> Vec<Window> {
    self.windows.view()
  }

  /// One window as displayed.
  pub fn window(&self, id: WindowId) -> Option<Window> {
    self.windows().into_iter().find(|w| w.id == id)
  }

  /// The displayed active window, if any.
  pub fn active_window(&self) -> Option<Window> {
    machine::active_window(&self.windows()).cloned()
  }

  /// Processes as last delivered.
  pub fn processes(&self) -> &[Process] {
    &self.processes.value
  }

  /// Version of the last authoritative window list.
  pub const fn windows_version(&self) -> u64 {
    self.windows.version()
  }

  /// Focus a window, showing the result before the server confirms it.
  pub fn focus(&mut self, id: WindowId) -> DeskResult<Transition> {
    self.issue(Intent::Focus(id), |desk, user| desk.focus(user, id))
  }

  /// Minimize a window optimistically.
  pub fn minimize(&mut self, id: WindowId) -> DeskResult<Transition> {
    self.issue(Intent::Minimize(id), |desk, user| desk.minimize(user, id))
  }

  /// Clear the active window optimistically.
  pub fn deactivate(&mut self) -> DeskResult<Transition> {
    self.issue(Intent::Deactivate, Desk::deactivate_active)
  }

  /// Show the predicted outcome now, then run the operation.
  ///
  /// If the operation changed nothing or failed, no delivery will replace
  /// this prediction, so it is withdrawn right away. Intents issued before it
  /// stay until the next delivery.
  fn issue(
    &mut self,
    intent: Intent,
    op: impl FnOnce(&Desk, &UserId) -> DeskResult<Transition>,
  ) -> DeskResult<Transition> {
    self.windows.apply(intent);
    let outcome = op(&self.desk, &self.user);
    if !matches!(outcome, Ok(Transition::Applied)) {
      self.windows.retract_last();
    }
    outcome
  }

  /// Start dragging a window from where it is currently displayed.
  pub fn begin_drag(&self, id: WindowId, pointer: Point) -> Option<DragSession> {
    let window = self.window(id).filter(Window::is_open)?;
    Some(DragSession::begin(id, window.rect, pointer))
  }

  /// Start resizing a window from one of its edges.
  pub fn begin_resize(&self, id: WindowId, edge: ResizeEdge, pointer: Point) -> Option<ResizeSession> {
    let window = self.window(id).filter(Window::is_open)?;
    let limits = ResizeLimits::new(self.desk.config().min_window_size);
    Some(ResizeSession::begin(id, window.rect, edge, pointer, limits))
  }

  /// Commit the outcome of a drag. Nothing is sent if the window didn't move.
  pub fn finish_drag(&mut self, session: DragSession) -> DeskResult<Transition> {
    let id = session.window();
    match session.finish() {
      Some(rect) => self.desk.update_geometry(&self.user, id, rect),
      None => Ok(Transition::Unchanged),
    }
  }

  /// Commit the outcome of a resize.
  pub fn finish_resize(&mut self, session: ResizeSession) -> DeskResult<Transition> {
    let id = session.window();
    match session.finish() {
      Some(rect) => self.desk.update_geometry(&self.user, id, rect),
      None => Ok(Transition::Unchanged),
    }
  }

  /// Text of a text-preview process as displayed (local draft first).
  pub fn text(&self, process: ProcessId) -> Option<String> {
    if let Some(draft) = self.texts.get(&process) {
      return Some(draft.value().clone());
    }
    self.stored_text(process)
  }

  fn stored_text(&self, process: ProcessId) -> Option<String> {
    self
      .processes
      .value
      .iter()
      .find(|p| p.id == process)
      .and_then(|p| match &p.props {
        ProcessProps::TextPreview { text, .. } => Some(text.clone()),
        ProcessProps::ImagePreview { .. }
        | ProcessProps::VideoPlayer { .. }
        | ProcessProps::Chat { .. }
        | ProcessProps::FileBrowser { .. } => None,
      })
  }

  /// Local keystroke. No traffic until [`flush_due`](Self::flush_due) finds
  /// the draft quiet.
  pub fn edit_text(&mut self, process: ProcessId, text: String, now: Instant) -> DeskResult<()> {
    let stored = self
      .stored_text(process)
      .ok_or(DeskError::ProcessNotFound(process))?;
    let debounce = self.desk.config().debounce;
    self
      .texts
      .entry(process)
      .or_insert_with(|| Draft::new(stored, debounce))
      .edit(text, now);
    Ok(())
  }

  /// Commit every draft whose quiet period has elapsed. Returns how many
  /// commits were issued.
  pub fn flush_due(&mut self, now: Instant) -> DeskResult<usize> {
    let mut committed = 0;
    for (process, draft) in &mut self.texts {
      let Some(text) = draft.poll(now) else {
        continue;
      };
      let patch = ProcessPropsPatch::TextPreview {
        file: None,
        text: Some(text),
      };
      let outcome = self.desk.update_props(&self.user, *process, patch);
      draft.acknowledge(self.desk.version());
      outcome?;
      committed += 1;
    }
    Ok(committed)
  }

  /// Apply authoritative deliveries that arrived since the last pump.
  /// Returns whether anything displayed may have changed.
  pub fn pump(&mut self) -> DeskResult<bool> {
    let mut changed = false;

    if let Some(delivery) = self.windows_sub.latest_if_changed() {
      changed |= self.windows.receive(windows_of(delivery)?);
    }

    if let Some(delivery) = self.processes_sub.latest_if_changed() {
      let delivery = processes_of(delivery)?;
      if delivery.version > self.processes.version {
        self.processes = delivery;
        changed = true;
      }
      let live: Vec<ProcessId> = self.processes.value.iter().map(|p| p.id).collect();
      self.texts.retain(|id, _| live.contains(id));
      for process in &self.processes.value {
        if let (Some(draft), ProcessProps::TextPreview { text, .. }) =
          (self.texts.get_mut(&process.id), &process.props)
        {
          changed |= draft.receive(self.processes.version, text.clone());
        }
      }
    }

    Ok(changed)
  }
}

fn windows_of(delivery: Versioned<QueryResult>) -> DeskResult<Versioned<Vec<Window>>> {
  match delivery.value {
    QueryResult::Windows(windows) => Ok(Versioned::new(delivery.version, windows)),
    QueryResult::Processes(_) | QueryResult::ActiveWindow(_) => Err(unexpected("windows")),
  }
}

fn processes_of(delivery: Versioned<QueryResult>) -> DeskResult<Versioned<Vec<Process>>> {
  match delivery.value {
    QueryResult::Processes(processes) => Ok(Versioned::new(delivery.version, processes)),
    QueryResult::Windows(_) | QueryResult::ActiveWindow(_) => Err(unexpected("processes")),
  }
}

fn unexpected(expected: &str) -> DeskError {
  DeskError::Internal(format!("subscription delivered a non-{expected} result"))
}
