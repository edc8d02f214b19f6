/*! Process record and its kind-specific props. */

use super::{FileId, ProcessId, Rect, ThreadId, UserId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Closed set of process kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProcessKind {
  ImagePreview,
  VideoPlayer,
  TextPreview,
  Chat,
  FileBrowser,
}

/// Reference to a stored file.
///
/// `error` records an upstream (blob store) failure for display; it is not a
/// window-manager error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FileRef {
  pub file_id: FileId,
  pub name: String,
  pub url: Option<String>,
  pub error: Option<String>,
}

impl FileRef {
  pub fn new(file_id: impl Into<FileId>, name: impl Into<String>) -> Self {
    Self {
      file_id: file_id.into(),
      name: name.into(),
      url: None,
      error: None,
    }
  }
}

/// Kind-specific payload. The variant is the process's kind, so props can
/// never mix fields from two kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum ProcessProps {
  ImagePreview {
    file: FileRef,
  },
  VideoPlayer {
    file: FileRef,
  },
  TextPreview {
    file: Option<FileRef>,
    text: String,
  },
  Chat {
    thread_id: ThreadId,
    attachments: Vec<FileRef>,
  },
  FileBrowser {
    history: Vec<String>,
    cursor: usize,
    /// Process that opened this browser as a picker dialog.
    parent: Option<ProcessId>,
  },
}

impl ProcessProps {
  pub const fn kind(&self) -> ProcessKind {
    match self {
      ProcessProps::ImagePreview { .. } => ProcessKind::ImagePreview,
      ProcessProps::VideoPlayer { .. } => ProcessKind::VideoPlayer,
      ProcessProps::TextPreview { .. } => ProcessKind::TextPreview,
      ProcessProps::Chat { .. } => ProcessKind::Chat,
      ProcessProps::FileBrowser { .. } => ProcessKind::FileBrowser,
    }
  }

  /// The primary file this process displays, if any.
  pub fn file_mut(&mut self) -> Option<&mut FileRef> {
    match self {
      ProcessProps::ImagePreview { file } | ProcessProps::VideoPlayer { file } => Some(file),
      ProcessProps::TextPreview { file, .. } => file.as_mut(),
      ProcessProps::Chat { .. } | ProcessProps::FileBrowser { .. } => None,
    }
  }
}

/// Partial props update. Fields left as `None` keep their stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum ProcessPropsPatch {
  ImagePreview {
    #[serde(default)]
    file: Option<FileRef>,
  },
  VideoPlayer {
    #[serde(default)]
    file: Option<FileRef>,
  },
  TextPreview {
    #[serde(default)]
    file: Option<FileRef>,
    #[serde(default)]
    text: Option<String>,
  },
  Chat {
    #[serde(default)]
    attachments: Option<Vec<FileRef>>,
  },
  FileBrowser {
    #[serde(default)]
    history: Option<Vec<String>>,
    #[serde(default)]
    cursor: Option<usize>,
  },
}

impl ProcessPropsPatch {
  pub const fn kind(&self) -> ProcessKind {
    match self {
      ProcessPropsPatch::ImagePreview { .. } => ProcessKind::ImagePreview,
      ProcessPropsPatch::VideoPlayer { .. } => ProcessKind::VideoPlayer,
      ProcessPropsPatch::TextPreview { .. } => ProcessKind::TextPreview,
      ProcessPropsPatch::Chat { .. } => ProcessKind::Chat,
      ProcessPropsPatch::FileBrowser { .. } => ProcessKind::FileBrowser,
    }
  }

  /// Merge into `props`. Returns `false` (leaving `props` untouched) when the
  /// patch is for a different kind.
  pub fn apply_to(self, props: &mut ProcessProps) -> bool {
    match (self, props) {
      (ProcessPropsPatch::ImagePreview { file }, ProcessProps::ImagePreview { file: stored })
      | (ProcessPropsPatch::VideoPlayer { file }, ProcessProps::VideoPlayer { file: stored }) => {
        if let Some(file) = file {
          *stored = file;
        }
        true
      }
      (
        ProcessPropsPatch::TextPreview { file, text },
        ProcessProps::TextPreview {
          file: stored_file,
          text: stored_text,
        },
      ) => {
        if let Some(file) = file {
          *stored_file = Some(file);
        }
        if let Some(text) = text {
          *stored_text = text;
        }
        true
      }
      (
        ProcessPropsPatch::Chat { attachments },
        ProcessProps::Chat {
          attachments: stored,
          ..
        },
      ) => {
        if let Some(attachments) = attachments {
          *stored = attachments;
        }
        true
      }
      (
        ProcessPropsPatch::FileBrowser { history, cursor },
        ProcessProps::FileBrowser {
          history: stored_history,
          cursor: stored_cursor,
          ..
        },
      ) => {
        if let Some(history) = history {
          *stored_history = history;
        }
        if let Some(cursor) = cursor {
          *stored_cursor = cursor;
        }
        // The cursor always points into the history.
        *stored_cursor = (*stored_cursor).min(stored_history.len().saturating_sub(1));
        true
      }
      _ => false,
    }
  }
}

/// A running application instance owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Process {
  pub id: ProcessId,
  pub user_id: UserId,
  pub props: ProcessProps,
}

impl Process {
  pub const fn kind(&self) -> ProcessKind {
    self.props.kind()
  }
}

/// Request to start a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProcessSpec {
  pub props: ProcessProps,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub icon: Option<String>,
  #[serde(default)]
  pub rect: Option<Rect>,
}

impl ProcessSpec {
  pub const fn new(props: ProcessProps) -> Self {
    Self {
      props,
      title: None,
      icon: None,
      rect: None,
    }
  }

  #[must_use]
  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  #[must_use]
  pub const fn with_rect(mut self, rect: Rect) -> Self {
    self.rect = Some(rect);
    self
  }
}
