/*!
External collaborators: blob storage and the conversational agent.

Both are opaque services. The desk only records what they hand back (a
retrieval url, a thread id) in process props. Their failures are recorded on
the affected file, or surfaced as [`DeskError::Upstream`], and never touch
window state.
*/

use async_broadcast::Receiver;

use crate::core::Desk;
use crate::machine::Transition;
use crate::types::{
  DeskError, DeskResult, FileRef, ProcessId, ProcessKind, ProcessProps, ProcessPropsPatch,
  ProcessSpec, ThreadId, UserId,
};

/// Failure reported by an external service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct UpstreamError(pub String);

impl From<UpstreamError> for DeskError {
  fn from(e: UpstreamError) -> Self {
    DeskError::Upstream(e.0)
  }
}

/// Where the client uploads bytes before committing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle {
  pub target: String,
}

/// Opaque blob storage.
pub trait BlobStore: Send + Sync {
  fn request_upload_target(&self) -> Result<UploadHandle, UpstreamError>;

  /// Finish an upload. Returns the retrieval url.
  fn commit(&self, handle: UploadHandle) -> Result<String, UpstreamError>;
}

/// One message on an agent thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMessage {
  pub content: String,
  pub attachments: Vec<FileRef>,
}

/// Opaque conversational agent keyed by thread.
pub trait AgentService: Send + Sync {
  fn create_thread(&self, user: &UserId) -> Result<ThreadId, UpstreamError>;

  fn send(
    &self,
    thread: &ThreadId,
    content: &str,
    attachments: &[FileRef],
  ) -> Result<(), UpstreamError>;

  /// Stream of the thread's messages: the ones already on it, then each new
  /// one as it arrives.
  fn subscribe(&self, thread: &ThreadId) -> Result<Receiver<AgentMessage>, UpstreamError>;
}

/// Upload the file of a process and record the outcome on its `FileRef`:
/// the url on success, the error message on failure.
///
/// An upload failure is not an error of this call; it shows up as
/// `FileRef::error`.
pub fn attach_upload(
  desk: &Desk,
  user: &UserId,
  process: ProcessId,
  store: &dyn BlobStore,
) -> DeskResult<Transition> {
  let outcome = store
    .request_upload_target()
    .and_then(|handle| store.commit(handle));
  if let Err(e) = &outcome {
    log::warn!("Upload for process {process} failed: {e}");
  }

  desk.update_process(user, process, "attach_upload", |p| {
    let kind = p.kind();
    let file = p.props.file_mut().ok_or_else(|| {
      DeskError::Internal(format!("{kind:?} process {process} has no file to upload"))
    })?;
    match outcome {
      Ok(url) => {
        file.url = Some(url);
        file.error = None;
      }
      Err(e) => file.error = Some(e.0),
    }
    Ok(())
  })
}

/// Create an agent thread and start a chat process bound to it.
pub fn start_chat(desk: &Desk, user: &UserId, agent: &dyn AgentService) -> DeskResult<ProcessId> {
  let thread_id = agent.create_thread(user).map_err(|e| {
    log::warn!("Agent refused a thread for {user}: {e}");
    DeskError::from(e)
  })?;
  desk.start(
    user,
    ProcessSpec::new(ProcessProps::Chat {
      thread_id,
      attachments: Vec::new(),
    }),
  )
}

/// Send a message on a chat process's thread, forwarding and then clearing
/// its pending attachments.
pub fn send_message(
  desk: &Desk,
  user: &UserId,
  process: ProcessId,
  agent: &dyn AgentService,
  content: &str,
) -> DeskResult<Transition> {
  let chat = desk.process(user, process)?;
  let ProcessProps::Chat {
    thread_id,
    attachments,
  } = &chat.props
  else {
    return Err(DeskError::KindMismatch {
      expected: ProcessKind::Chat,
      got: chat.kind(),
    });
  };

  agent.send(thread_id, content, attachments)?;
  if attachments.is_empty() {
    return Ok(Transition::Unchanged);
  }
  desk.update_props(
    user,
    process,
    ProcessPropsPatch::Chat {
      attachments: Some(Vec::new()),
    },
  )
}

/// In-memory collaborators for tests and local runs.
pub mod memory {
  use async_broadcast::{Receiver, Sender};
  use parking_lot::Mutex;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

  use super::{AgentMessage, AgentService, BlobStore, UploadHandle, UpstreamError};
  use crate::types::{FileRef, ThreadId, UserId};

  /// Blob store that hands out `memory://` urls.
  #[derive(Debug, Default)]
  pub struct MemoryBlobStore {
    next: AtomicU32,
    failing: AtomicBool,
  }

  impl MemoryBlobStore {
    pub fn new() -> Self {
      Self::default()
    }

    /// Make every following call fail.
    pub fn set_failing(&self, failing: bool) {
      self.failing.store(failing, Ordering::Relaxed);
    }

    fn check(&self) -> Result<(), UpstreamError> {
      if self.failing.load(Ordering::Relaxed) {
        return Err(UpstreamError("blob store unavailable".to_owned()));
      }
      Ok(())
    }
  }

  impl BlobStore for MemoryBlobStore {
    fn request_upload_target(&self) -> Result<UploadHandle, UpstreamError> {
      self.check()?;
      let n = self.next.fetch_add(1, Ordering::Relaxed);
      Ok(UploadHandle {
        target: format!("upload-{n}"),
      })
    }

    fn commit(&self, handle: UploadHandle) -> Result<String, UpstreamError> {
      self.check()?;
      Ok(format!("memory://blobs/{}", handle.target))
    }
  }

  /// Room left in a subscriber's channel beyond the replayed history.
  const SUBSCRIBER_BACKLOG: usize = 64;

  #[derive(Debug, Default)]
  struct Thread {
    messages: Vec<AgentMessage>,
    subscribers: Vec<Sender<AgentMessage>>,
  }

  /// Agent that records every message per thread.
  #[derive(Debug, Default)]
  pub struct MemoryAgent {
    threads: Mutex<HashMap<ThreadId, Thread>>,
    failing: AtomicBool,
  }

  impl MemoryAgent {
    pub fn new() -> Self {
      Self::default()
    }

    /// Make every following call fail.
    pub fn set_failing(&self, failing: bool) {
      self.failing.store(failing, Ordering::Relaxed);
    }

    /// Every message recorded on `thread`.
    pub fn messages(&self, thread: &ThreadId) -> Vec<AgentMessage> {
      self
        .threads
        .lock()
        .get(thread)
        .map(|t| t.messages.clone())
        .unwrap_or_default()
    }
  }

  impl AgentService for MemoryAgent {
    fn create_thread(&self, user: &UserId) -> Result<ThreadId, UpstreamError> {
      if self.failing.load(Ordering::Relaxed) {
        return Err(UpstreamError("agent service unavailable".to_owned()));
      }
      let mut threads = self.threads.lock();
      let thread = ThreadId(format!("thread-{user}-{}", threads.len() + 1));
      threads.insert(thread.clone(), Thread::default());
      Ok(thread)
    }

    fn send(
      &self,
      thread: &ThreadId,
      content: &str,
      attachments: &[FileRef],
    ) -> Result<(), UpstreamError> {
      if self.failing.load(Ordering::Relaxed) {
        return Err(UpstreamError("agent service unavailable".to_owned()));
      }
      let mut threads = self.threads.lock();
      let entry = threads
        .get_mut(thread)
        .ok_or_else(|| UpstreamError(format!("unknown thread {thread}")))?;
      let message = AgentMessage {
        content: content.to_owned(),
        attachments: attachments.to_vec(),
      };
      entry.subscribers.retain(|tx| !tx.is_closed());
      for tx in &entry.subscribers {
        drop(tx.try_broadcast(message.clone()));
      }
      entry.messages.push(message);
      Ok(())
    }

    fn subscribe(&self, thread: &ThreadId) -> Result<Receiver<AgentMessage>, UpstreamError> {
      if self.failing.load(Ordering::Relaxed) {
        return Err(UpstreamError("agent service unavailable".to_owned()));
      }
      let mut threads = self.threads.lock();
      let entry = threads
        .get_mut(thread)
        .ok_or_else(|| UpstreamError(format!("unknown thread {thread}")))?;

      let (mut tx, rx) = async_broadcast::broadcast(entry.messages.len() + SUBSCRIBER_BACKLOG);
      tx.set_overflow(true);
      for message in &entry.messages {
        drop(tx.try_broadcast(message.clone()));
      }
      entry.subscribers.push(tx);
      Ok(rx)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::memory::{MemoryAgent, MemoryBlobStore};
  use super::*;

  fn image(desk: &Desk, user: &UserId) -> ProcessId {
    desk
      .start(
        user,
        ProcessSpec::new(ProcessProps::ImagePreview {
          file: FileRef::new("img-1", "cat.png"),
        }),
      )
      .unwrap()
  }

  fn file_of(desk: &Desk, user: &UserId, id: ProcessId) -> FileRef {
    let mut process = desk.process(user, id).unwrap();
    process.props.file_mut().unwrap().clone()
  }

  #[test]
  fn upload_records_url() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let id = image(&desk, &alice);

    attach_upload(&desk, &alice, id, &MemoryBlobStore::new()).unwrap();

    let file = file_of(&desk, &alice, id);
    assert_eq!(file.url.as_deref(), Some("memory://blobs/upload-0"));
    assert_eq!(file.error, None);
  }

  #[test]
  fn upload_failure_is_recorded_on_file() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let id = image(&desk, &alice);
    let store = MemoryBlobStore::new();
    store.set_failing(true);

    assert_eq!(
      attach_upload(&desk, &alice, id, &store),
      Ok(Transition::Applied),
      "upstream failure is data, not an error"
    );
    let file = file_of(&desk, &alice, id);
    assert_eq!(file.url, None);
    assert_eq!(file.error.as_deref(), Some("blob store unavailable"));
    assert!(desk.find_active(&alice).is_some(), "window state untouched");
  }

  #[test]
  fn chat_binds_thread_and_forwards_attachments() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let agent = MemoryAgent::new();
    let chat = start_chat(&desk, &alice, &agent).unwrap();

    let attachment = FileRef::new("doc-1", "notes.txt");
    desk
      .update_props(
        &alice,
        chat,
        ProcessPropsPatch::Chat {
          attachments: Some(vec![attachment.clone()]),
        },
      )
      .unwrap();
    send_message(&desk, &alice, chat, &agent, "summarize this").unwrap();

    let ProcessProps::Chat {
      thread_id,
      attachments,
    } = desk.process(&alice, chat).unwrap().props
    else {
      panic!("chat process changed kind");
    };
    assert!(attachments.is_empty(), "attachments cleared once sent");
    let sent = agent.messages(&thread_id);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachments, vec![attachment]);
  }

  #[test]
  fn thread_subscription_replays_then_follows() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let agent = MemoryAgent::new();
    let chat = start_chat(&desk, &alice, &agent).unwrap();
    let ProcessProps::Chat { thread_id, .. } = desk.process(&alice, chat).unwrap().props else {
      panic!("not a chat process");
    };

    send_message(&desk, &alice, chat, &agent, "first").unwrap();
    let mut messages = agent.subscribe(&thread_id).unwrap();
    send_message(&desk, &alice, chat, &agent, "second").unwrap();

    assert_eq!(messages.try_recv().unwrap().content, "first");
    assert_eq!(messages.try_recv().unwrap().content, "second");
    assert!(messages.try_recv().is_err());

    let unknown = ThreadId("missing".to_owned());
    assert!(agent.subscribe(&unknown).is_err());
  }

  #[test]
  fn failing_agent_is_upstream_error() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let agent = MemoryAgent::new();
    agent.set_failing(true);

    let err = start_chat(&desk, &alice, &agent).unwrap_err();
    assert!(matches!(err, DeskError::Upstream(_)));
    assert!(desk.list_processes(&alice).is_empty());
  }

  #[test]
  fn message_to_non_chat_is_kind_mismatch() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let id = image(&desk, &alice);
    let err = send_message(&desk, &alice, id, &MemoryAgent::new(), "hi").unwrap_err();
    assert!(matches!(err, DeskError::KindMismatch { .. }));
  }
}
