/*!
Process lifecycle: start, props updates, close.

`start` is the one place that decides, per process kind, which windows a
new process gets. The match over [`ProcessProps`] is exhaustive, so a new
kind doesn't compile until it is handled here.
*/

use super::windows::{new_window, WindowSpec};
use super::Desk;
use crate::machine::Transition;
use crate::store::{Tables, Transaction};
use crate::types::{
  DeskError, DeskResult, Process, ProcessId, ProcessProps, ProcessPropsPatch, ProcessSpec, Rect,
  UserId, WindowId,
};

/// Windows a freshly started process gets, before caller overrides.
fn window_templates(props: &ProcessProps) -> Vec<WindowSpec> {
  let template = |title: &str, icon: &str, rect: Rect| WindowSpec {
    title: title.to_owned(),
    icon: Some(icon.to_owned()),
    rect,
  };

  match props {
    ProcessProps::ImagePreview { file } => {
      vec![template(&file.name, "image", Rect::new(120.0, 80.0, 640.0, 480.0))]
    }
    ProcessProps::VideoPlayer { file } => {
      vec![template(&file.name, "video", Rect::new(140.0, 90.0, 720.0, 460.0))]
    }
    ProcessProps::TextPreview { file, .. } => {
      let title = file.as_ref().map_or("Untitled", |f| f.name.as_str());
      vec![template(title, "text", Rect::new(160.0, 100.0, 560.0, 420.0))]
    }
    ProcessProps::Chat { .. } => {
      vec![template("Chat", "chat", Rect::new(200.0, 60.0, 420.0, 600.0))]
    }
    // Picker helper; a window is opened explicitly when needed.
    ProcessProps::FileBrowser { .. } => Vec::new(),
  }
}

impl Desk {
  /// Start a process with the windows its kind requires, then focus its
  /// first window.
  pub fn start(&self, user: &UserId, spec: ProcessSpec) -> DeskResult<ProcessId> {
    let ProcessSpec {
      props,
      title,
      icon,
      rect,
    } = spec;
    let templates = window_templates(&props);
    let kind = props.kind();

    let (process, first) = self.transact(|tx| {
      if let ProcessProps::FileBrowser {
        parent: Some(parent),
        ..
      } = &props
      {
        check_owner(tx, user, *parent)?;
      }

      let process = Process {
        id: ProcessId::new(),
        user_id: user.clone(),
        props,
      };
      let process_id = process.id;
      tx.put_process(process);

      let mut first = None;
      for template in templates {
        let window = new_window(
          process_id,
          user,
          WindowSpec {
            title: title.clone().unwrap_or(template.title),
            icon: icon.clone().or(template.icon),
            rect: rect.unwrap_or(template.rect),
          },
        );
        first.get_or_insert(window.id);
        tx.put_window(window);
      }
      Ok((process_id, first))
    })?;

    log::debug!("{user} started {kind:?} process {process}");
    if let Some(window) = first {
      self.focus(user, window)?;
    }
    Ok(process)
  }

  /// Merge a partial props update. Fields the patch leaves out are kept.
  ///
  /// A patch for a different kind than the process is rejected and nothing
  /// is written.
  pub fn update_props(
    &self,
    user: &UserId,
    id: ProcessId,
    patch: ProcessPropsPatch,
  ) -> DeskResult<Transition> {
    self.update_process(user, id, "update_props", |process| {
      let expected = process.kind();
      let got = patch.kind();
      if patch.apply_to(&mut process.props) {
        Ok(())
      } else {
        Err(DeskError::KindMismatch { expected, got })
      }
    })
  }

  /// Close a process and all of its windows in one transaction.
  pub fn close(&self, user: &UserId, id: ProcessId) -> DeskResult<Transition> {
    let outcome = self.transact(|tx| {
      let Some(process) = tx.process(id) else {
        return Ok(Transition::Unchanged);
      };
      if process.user_id != *user {
        return Err(DeskError::not_owner(user, format!("process {id}")));
      }
      let windows: Vec<WindowId> = tx.window_ids_for_process(id).into_iter().collect();
      for window in windows {
        tx.delete_window(window);
      }
      tx.delete_process(id);
      Ok(Transition::Applied)
    });
    match &outcome {
      Ok(Transition::Applied) => log::debug!("{user} closed process {id}"),
      Ok(Transition::Unchanged) => log::debug!("close: process {id} no longer exists"),
      Err(e) => log::warn!("close rejected for {user}: {e}"),
    }
    outcome
  }

  /// Read-modify-write of one process record.
  pub(crate) fn update_process(
    &self,
    user: &UserId,
    id: ProcessId,
    op: &str,
    f: impl FnOnce(&mut Process) -> DeskResult<()>,
  ) -> DeskResult<Transition> {
    let outcome = self.transact(|tx| {
      let Some(mut process) = tx.process(id) else {
        log::debug!("{op}: process {id} no longer exists");
        return Ok(Transition::Unchanged);
      };
      if process.user_id != *user {
        return Err(DeskError::not_owner(user, format!("process {id}")));
      }
      let before = process.clone();
      f(&mut process)?;
      if process == before {
        return Ok(Transition::Unchanged);
      }
      tx.put_process(process);
      Ok(Transition::Applied)
    });
    if let Err(e) = &outcome {
      log::warn!("{op} rejected for {user}: {e}");
    }
    outcome
  }
}

fn check_owner(tx: &Transaction<'_>, user: &UserId, id: ProcessId) -> DeskResult<()> {
  match tx.process(id) {
    Some(process) if process.user_id == *user => Ok(()),
    Some(_) => Err(DeskError::not_owner(user, format!("process {id}"))),
    None => Err(DeskError::ProcessNotFound(id)),
  }
}
