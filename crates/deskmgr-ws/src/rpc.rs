/*!
RPC request/response types and dispatch.
*/

#![allow(missing_docs)]

use deskmgr::{
  ActiveWindow, Desk, Process, ProcessId, ProcessPropsPatch, ProcessSpec, Query, QueryResult,
  Rect, Transition, UserId, Window, WindowId,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use ts_rs::TS;

/// Connection-local subscription handle.
pub type SubscriptionId = u64;

/// RPC request.
#[derive(Debug, Deserialize, TS)]
#[serde(tag = "method", content = "args", rename_all = "snake_case")]
#[ts(export)]
pub enum RpcRequest {
  /// Start a process and focus its window.
  StartProcess { spec: ProcessSpec },
  /// Close a process and all of its windows.
  CloseProcess { process_id: ProcessId },
  /// Merge a partial props update.
  UpdateProcessProps {
    process_id: ProcessId,
    props: ProcessPropsPatch,
  },
  FocusWindow { window_id: WindowId },
  MinimizeWindow { window_id: WindowId },
  RestoreWindow { window_id: WindowId },
  /// Maximize into `bounds` (server default if omitted) or restore.
  ToggleMaximizeWindow {
    window_id: WindowId,
    #[serde(default)]
    bounds: Option<Rect>,
  },
  /// Commit a complete rectangle.
  UpdateWindowGeometry { window_id: WindowId, rect: Rect },
  DeactivateActiveWindow,
  ListProcesses,
  ListWindows,
  ListWindowsForProcess { process_id: ProcessId },
  FindActiveWindow,
  /// Push results of `query` on every change. Connection-scoped.
  Subscribe { query: Query },
  /// Stop a subscription. Connection-scoped.
  Unsubscribe { subscription: SubscriptionId },
}

/// RPC response.
#[derive(Debug, Serialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum RpcResponse {
  Process(ProcessId),
  Transition(Transition),
  Processes(Vec<Process>),
  Windows(Vec<Window>),
  ActiveWindow(Option<Box<ActiveWindow>>),
  /// Initial result of a new subscription.
  Subscribed(QueryPush),
  /// No data.
  Null,
}

/// A query result pushed to a subscribed connection.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct QueryPush {
  pub subscription: SubscriptionId,
  pub version: u64,
  pub result: QueryResult,
}

/// Parse `{method, args}` and dispatch. Errors become `{"error": ...}`.
pub fn dispatch_json(desk: &Desk, user: &UserId, method: &str, args: &JsonValue) -> JsonValue {
  match parse(method, args) {
    Ok(request) => respond(method, dispatch(desk, user, request)),
    Err(e) => e,
  }
}

pub(crate) fn parse(method: &str, args: &JsonValue) -> Result<RpcRequest, JsonValue> {
  let request_value = json!({ "method": method, "args": args });
  serde_json::from_value::<RpcRequest>(request_value).map_err(|e| {
    log::warn!("[rpc] Invalid request for {method}: {e}");
    json!({ "error": format!("Invalid request: {}", e) })
  })
}

pub(crate) fn respond(method: &str, outcome: Result<RpcResponse, String>) -> JsonValue {
  match outcome {
    Ok(response) => json!({ "result": response }),
    Err(e) => {
      log::warn!("[rpc] {method} failed: {e}");
      json!({ "error": e })
    }
  }
}

/// Run one stateless request on behalf of `user`.
///
/// `subscribe` and `unsubscribe` need a connection to push to and are
/// rejected here.
pub fn dispatch(desk: &Desk, user: &UserId, request: RpcRequest) -> Result<RpcResponse, String> {
  match request {
    RpcRequest::StartProcess { spec } => {
      let id = desk.start(user, spec).map_err(|e| e.to_string())?;
      Ok(RpcResponse::Process(id))
    }

    RpcRequest::CloseProcess { process_id } => transition(desk.close(user, process_id)),

    RpcRequest::UpdateProcessProps { process_id, props } => {
      transition(desk.update_props(user, process_id, props))
    }

    RpcRequest::FocusWindow { window_id } => transition(desk.focus(user, window_id)),

    RpcRequest::MinimizeWindow { window_id } => transition(desk.minimize(user, window_id)),

    RpcRequest::RestoreWindow { window_id } => transition(desk.restore(user, window_id)),

    RpcRequest::ToggleMaximizeWindow { window_id, bounds } => {
      transition(desk.toggle_maximize(user, window_id, bounds))
    }

    RpcRequest::UpdateWindowGeometry { window_id, rect } => {
      transition(desk.update_geometry(user, window_id, rect))
    }

    RpcRequest::DeactivateActiveWindow => transition(desk.deactivate_active(user)),

    RpcRequest::ListProcesses => Ok(RpcResponse::Processes(desk.list_processes(user))),

    RpcRequest::ListWindows => Ok(RpcResponse::Windows(desk.list_windows(user))),

    RpcRequest::ListWindowsForProcess { process_id } => {
      let windows = desk
        .list_windows_for_process(user, process_id)
        .map_err(|e| e.to_string())?;
      Ok(RpcResponse::Windows(windows))
    }

    RpcRequest::FindActiveWindow => Ok(RpcResponse::ActiveWindow(
      desk.find_active(user).map(Box::new),
    )),

    RpcRequest::Subscribe { .. } | RpcRequest::Unsubscribe { .. } => {
      Err("subscriptions require a websocket connection".to_owned())
    }
  }
}

fn transition(outcome: deskmgr::DeskResult<Transition>) -> Result<RpcResponse, String> {
  outcome.map(RpcResponse::Transition).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn start(desk: &Desk, user: &UserId) -> ProcessId {
    let response = dispatch_json(
      desk,
      user,
      "start_process",
      &json!({ "spec": { "props": { "kind": "text_preview", "file": null, "text": "hi" } } }),
    );
    serde_json::from_value(response["result"].clone()).unwrap()
  }

  #[test]
  fn start_then_list_windows() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let process = start(&desk, &alice);

    let response = dispatch_json(
      &desk,
      &alice,
      "list_windows_for_process",
      &json!({ "process_id": process }),
    );
    let windows = response["result"].as_array().unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0]["viewState"]["kind"], "open");
    assert_eq!(windows[0]["viewState"]["isActive"], true);
  }

  #[test]
  fn unit_method_accepts_null_args() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    start(&desk, &alice);

    let response = dispatch_json(&desk, &alice, "deactivate_active_window", &JsonValue::Null);
    assert_eq!(response["result"], "applied");
    let response = dispatch_json(&desk, &alice, "find_active_window", &JsonValue::Null);
    assert!(response["result"].is_null());
  }

  #[test]
  fn ownership_violation_is_error_message() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let bob = UserId::from("bob");
    let process = start(&desk, &bob);

    let response = dispatch_json(&desk, &alice, "close_process", &json!({ "process_id": process }));
    let error = response["error"].as_str().unwrap();
    assert!(error.contains("does not own"), "unexpected error: {error}");
  }

  #[test]
  fn unknown_method_is_invalid_request() {
    let desk = Desk::new();
    let response = dispatch_json(&desk, &UserId::from("alice"), "explode", &JsonValue::Null);
    assert!(response["error"]
      .as_str()
      .unwrap()
      .starts_with("Invalid request"));
  }

  #[test]
  fn subscribe_needs_a_connection() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let response = dispatch_json(
      &desk,
      &alice,
      "subscribe",
      &json!({ "query": { "query": "windows", "user": "alice" } }),
    );
    assert!(response["error"].is_string());
  }
}
