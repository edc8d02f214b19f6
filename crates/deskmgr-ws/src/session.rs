/*!
Per-connection state: the caller's identity and its live subscriptions.
*/

use deskmgr::{Desk, Query, Subscription, UserId};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::rpc::{self, QueryPush, RpcRequest, RpcResponse, SubscriptionId};

#[derive(Debug)]
pub(crate) struct Session {
  desk: Desk,
  user: UserId,
  subscriptions: HashMap<SubscriptionId, Subscription>,
  next_subscription: SubscriptionId,
}

impl Session {
  pub(crate) fn new(desk: Desk, user: UserId) -> Self {
    Self {
      desk,
      user,
      subscriptions: HashMap::new(),
      next_subscription: 1,
    }
  }

  /// Handle one `{id, method, args}` request and return the response text.
  pub(crate) async fn handle(&mut self, request: &str) -> String {
    let req: Value = match serde_json::from_str(request) {
      Ok(v) => v,
      Err(e) => return json!({ "error": format!("Invalid JSON: {}", e) }).to_string(),
    };

    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req
      .get("method")
      .and_then(Value::as_str)
      .unwrap_or("")
      .to_string();
    let args = req.get("args").cloned().unwrap_or(Value::Null);

    let mut response = match rpc::parse(&method, &args) {
      Ok(RpcRequest::Subscribe { query }) => rpc::respond(&method, self.subscribe(query)),
      Ok(RpcRequest::Unsubscribe { subscription }) => {
        rpc::respond(&method, self.unsubscribe(subscription))
      }
      Ok(request) => {
        let desk = self.desk.clone();
        let user = self.user.clone();
        let method = method.clone();
        tokio::task::spawn_blocking(move || {
          rpc::respond(&method, rpc::dispatch(&desk, &user, request))
        })
        .await
        .unwrap_or_else(|_| json!({ "error": "RPC task panicked" }))
      }
      Err(e) => e,
    };

    if let Some(obj) = response.as_object_mut() {
      obj.insert("id".to_string(), id);
    }
    response.to_string()
  }

  fn subscribe(&mut self, query: Query) -> Result<RpcResponse, String> {
    let mut subscription = self
      .desk
      .subscribe(&self.user, query)
      .map_err(|e| e.to_string())?;
    let id = self.next_subscription;
    self.next_subscription += 1;

    let initial = subscription.latest();
    self.subscriptions.insert(id, subscription);
    Ok(RpcResponse::Subscribed(QueryPush {
      subscription: id,
      version: initial.version,
      result: initial.value,
    }))
  }

  fn unsubscribe(&mut self, id: SubscriptionId) -> Result<RpcResponse, String> {
    self
      .subscriptions
      .remove(&id)
      .ok_or_else(|| format!("Unknown subscription {id}"))?;
    Ok(RpcResponse::Null)
  }

  /// Push messages for every subscription with an undelivered result.
  pub(crate) fn flush(&mut self) -> Vec<String> {
    let mut pushes = Vec::new();
    for (id, subscription) in &mut self.subscriptions {
      let Some(update) = subscription.latest_if_changed() else {
        continue;
      };
      let push = QueryPush {
        subscription: *id,
        version: update.version,
        result: update.value,
      };
      match serde_json::to_string(&json!({ "event": "query:result", "data": push })) {
        Ok(json) => pushes.push(json),
        Err(e) => log::error!("[ws] Failed to encode push for subscription {id}: {e}"),
      }
    }
    pushes
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request(id: u64, method: &str, args: Value) -> String {
    json!({ "id": id, "method": method, "args": args }).to_string()
  }

  async fn call(session: &mut Session, id: u64, method: &str, args: Value) -> Value {
    let response = session.handle(&request(id, method, args)).await;
    serde_json::from_str(&response).unwrap()
  }

  #[tokio::test]
  async fn subscription_pushes_after_commit() {
    let desk = Desk::new();
    let mut session = Session::new(desk, UserId::from("alice"));

    let subscribed = call(
      &mut session,
      1,
      "subscribe",
      json!({ "query": { "query": "windows", "user": "alice" } }),
    )
    .await;
    assert_eq!(subscribed["id"], 1);
    assert_eq!(subscribed["result"]["subscription"], 1);
    assert_eq!(subscribed["result"]["result"], json!([]));
    assert!(session.flush().is_empty(), "initial result is in the response");

    let started = call(
      &mut session,
      2,
      "start_process",
      json!({ "spec": { "props": { "kind": "chat", "thread_id": "t1", "attachments": [] } } }),
    )
    .await;
    assert!(started["result"].is_number(), "got {started}");

    let pushes = session.flush();
    assert_eq!(pushes.len(), 1);
    let push: Value = serde_json::from_str(&pushes[0]).unwrap();
    assert_eq!(push["event"], "query:result");
    assert_eq!(push["data"]["subscription"], 1);
    assert_eq!(push["data"]["result"].as_array().map(Vec::len), Some(1));
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn commit_event_follows_subscription_refresh() {
    let desk = Desk::new();
    let alice = UserId::from("alice");
    let mut session = Session::new(desk.clone(), alice.clone());
    call(
      &mut session,
      1,
      "start_process",
      json!({ "spec": { "props": { "kind": "chat", "thread_id": "t1", "attachments": [] } } }),
    )
    .await;
    call(
      &mut session,
      2,
      "subscribe",
      json!({ "query": { "query": "windows", "user": "alice" } }),
    )
    .await;
    let window = desk.list_windows(&alice)[0].id;
    let mut events = desk.subscribe_events();

    for step in 1..=200 {
      let other = desk.clone();
      let user = alice.clone();
      let rect = deskmgr::Rect::new(f64::from(step), 0.0, 400.0, 300.0);
      tokio::task::spawn_blocking(move || other.update_geometry(&user, window, rect))
        .await
        .unwrap()
        .unwrap();
      loop {
        if let deskmgr::Event::Commit { .. } = events.recv().await.unwrap() {
          break;
        }
      }
      assert_eq!(session.flush().len(), 1, "commit {step} was not pushed");
    }
  }

  #[tokio::test]
  async fn unsubscribe_stops_pushes() {
    let desk = Desk::new();
    let mut session = Session::new(desk, UserId::from("alice"));
    call(
      &mut session,
      1,
      "subscribe",
      json!({ "query": { "query": "processes", "user": "alice" } }),
    )
    .await;

    let response = call(&mut session, 2, "unsubscribe", json!({ "subscription": 1 })).await;
    assert!(response["result"].is_null());
    call(
      &mut session,
      3,
      "start_process",
      json!({ "spec": { "props": { "kind": "text_preview", "file": null, "text": "" } } }),
    )
    .await;
    assert!(session.flush().is_empty());

    let response = call(&mut session, 4, "unsubscribe", json!({ "subscription": 1 })).await;
    assert!(response["error"].is_string());
  }

  #[tokio::test]
  async fn foreign_subscription_is_refused() {
    let mut session = Session::new(Desk::new(), UserId::from("alice"));
    let response = call(
      &mut session,
      1,
      "subscribe",
      json!({ "query": { "query": "windows", "user": "bob" } }),
    )
    .await;
    assert_eq!(response["id"], 1);
    assert!(response["error"].as_str().unwrap().contains("does not own"));
  }

  #[tokio::test]
  async fn malformed_json_is_reported() {
    let mut session = Session::new(Desk::new(), UserId::from("alice"));
    let response: Value = serde_json::from_str(&session.handle("{nope").await).unwrap();
    assert!(response["error"].as_str().unwrap().starts_with("Invalid JSON"));
  }
}
