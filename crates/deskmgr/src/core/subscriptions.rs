/*!
Push delivery of query results.

Every distinct [`Query`] owns one `watch` channel shared by all of its
subscribers. After each commit, queries whose keys the commit touched are
re-evaluated against the committed state and the new result is published if
it differs from the last one. Subscribers therefore always converge on the
latest result and never see an older version after a newer one.
*/

use std::collections::HashMap;
use tokio::sync::watch;

use super::{evaluate, Desk};
use crate::store::{Registry, Tables, Touched};
use crate::types::{DeskError, DeskResult, Query, QueryResult, UserId, Versioned};

#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
  channels: HashMap<Query, watch::Sender<Versioned<QueryResult>>>,
}

impl SubscriptionRegistry {
  fn subscribe(
    &mut self,
    state: &Registry,
    query: &Query,
  ) -> watch::Receiver<Versioned<QueryResult>> {
    if let Some(tx) = self.channels.get(query) {
      return tx.subscribe();
    }
    let initial = Versioned::new(state.version(), evaluate(state, query));
    let (tx, rx) = watch::channel(initial);
    self.channels.insert(query.clone(), tx);
    rx
  }

  /// Re-evaluate the queries a commit touched and drop channels nobody
  /// listens to anymore.
  pub(crate) fn publish(&mut self, state: &Registry, touched: &Touched) {
    let version = state.version();
    for (query, tx) in &self.channels {
      if !touched.affects(query) {
        continue;
      }
      let result = evaluate(state, query);
      let sent = tx.send_if_modified(|current| {
        if current.value == result {
          return false;
        }
        *current = Versioned::new(version, result);
        true
      });
      if sent {
        log::trace!("Published {query:?} at version {version}");
      }
    }

    let before = self.channels.len();
    self.channels.retain(|_, tx| !tx.is_closed());
    let dropped = before - self.channels.len();
    if dropped > 0 {
      log::debug!("Dropped {dropped} idle subscription(s)");
    }
  }
}

/// A live query subscription.
///
/// Holds the latest delivered result; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
  query: Query,
  rx: watch::Receiver<Versioned<QueryResult>>,
}

impl Subscription {
  /// The query this subscription follows.
  pub fn query(&self) -> &Query {
    &self.query
  }

  /// The most recent result, without marking it seen.
  pub fn current(&self) -> Versioned<QueryResult> {
    self.rx.borrow().clone()
  }

  /// The most recent result, marking it seen.
  pub fn latest(&mut self) -> Versioned<QueryResult> {
    self.rx.borrow_and_update().clone()
  }

  /// A result delivered since the last call to [`latest`](Self::latest) or
  /// [`changed`](Self::changed), if any.
  pub fn latest_if_changed(&mut self) -> Option<Versioned<QueryResult>> {
    match self.rx.has_changed() {
      Ok(true) => Some(self.latest()),
      Ok(false) | Err(_) => None,
    }
  }

  /// Wait for the next delivery. Returns `None` once the desk is gone.
  pub async fn changed(&mut self) -> Option<Versioned<QueryResult>> {
    self.rx.changed().await.ok()?;
    Some(self.latest())
  }
}

impl Desk {
  /// Subscribe to a query on behalf of `caller`.
  ///
  /// The subscription starts with the current result. Queries about another
  /// user's data are rejected. A process that no longer exists yields an
  /// empty window list.
  pub fn subscribe(&self, caller: &UserId, query: Query) -> DeskResult<Subscription> {
    let state = self.state.read();
    authorize(&state, caller, &query)?;
    let rx = self.subscriptions.lock().subscribe(&state, &query);
    log::debug!("{caller} subscribed to {query:?}");
    Ok(Subscription { query, rx })
  }

  /// Number of queries with at least one live channel.
  pub fn subscription_count(&self) -> usize {
    self.subscriptions.lock().channels.len()
  }
}

fn authorize(state: &Registry, caller: &UserId, query: &Query) -> DeskResult<()> {
  match query {
    Query::Processes { user } | Query::Windows { user } | Query::ActiveWindow { user } => {
      if user == caller {
        Ok(())
      } else {
        Err(DeskError::not_owner(caller, format!("data of user {user}")))
      }
    }
    Query::WindowsForProcess { process } => match state.process(*process) {
      Some(p) if p.user_id != *caller => Err(DeskError::not_owner(caller, format!("process {process}"))),
      Some(_) | None => Ok(()),
    },
  }
}
