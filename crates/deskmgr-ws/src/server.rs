/*!
WebSocket server implementation.
*/

use async_broadcast::RecvError;
use axum::{
  extract::{
    ws::{Message, WebSocket, WebSocketUpgrade},
    Query as UrlQuery, State,
  },
  response::Response,
  routing::get,
  Router,
};
use deskmgr::{Desk, Event, UserId};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::session::Session;

/// Default WebSocket server port.
pub const DEFAULT_WS_PORT: u16 = 3030;

/// WebSocket state.
#[derive(Clone)]
pub struct WebSocketState {
  desk: Desk,
  port: u16,
}

impl std::fmt::Debug for WebSocketState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WebSocketState")
      .field("port", &self.port)
      .finish_non_exhaustive()
  }
}

impl WebSocketState {
  /// Create with the port from the desk's configuration.
  pub fn new(desk: Desk) -> Self {
    let port = desk.config().ws_port;
    Self::with_port(desk, port)
  }

  /// Create with custom port.
  pub const fn with_port(desk: Desk, port: u16) -> Self {
    Self { desk, port }
  }
}

/// Identity of the connecting user, taken as already authenticated.
#[derive(Debug, Deserialize)]
struct ConnectParams {
  user: String,
}

/// Start the WebSocket server. Returns only if binding or serving fails.
pub async fn start_server(ws_state: WebSocketState) -> std::io::Result<()> {
  let port = ws_state.port;

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods(Any)
    .allow_headers(Any);

  let app = Router::new()
    .route("/ws", get(websocket_handler))
    .layer(cors)
    .with_state(ws_state);

  let addr = format!("127.0.0.1:{port}");
  let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
    log::error!("Failed to bind WebSocket server to {addr}: {e}");
    e
  })?;

  log::info!("WebSocket server: ws://{addr}/ws?user=<id>");

  axum::serve(listener, app).await.map_err(|e| {
    log::error!("WebSocket server failed: {e}");
    e
  })
}

async fn websocket_handler(
  ws: WebSocketUpgrade,
  UrlQuery(params): UrlQuery<ConnectParams>,
  State(ws_state): State<WebSocketState>,
) -> Response {
  let user = UserId(params.user);
  ws.on_upgrade(move |socket| handle_websocket(socket, ws_state, user))
}

async fn handle_websocket(mut socket: WebSocket, ws_state: WebSocketState, user: UserId) {
  log::info!("[ws] {user} connected");
  let mut commits = ws_state.desk.subscribe_events();
  let mut session = Session::new(ws_state.desk, user.clone());

  loop {
    tokio::select! {
        msg = socket.recv() => {
            match msg {
                Some(Ok(Message::Text(text))) => {
                    let response = session.handle(&text).await;
                    // Results of this request's commits go out before its response.
                    for push in session.flush() {
                        drop(socket.send(Message::Text(push)).await);
                    }
                    drop(socket.send(Message::Text(response)).await);
                }
                Some(Ok(Message::Close(_))) | None => {
                    log::info!("[ws] {user} disconnected");
                    break;
                }
                Some(Err(e)) => {
                    log::warn!("[ws] {user} connection error: {e}");
                    break;
                }
                Some(Ok(_)) => {}
            }
        }

        event = commits.recv() => {
            match event {
                Ok(Event::Commit { .. }) => {}
                Ok(_) => continue,
                Err(RecvError::Overflowed(n)) => {
                    log::warn!("[ws] {user} lagged behind {n} events, resending latest results");
                }
                Err(RecvError::Closed) => break,
            }
            let mut failed = false;
            for push in session.flush() {
                if socket.send(Message::Text(push)).await.is_err() {
                    failed = true;
                    break;
                }
            }
            if failed {
                break;
            }
        }
    }
  }
}
