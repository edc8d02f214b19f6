/*! deskmgr JSON-RPC over WebSocket. */

mod rpc;
mod server;
mod session;

pub use rpc::{dispatch, dispatch_json, QueryPush, RpcRequest, RpcResponse, SubscriptionId};
pub use server::{start_server, WebSocketState, DEFAULT_WS_PORT};
