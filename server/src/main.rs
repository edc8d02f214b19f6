//! deskmgr server: one shared desk served over WebSocket.
//!
//! Environment:
//! - `DESKMGR_PORT` - WebSocket port (default 3030)
//! - `DESKMGR_DESKTOP_WIDTH` / `DESKMGR_DESKTOP_HEIGHT` - bounds maximized windows fill
//! - `RUST_LOG` - log filter (default `info`)

use deskmgr::{Config, Desk, Rect};
use deskmgr_ws::WebSocketState;
use std::str::FromStr;

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparsable {name}={raw}");
            default
        }),
        Err(_) => default,
    }
}

fn config_from_env() -> Config {
    let defaults = Config::default();
    let bounds = defaults.desktop_bounds;
    Config {
        ws_port: env_or("DESKMGR_PORT", defaults.ws_port),
        desktop_bounds: Rect::new(
            bounds.x,
            bounds.y,
            env_or("DESKMGR_DESKTOP_WIDTH", bounds.width),
            env_or("DESKMGR_DESKTOP_HEIGHT", bounds.height),
        ),
        ..defaults
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let desk = Desk::builder().config(config_from_env()).build();
    log::info!(
        "Desktop bounds {:?}, debounce {:?}",
        desk.config().desktop_bounds,
        desk.config().debounce
    );

    if let Err(e) = deskmgr_ws::start_server(WebSocketState::new(desk)).await {
        log::error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
