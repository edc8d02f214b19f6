/*!
Configuration for deskmgr.

All values have sensible defaults. Create a custom config to override:

```
use deskmgr::{Config, Rect};

let config = Config {
    desktop_bounds: Rect::new(0.0, 0.0, 1920.0, 1040.0),
    ..Default::default()
};
assert_eq!(config.event_channel_capacity, 1000);
```
*/

use std::time::Duration;

use crate::types::{Rect, Size};

/// deskmgr configuration.
#[derive(Debug, Clone)]
pub struct Config {
  /// Capacity of the change-event broadcast channel.
  /// Default: 1000 events.
  pub event_channel_capacity: usize,

  /// Area a maximized window fills when the caller supplies none.
  /// Default: 1280x800 at the origin.
  pub desktop_bounds: Rect,

  /// Resize floor for windows.
  /// Default: 240x160.
  pub min_window_size: Size,

  /// Quiet period before a debounced local edit is committed.
  /// Default: 500ms.
  pub debounce: Duration,

  /// WebSocket server port.
  /// Default: 3030.
  pub ws_port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      event_channel_capacity: 1000,
      desktop_bounds: Rect::new(0.0, 0.0, 1280.0, 800.0),
      min_window_size: Size::new(240.0, 160.0),
      debounce: Duration::from_millis(500),
      ws_port: 3030,
    }
  }
}

impl Config {
  /// Create a new config with default values.
  pub fn new() -> Self {
    Self::default()
  }
}
