/*! Geometry types for desktop coordinates. */

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A 2D point (or pointer delta) in desktop coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  /// Vector from `origin` to this point.
  pub fn delta_from(&self, origin: Point) -> Point {
    Point::new(self.x - origin.x, self.y - origin.y)
  }

  /// Check if this point moved more than threshold from another.
  pub fn moved_from(&self, other: Point, threshold: f64) -> bool {
    (self.x - other.x).abs() >= threshold || (self.y - other.y).abs() >= threshold
  }
}

/// Width and height pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Size {
  pub width: f64,
  pub height: f64,
}

impl Size {
  pub const fn new(width: f64, height: f64) -> Self {
    Self { width, height }
  }
}

/// Window rectangle in desktop coordinates.
///
/// Always committed as a whole: position and size travel together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Rect {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl Rect {
  pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn right(&self) -> f64 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f64 {
    self.y + self.height
  }

  /// Same size, moved by `delta`.
  pub fn offset(&self, delta: Point) -> Rect {
    Rect {
      x: self.x + delta.x,
      y: self.y + delta.y,
      ..*self
    }
  }

  /// Shrink and shift this rectangle so it lies inside `container`.
  ///
  /// Size is capped first, then the origin is pulled back inside.
  pub fn clamp_within(&self, container: Rect) -> Rect {
    let width = self.width.min(container.width);
    let height = self.height.min(container.height);
    let x = self.x.clamp(container.x, container.right() - width);
    let y = self.y.clamp(container.y, container.bottom() - height);
    Rect::new(x, y, width, height)
  }
}
