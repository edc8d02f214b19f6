/*!
Geometry engine for direct manipulation.

Pure functions: given the rectangle at the start of an interaction and the
pointer delta since then, compute the rectangle to show. Nothing here touches
shared state; callers commit the final rectangle once the pointer is released.
*/

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Point, Rect, Size};

/// Edge or corner grabbed during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ResizeEdge {
  #[serde(rename = "n")]
  North,
  #[serde(rename = "s")]
  South,
  #[serde(rename = "e")]
  East,
  #[serde(rename = "w")]
  West,
  #[serde(rename = "ne")]
  NorthEast,
  #[serde(rename = "nw")]
  NorthWest,
  #[serde(rename = "se")]
  SouthEast,
  #[serde(rename = "sw")]
  SouthWest,
}

/// Which side of an axis the pointer is dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisGrip {
  /// Left or top edge moves, right or bottom edge is the anchor.
  Leading,
  /// Right or bottom edge moves, left or top edge is the anchor.
  Trailing,
  /// Axis not affected.
  Fixed,
}

impl ResizeEdge {
  pub const ALL: [ResizeEdge; 8] = [
    ResizeEdge::North,
    ResizeEdge::South,
    ResizeEdge::East,
    ResizeEdge::West,
    ResizeEdge::NorthEast,
    ResizeEdge::NorthWest,
    ResizeEdge::SouthEast,
    ResizeEdge::SouthWest,
  ];

  const fn horizontal(self) -> AxisGrip {
    match self {
      ResizeEdge::West | ResizeEdge::NorthWest | ResizeEdge::SouthWest => AxisGrip::Leading,
      ResizeEdge::East | ResizeEdge::NorthEast | ResizeEdge::SouthEast => AxisGrip::Trailing,
      ResizeEdge::North | ResizeEdge::South => AxisGrip::Fixed,
    }
  }

  const fn vertical(self) -> AxisGrip {
    match self {
      ResizeEdge::North | ResizeEdge::NorthEast | ResizeEdge::NorthWest => AxisGrip::Leading,
      ResizeEdge::South | ResizeEdge::SouthEast | ResizeEdge::SouthWest => AxisGrip::Trailing,
      ResizeEdge::East | ResizeEdge::West => AxisGrip::Fixed,
    }
  }
}

/// Constraints applied while resizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeLimits {
  /// Floor for width and height.
  pub min: Size,
  /// Bounds the dragged edges may not cross.
  pub container: Option<Rect>,
}

impl ResizeLimits {
  pub const fn new(min: Size) -> Self {
    Self {
      min,
      container: None,
    }
  }

  #[must_use]
  pub const fn within(mut self, container: Rect) -> Self {
    self.container = Some(container);
    self
  }
}

/// Move a rectangle by the pointer delta, optionally kept inside `container`.
pub fn drag(start: Rect, delta: Point, container: Option<Rect>) -> Rect {
  let moved = start.offset(delta);
  match container {
    Some(container) => moved.clamp_within(container),
    None => moved,
  }
}

/// Resize `start` by dragging `edge` by `delta`.
///
/// The edge opposite the grip never moves. When the floor kicks in the
/// dragged edge stops at `anchor - min`, so a window shrunk past its minimum
/// stays put instead of sliding.
pub fn resize(start: Rect, edge: ResizeEdge, delta: Point, limits: ResizeLimits) -> Rect {
  let (x, width) = resize_axis(
    start.x,
    start.width,
    delta.x,
    limits.min.width,
    limits.container.map(|c| (c.x, c.right())),
    edge.horizontal(),
  );
  let (y, height) = resize_axis(
    start.y,
    start.height,
    delta.y,
    limits.min.height,
    limits.container.map(|c| (c.y, c.bottom())),
    edge.vertical(),
  );
  Rect::new(x, y, width, height)
}

/// One-dimensional resize. Returns the new `(origin, length)`.
fn resize_axis(
  origin: f64,
  length: f64,
  delta: f64,
  min: f64,
  bounds: Option<(f64, f64)>,
  grip: AxisGrip,
) -> (f64, f64) {
  match grip {
    AxisGrip::Fixed => (origin, length),
    AxisGrip::Leading => {
      let anchor = origin + length;
      let mut edge = origin + delta;
      if let Some((lo, _)) = bounds {
        edge = edge.max(lo);
      }
      edge = edge.min(anchor - min);
      (edge, anchor - edge)
    }
    AxisGrip::Trailing => {
      let anchor = origin;
      let mut edge = origin + length + delta;
      if let Some((_, hi)) = bounds {
        edge = edge.min(hi);
      }
      edge = edge.max(anchor + min);
      (anchor, edge - anchor)
    }
  }
}

#[cfg(test)]
const MIN: Size = Size::new(240.0, 160.0);


#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::prelude::*;

  fn edge() -> impl Strategy<Value = ResizeEdge> {
    prop::sample::select(ResizeEdge::ALL.to_vec())
  }

  proptest! {
    /// Resizing never drops below the floor and never moves the anchor edges.
    #[test]
    fn resize_respects_floor_and_anchor(
      x in -2000.0..2000.0f64, y in -2000.0..2000.0f64,
      w in 240.0..2000.0f64, h in 160.0..2000.0f64,
      dx in -3000.0..3000.0f64, dy in -3000.0..3000.0f64,
      edge in edge()
    ) {
      let start = Rect::new(x, y, w, h);
      let rect = resize(start, edge, Point::new(dx, dy), ResizeLimits::new(MIN));

      prop_assert!(rect.width >= MIN.width - 1e-9);
      prop_assert!(rect.height >= MIN.height - 1e-9);

      match edge.horizontal() {
        AxisGrip::Leading => prop_assert!((rect.right() - start.right()).abs() < 1e-6),
        AxisGrip::Trailing => prop_assert!((rect.x - start.x).abs() < 1e-9),
        AxisGrip::Fixed => prop_assert_eq!((rect.x, rect.width), (start.x, start.width)),
      }
      match edge.vertical() {
        AxisGrip::Leading => prop_assert!((rect.bottom() - start.bottom()).abs() < 1e-6),
        AxisGrip::Trailing => prop_assert!((rect.y - start.y).abs() < 1e-9),
        AxisGrip::Fixed => prop_assert_eq!((rect.y, rect.height), (start.y, start.height)),
      }
    }
  }
}
