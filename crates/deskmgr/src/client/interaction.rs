/*!
Pointer-driven move and resize.

Sessions compute the rectangle to show on every pointer move without talking
to the store. `finish` yields the rectangle to commit; dropping a session
abandons it with no effect.
*/

use crate::motion::{self, ResizeEdge, ResizeLimits};
use crate::types::{Point, Rect, WindowId};

/// Pointer travel below this is treated as a click, not a drag.
pub const DRAG_THRESHOLD: f64 = 3.0;

/// A pointer drag of one window.
#[derive(Debug, Clone)]
pub struct DragSession {
  window: WindowId,
  start: Rect,
  origin: Point,
  container: Option<Rect>,
  current: Rect,
  moved: bool,
}

impl DragSession {
  /// Drag starting with the pointer at `pointer`.
  pub const fn begin(window: WindowId, start: Rect, pointer: Point) -> Self {
    Self {
      window,
      start,
      origin: pointer,
      container: None,
      current: start,
      moved: false,
    }
  }

  /// Keep the window inside `container` while dragging.
  #[must_use]
  pub const fn within(mut self, container: Rect) -> Self {
    self.container = Some(container);
    self
  }

  pub const fn window(&self) -> WindowId {
    self.window
  }

  pub fn update(&mut self, pointer: Point) -> Rect {
    self.moved |= pointer.moved_from(self.origin, DRAG_THRESHOLD);
    if self.moved {
      self.current = motion::drag(self.start, pointer.delta_from(self.origin), self.container);
    }
    self.current
  }

  pub const fn current(&self) -> Rect {
    self.current
  }

  /// Rectangle to commit, or `None` if the pointer never really moved.
  pub fn finish(self) -> Option<Rect> {
    (self.moved && self.current != self.start).then_some(self.current)
  }
}

/// A pointer resize of one window from one edge.
#[derive(Debug, Clone)]
pub struct ResizeSession {
  window: WindowId,
  start: Rect,
  edge: ResizeEdge,
  origin: Point,
  limits: ResizeLimits,
  current: Rect,
}

impl ResizeSession {
  pub const fn begin(
    window: WindowId,
    start: Rect,
    edge: ResizeEdge,
    pointer: Point,
    limits: ResizeLimits,
  ) -> Self {
    Self {
      window,
      start,
      edge,
      origin: pointer,
      limits,
      current: start,
    }
  }

  pub const fn window(&self) -> WindowId {
    self.window
  }

  pub fn update(&mut self, pointer: Point) -> Rect {
    self.current = motion::resize(
      self.start,
      self.edge,
      pointer.delta_from(self.origin),
      self.limits,
    );
    self.current
  }

  pub const fn current(&self) -> Rect {
    self.current
  }

  /// Rectangle to commit, or `None` if nothing changed.
  pub fn finish(self) -> Option<Rect> {
    (self.current != self.start).then_some(self.current)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Size;

  #[test]
  fn small_jitter_is_not_a_drag() {
    let start = Rect::new(10.0, 10.0, 300.0, 200.0);
    let mut drag = DragSession::begin(WindowId(1), start, Point::new(50.0, 50.0));
    assert_eq!(drag.update(Point::new(51.0, 50.0)), start);
    assert_eq!(drag.finish(), None);
  }

  #[test]
  fn drag_follows_pointer_from_origin() {
    let start = Rect::new(10.0, 10.0, 300.0, 200.0);
    let mut drag = DragSession::begin(WindowId(1), start, Point::new(50.0, 50.0));
    drag.update(Point::new(60.0, 80.0));
    drag.update(Point::new(150.0, 70.0));
    assert_eq!(drag.finish(), Some(Rect::new(110.0, 30.0, 300.0, 200.0)));
  }

  #[test]
  fn resize_floor_keeps_left_edge() {
    let limits = ResizeLimits::new(Size::new(240.0, 160.0));
    let start = Rect::new(100.0, 100.0, 300.0, 200.0);
    let mut resize = ResizeSession::begin(
      WindowId(1),
      start,
      ResizeEdge::East,
      Point::new(400.0, 150.0),
      limits,
    );

    let rect = resize.update(Point::new(0.0, 150.0));
    assert_eq!(rect.width, 240.0);
    assert_eq!(rect.x, 100.0);
    assert_eq!(resize.finish(), Some(Rect::new(100.0, 100.0, 240.0, 200.0)));
  }

  #[test]
  fn abandoned_resize_yields_nothing() {
    let limits = ResizeLimits::new(Size::new(240.0, 160.0));
    let start = Rect::new(0.0, 0.0, 300.0, 200.0);
    let resize = ResizeSession::begin(WindowId(1), start, ResizeEdge::SouthEast, Point::default(), limits);
    assert_eq!(resize.finish(), None);
  }
}
