//! Selection geometry in CSS pixels. Pure, no DOM.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Viewport-relative rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square spanned by a drag from `anchor` to `current`.
    ///
    /// The side is `min(|dx|, |dy|)`. The square always sits on the anchor's
    /// corner facing the pointer, so all four drag directions work.
    pub fn square_from_drag(anchor: Point, current: Point) -> Self {
        let size = (current.x - anchor.x)
            .abs()
            .min((current.y - anchor.y).abs());
        let left = if current.x < anchor.x {
            anchor.x - size
        } else {
            anchor.x
        };
        let top = if current.y < anchor.y {
            anchor.y - size
        } else {
            anchor.y
        };
        Self::new(left, top, size, size)
    }

    pub fn meets_minimum(&self, min_size: f64) -> bool {
        self.width >= min_size && self.height >= min_size
    }
}
