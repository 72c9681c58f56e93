//! Display-space ↔ source-space coordinate math.
//!
//! Pointer events arrive in the coordinate system of the rendered video element,
//! which may be scaled or letterboxed. Regions are stored in source pixels so they
//! stay valid regardless of how the frame is currently displayed.

use serde::{Deserialize, Serialize};

use crate::camera::FrameSize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Axis-aligned bounding box of two corners, in any drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn meets_minimum(&self, min_size: f64) -> bool {
        self.width >= min_size && self.height >= min_size
    }
}

/// Bounding box of the rendered element, in the same space as pointer positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }
}

/// A rendered element together with the source resolution it displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub display: DisplayBox,
    pub source: FrameSize,
}

impl Viewport {
    pub fn new(display: DisplayBox, source: FrameSize) -> Self {
        Self { display, source }
    }

    /// Maps a pointer position to source pixels using `source / displayed` per axis.
    ///
    /// Returns `None` when the element has no visible area.
    pub fn to_source(&self, pointer: Point) -> Option<Point> {
        if self.display.width <= 0.0 || self.display.height <= 0.0 {
            return None;
        }

        let scale_x = f64::from(self.source.width) / self.display.width;
        let scale_y = f64::from(self.source.height) / self.display.height;

        Some(Point {
            x: (pointer.x - self.display.left) * scale_x,
            y: (pointer.y - self.display.top) * scale_y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_by_rendered_box_not_source() {
        let viewport = Viewport::new(DisplayBox::sized(640.0, 360.0), FrameSize::new(1280, 720));
        assert_eq!(
            viewport.to_source(Point::new(100.0, 50.0)),
            Some(Point::new(200.0, 100.0))
        );
    }

    #[test]
    fn subtracts_element_offset() {
        let viewport = Viewport::new(
            DisplayBox::new(20.0, 40.0, 640.0, 360.0),
            FrameSize::new(1280, 720),
        );
        assert_eq!(
            viewport.to_source(Point::new(20.0, 40.0)),
            Some(Point::new(0.0, 0.0))
        );
    }

    #[test]
    fn collapsed_element_has_no_mapping() {
        let viewport = Viewport::new(DisplayBox::sized(0.0, 360.0), FrameSize::new(1280, 720));
        assert_eq!(viewport.to_source(Point::new(1.0, 1.0)), None);
    }

    #[test]
    fn corners_normalise_in_any_direction() {
        let rect = Rect::from_corners(Point::new(300.0, 50.0), Point::new(100.0, 250.0));
        assert_eq!(
            rect,
            Rect {
                x: 100.0,
                y: 50.0,
                width: 200.0,
                height: 200.0
            }
        );
    }
}
