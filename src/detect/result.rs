use serde::Serialize;

use crate::geometry::Point;

/// Axis-aligned box in pixel coordinates; `x2`/`y2` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_xywh(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self::new(x, y, x + w as i32, y + h as i32)
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// Center with floor division, so a 1px-wide box is centered on its own column.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x1 + self.x2).div_euclid(2),
            (self.y1 + self.y2).div_euclid(2),
        )
    }
}

/// A region the classifier believes is a person.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }

    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}
