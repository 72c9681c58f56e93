use serde::{Deserialize, Serialize};

use crate::regions::Rect;

/// Outline colors, handed out cyclically in creation order.
pub const PALETTE: [&str; 6] = [
    "#ff6b6b", "#4ecdc4", "#45b7d1", "#f7dc6f", "#bb8fce", "#85c1e2",
];

/// Color for the region created at `ordinal` (zero-based).
pub fn palette_color(ordinal: usize) -> &'static str {
    PALETTE[ordinal % PALETTE.len()]
}

/// A user-drawn rectangle in source-pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,
    pub label: String,
}

impl Region {
    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}
