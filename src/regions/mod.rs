pub mod editor;
pub mod geometry;
pub mod render;

pub use editor::{RegionEditor, MIN_REGION_SIZE};
pub use geometry::{DisplayBox, Point, Rect, Viewport};
pub use render::{render, DrawCommand};
