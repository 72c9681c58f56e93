pub mod region;
pub mod session;
pub mod timeline;

pub use region::{palette_color, Region, PALETTE};
pub use session::SessionSummary;
pub use timeline::{Timeline, TimelineEntry};
