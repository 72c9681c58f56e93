pub mod backend;
pub mod camera;
pub mod error;
pub mod events;
pub mod models;
pub mod regions;
pub mod replay;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod timeline;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    DetectionReply, DetectionService, HistoricalArchive, HttpBackend, MediaLocator, SessionRegistry,
};
pub use camera::{Camera, FrameSize, PixelSource, StillCamera, StillImageSource};
pub use error::{CaptureError, CaptureResult};
pub use events::{SessionEvent, StatusLevel};
pub use models::{Region, SessionSummary, Timeline, TimelineEntry};
pub use regions::{DisplayBox, DrawCommand, Point, RegionEditor, Viewport};
pub use replay::{ReplayCoordinator, ReplayState};
pub use sensing::{EncodedFrame, FrameSampler, FrameSink};
pub use session::{ControllerSnapshot, SessionController, SessionStatus};
pub use settings::{CaptureSettings, SettingsStore};
pub use timeline::{CaptureStats, MergeOutcome, TimelineAggregator};
pub use utils::logging::init_logging;
