pub mod aggregator;

pub use aggregator::{CaptureStats, MergeOutcome, TimelineAggregator};
