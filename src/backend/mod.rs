//! Collaborator seams: session registry, detection submission and historical
//! retrieval. [`HttpBackend`] implements all three against the capture server.

mod http;
mod wire;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Region, SessionSummary, Timeline};
use crate::sensing::EncodedFrame;
use crate::timeline::CaptureStats;

pub use http::HttpBackend;

/// Text detected in each region for one submitted frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionReply {
    /// Region index → detected text. Missing or empty means nothing was read.
    pub per_region_text: BTreeMap<usize, String>,
    /// Server verdict on whether this frame's output was new for the session.
    pub is_unique: Option<bool>,
    pub totals: Option<CaptureStats>,
}

/// Where the recorded video of a session can be played from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaLocator {
    pub url: String,
}

#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn start_session(&self, session_id: &str, regions: &[Region]) -> Result<()>;

    async fn stop_session(&self, session_id: &str) -> Result<()>;

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn submit_frame(
        &self,
        session_id: &str,
        frame: &EncodedFrame,
        regions: &[Region],
    ) -> Result<DetectionReply>;
}

#[async_trait]
pub trait HistoricalArchive: Send + Sync {
    async fn fetch_timeline(&self, session_id: &str) -> Result<Timeline>;

    async fn fetch_regions(&self, session_id: &str) -> Result<Vec<Region>>;

    async fn fetch_replay_media(&self, session_id: &str) -> Result<MediaLocator>;
}
