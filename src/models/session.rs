use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing entry for a recorded session. Only `session_id` is meaningful to the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub total_frames: Option<u64>,
    pub unique_outputs: Option<u64>,
    pub last_updated: Option<DateTime<Utc>>,
}
