use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub region_index: usize,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Region index → entries, newest first.
pub type Timeline = BTreeMap<usize, Vec<TimelineEntry>>;
