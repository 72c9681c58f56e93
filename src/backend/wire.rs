//! JSON bodies exchanged with the capture server.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{palette_color, Region, SessionSummary, Timeline, TimelineEntry};
use crate::timeline::CaptureStats;

use super::DetectionReply;

#[derive(Debug, Serialize)]
pub(super) struct ProcessFrameRequest<'a> {
    pub image: String,
    pub regions: &'a [Region],
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct StartSessionRequest<'a> {
    pub session_id: &'a str,
    pub regions: &'a [Region],
}

#[derive(Debug, Serialize)]
pub(super) struct StopSessionRequest<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProcessFrameResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<RegionResult>,
    #[serde(default)]
    pub is_unique: Option<bool>,
    #[serde(default)]
    pub total_frames: Option<u64>,
    #[serde(default)]
    pub unique_frames: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RegionResult {
    pub region_id: usize,
    #[serde(default)]
    pub detected_text: Option<String>,
}

impl ProcessFrameResponse {
    pub fn into_reply(self) -> Result<DetectionReply> {
        if !self.success {
            bail!(self.error.unwrap_or_else(|| "server error".to_string()));
        }

        let per_region_text = self
            .results
            .into_iter()
            .map(|result| (result.region_id, result.detected_text.unwrap_or_default()))
            .collect();

        let totals = match (self.total_frames, self.unique_frames) {
            (Some(total_frames), Some(unique_frames)) => Some(CaptureStats {
                total_frames,
                unique_frames,
            }),
            _ => None,
        };

        Ok(DetectionReply {
            per_region_text,
            is_unique: self.is_unique,
            totals,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SessionsResponse {
    #[serde(default)]
    pub sessions: Vec<WireSessionSummary>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireSessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub total_frames: Option<u64>,
    #[serde(default)]
    pub unique_outputs: Option<u64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl From<WireSessionSummary> for SessionSummary {
    fn from(wire: WireSessionSummary) -> Self {
        Self {
            last_updated: wire.last_updated.as_deref().and_then(parse_timestamp),
            session_id: wire.session_id,
            total_frames: wire.total_frames,
            unique_outputs: wire.unique_outputs,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TimelineResponse {
    #[serde(default)]
    pub timeline: BTreeMap<String, Vec<WireTimelineEntry>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireTimelineEntry {
    pub timestamp: String,
    #[serde(default)]
    pub text: String,
}

impl TimelineResponse {
    pub fn into_timeline(self) -> Result<Timeline> {
        let mut timeline = Timeline::new();
        for (key, entries) in self.timeline {
            let region_index: usize = key
                .parse()
                .map_err(|_| anyhow!("invalid region index '{key}' in timeline"))?;

            let entries = entries
                .into_iter()
                .map(|entry| {
                    let timestamp = parse_timestamp(&entry.timestamp).ok_or_else(|| {
                        anyhow!("invalid timestamp '{}' in timeline", entry.timestamp)
                    })?;
                    Ok(TimelineEntry {
                        region_index,
                        timestamp,
                        text: entry.text,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            timeline.insert(region_index, entries);
        }
        Ok(timeline)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RegionsResponse {
    #[serde(default)]
    pub regions: Vec<WireRegion>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireRegion {
    #[serde(default)]
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl RegionsResponse {
    /// Fills identity, color and label the way the editor would have assigned them.
    pub fn into_regions(self) -> Vec<Region> {
        self.regions
            .into_iter()
            .enumerate()
            .map(|(ordinal, wire)| Region {
                id: wire.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                x: wire.x,
                y: wire.y,
                width: wire.width,
                height: wire.height,
                color: wire
                    .color
                    .unwrap_or_else(|| palette_color(ordinal).to_string()),
                label: wire.label.unwrap_or_else(|| format!("Region {}", ordinal + 1)),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct VideoResponse {
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AckResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl AckResponse {
    pub fn into_result(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            bail!(self.error.unwrap_or_else(|| "server error".to_string()))
        }
    }
}

/// Accepts RFC 3339 or a bare ISO-8601 local time (treated as UTC).
pub(super) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_frame_reply_maps_regions_and_totals() {
        let body = r#"{
            "success": true,
            "results": [
                {"region_id": 0, "label": "Region 1", "detected_text": "42.0 kg",
                 "timestamp": "2024-03-01T10:00:00.250000"},
                {"region_id": 1, "label": "Region 2", "detected_text": "",
                 "timestamp": "2024-03-01T10:00:00.300000"}
            ],
            "is_unique": true,
            "total_frames": 12,
            "unique_frames": 4,
            "output_hash": "abc"
        }"#;

        let reply = serde_json::from_str::<ProcessFrameResponse>(body)
            .unwrap()
            .into_reply()
            .unwrap();

        assert_eq!(reply.per_region_text.get(&0).map(String::as_str), Some("42.0 kg"));
        assert_eq!(reply.per_region_text.get(&1).map(String::as_str), Some(""));
        assert_eq!(reply.is_unique, Some(true));
        assert_eq!(
            reply.totals,
            Some(CaptureStats {
                total_frames: 12,
                unique_frames: 4
            })
        );
    }

    #[test]
    fn failed_process_frame_is_an_error() {
        let body = r#"{"success": false, "error": "'image'"}"#;
        let err = serde_json::from_str::<ProcessFrameResponse>(body)
            .unwrap()
            .into_reply()
            .unwrap_err();
        assert_eq!(err.to_string(), "'image'");
    }

    #[test]
    fn timeline_keys_become_region_indices() {
        let body = r#"{"timeline": {
            "0": [{"timestamp": "2024-03-01T10:00:02Z", "text": "B"},
                  {"timestamp": "2024-03-01T10:00:01Z", "text": "A"}],
            "2": [{"timestamp": "2024-03-01T10:00:01", "text": "C"}]
        }}"#;
        let timeline = serde_json::from_str::<TimelineResponse>(body)
            .unwrap()
            .into_timeline()
            .unwrap();

        assert_eq!(timeline[&0].len(), 2);
        assert_eq!(timeline[&2][0].region_index, 2);
        assert_eq!(timeline[&2][0].text, "C");
    }

    #[test]
    fn bad_timeline_key_is_rejected() {
        let body = r#"{"timeline": {"first": []}}"#;
        assert!(serde_json::from_str::<TimelineResponse>(body)
            .unwrap()
            .into_timeline()
            .is_err());
    }

    #[test]
    fn regions_missing_metadata_get_editor_defaults() {
        let body = r##"{"regions": [
            {"x": 1, "y": 2, "width": 30, "height": 40},
            {"id": "r2", "x": 5, "y": 5, "width": 50, "height": 50, "color": "#000000", "label": "Total"}
        ]}"##;
        let regions = serde_json::from_str::<RegionsResponse>(body)
            .unwrap()
            .into_regions();

        assert_eq!(regions[0].label, "Region 1");
        assert_eq!(regions[0].color, "#ff6b6b");
        assert!(!regions[0].id.is_empty());
        assert_eq!(regions[1].id, "r2");
        assert_eq!(regions[1].label, "Total");
        assert_eq!(regions[1].color, "#000000");
    }

    #[test]
    fn session_listing_parses_optional_fields() {
        let body = r#"{"sessions": [
            {"session_id": "s1", "total_frames": 3, "unique_outputs": 2,
             "last_updated": "2024-03-01T10:00:00.000001"},
            {"session_id": "s2", "total_frames": 0, "unique_outputs": 0, "last_updated": null}
        ]}"#;
        let sessions: Vec<SessionSummary> = serde_json::from_str::<SessionsResponse>(body)
            .unwrap()
            .sessions
            .into_iter()
            .map(SessionSummary::from)
            .collect();

        assert_eq!(sessions[0].session_id, "s1");
        assert!(sessions[0].last_updated.is_some());
        assert_eq!(sessions[1].last_updated, None);
    }

    #[test]
    fn ack_defaults_to_success() {
        assert!(serde_json::from_str::<AckResponse>("{}")
            .unwrap()
            .into_result()
            .is_ok());
        assert!(serde_json::from_str::<AckResponse>(r#"{"success": false}"#)
            .unwrap()
            .into_result()
            .is_err());
    }
}
