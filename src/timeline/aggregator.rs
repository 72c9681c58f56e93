use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Timeline, TimelineEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New newest entry for the region.
    Inserted,
    /// Same text as the current newest entry; nothing recorded.
    Duplicate,
    /// Empty or whitespace-only text.
    Blank,
    /// Older than the latest reading seen for the region (late reply from an
    /// earlier tick).
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStats {
    pub total_frames: u64,
    pub unique_frames: u64,
}

/// Per-region, newest-first, run-length-deduplicated log of detected text.
#[derive(Debug, Default)]
pub struct TimelineAggregator {
    timeline: Timeline,
    /// Latest tick time seen per region, duplicates included.
    observed: BTreeMap<usize, DateTime<Utc>>,
    stats: CaptureStats,
}

impl TimelineAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, region_index: usize, text: &str, timestamp: DateTime<Utc>) -> MergeOutcome {
        if text.trim().is_empty() {
            return MergeOutcome::Blank;
        }

        if self
            .observed
            .get(&region_index)
            .is_some_and(|latest| timestamp < *latest)
        {
            return MergeOutcome::Stale;
        }
        self.observed.insert(region_index, timestamp);

        let entries = self.timeline.entry(region_index).or_default();
        if entries.first().is_some_and(|newest| newest.text == text) {
            return MergeOutcome::Duplicate;
        }

        entries.insert(
            0,
            TimelineEntry {
                region_index,
                timestamp,
                text: text.to_string(),
            },
        );
        MergeOutcome::Inserted
    }

    /// Counts one applied detection reply. Server-reported totals win over local
    /// counting; replies may arrive out of order so totals never move backwards.
    pub fn record_frame(&mut self, is_unique: bool, server_totals: Option<CaptureStats>) {
        match server_totals {
            Some(totals) => {
                self.stats.total_frames = self.stats.total_frames.max(totals.total_frames);
                self.stats.unique_frames = self.stats.unique_frames.max(totals.unique_frames);
            }
            None => {
                self.stats.total_frames += 1;
                if is_unique {
                    self.stats.unique_frames += 1;
                }
            }
        }
    }

    /// Substitutes a full snapshot, normalised to the same invariants `merge` keeps.
    pub fn replace(&mut self, snapshot: Timeline) {
        self.timeline = snapshot
            .into_iter()
            .map(|(region_index, entries)| (region_index, normalise(region_index, entries)))
            .filter(|(_, entries)| !entries.is_empty())
            .collect();
        self.observed = self
            .timeline
            .iter()
            .filter_map(|(index, entries)| Some((*index, entries.first()?.timestamp)))
            .collect();
        self.stats = CaptureStats::default();
    }

    pub fn clear(&mut self) {
        self.timeline.clear();
        self.observed.clear();
        self.stats = CaptureStats::default();
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn entries(&self, region_index: usize) -> &[TimelineEntry] {
        self.timeline
            .get(&region_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn latest(&self, region_index: usize) -> Option<&TimelineEntry> {
        self.entries(region_index).first()
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.values().all(Vec::is_empty)
    }
}

fn normalise(region_index: usize, mut entries: Vec<TimelineEntry>) -> Vec<TimelineEntry> {
    entries.retain(|entry| !entry.text.trim().is_empty());
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    // Oldest first: keep the first entry of every run, as incremental merging would.
    let mut kept: Vec<TimelineEntry> = Vec::with_capacity(entries.len());
    for mut entry in entries {
        if kept.last().is_some_and(|last| last.text == entry.text) {
            continue;
        }
        entry.region_index = region_index;
        kept.push(entry);
    }

    kept.reverse();
    kept
}
