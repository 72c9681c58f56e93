use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::backend::{DetectionReply, DetectionService};
use crate::events::{EventBus, SessionEvent, StatusLevel};
use crate::models::{Region, TimelineEntry};
use crate::sensing::{EncodedFrame, FrameSink};
use crate::timeline::{MergeOutcome, TimelineAggregator};
use crate::utils::sync::lock;

use super::state::SessionState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Turns sampler frames into detection submissions for one recording.
///
/// Every frame is submitted on its own task, so replies can land in any order.
/// A reply is applied only while its session is still the live recording.
pub(crate) struct SubmissionDispatcher {
    ctx: Arc<DispatchContext>,
}

struct DispatchContext {
    session_id: String,
    regions: Vec<Region>,
    state: Arc<Mutex<SessionState>>,
    timeline: Arc<StdMutex<TimelineAggregator>>,
    detection: Arc<dyn DetectionService>,
    events: EventBus,
}

impl SubmissionDispatcher {
    pub(crate) fn new(
        session_id: String,
        regions: Vec<Region>,
        state: Arc<Mutex<SessionState>>,
        timeline: Arc<StdMutex<TimelineAggregator>>,
        detection: Arc<dyn DetectionService>,
        events: EventBus,
    ) -> Self {
        Self {
            ctx: Arc::new(DispatchContext {
                session_id,
                regions,
                state,
                timeline,
                detection,
                events,
            }),
        }
    }
}

impl FrameSink for SubmissionDispatcher {
    fn on_frame(&self, frame: EncodedFrame) {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move { ctx.submit(frame).await });
    }
}

impl DispatchContext {
    async fn submit(&self, frame: EncodedFrame) {
        let reply = match self
            .detection
            .submit_frame(&self.session_id, &frame, &self.regions)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                log_warn!(
                    "frame {} submission failed for session {}: {err:#}",
                    frame.sequence,
                    self.session_id
                );
                return;
            }
        };

        // Held while merging so a concurrent stop cannot interleave.
        let state = self.state.lock().await;
        if !state.owns(&self.session_id) {
            log_debug!(
                "discarding reply for frame {} of finished session {}",
                frame.sequence,
                self.session_id
            );
            return;
        }

        let (inserted, is_unique) = {
            let mut timeline = lock(&self.timeline);
            let inserted = apply_reply(&mut timeline, &reply, frame.captured_at, self.regions.len());
            let is_unique = reply.is_unique.unwrap_or(!inserted.is_empty());
            timeline.record_frame(is_unique, reply.totals);
            let stats = timeline.stats();
            let inserted = inserted
                .into_iter()
                .map(|entry| (entry, stats))
                .collect::<Vec<_>>();
            (inserted, is_unique)
        };
        drop(state);

        log_debug!(
            "frame {} applied for session {} ({} new entries)",
            frame.sequence,
            self.session_id,
            inserted.len()
        );

        for (entry, stats) in inserted {
            self.events.emit(SessionEvent::TimelineUpdated { entry, stats });
        }

        if is_unique {
            self.events.status(StatusLevel::Success, "New data captured");
        } else {
            self.events.status(StatusLevel::Info, "Duplicate content detected");
        }
    }
}

/// Merges every region's text from one reply, stamped with the tick time.
/// Returns the entries that were actually added.
pub(crate) fn apply_reply(
    timeline: &mut TimelineAggregator,
    reply: &DetectionReply,
    captured_at: DateTime<Utc>,
    region_count: usize,
) -> Vec<TimelineEntry> {
    let mut inserted = Vec::new();

    for (&region_index, text) in &reply.per_region_text {
        if region_index >= region_count {
            log_debug!("ignoring text for unknown region index {}", region_index);
            continue;
        }

        if timeline.merge(region_index, text, captured_at) == MergeOutcome::Inserted {
            if let Some(entry) = timeline.latest(region_index) {
                inserted.push(entry.clone());
            }
        }
    }

    inserted
}
