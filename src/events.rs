//! Notifications pushed to the display layer.
//!
//! The controller never waits on observers: events go out on a broadcast channel
//! and are dropped when nobody is subscribed or a subscriber lags.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{Region, TimelineEntry};
use crate::replay::ReplayState;
use crate::session::SessionStatus;
use crate::timeline::CaptureStats;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged {
        status: SessionStatus,
        session_id: Option<String>,
    },
    RegionsChanged {
        regions: Vec<Region>,
    },
    TimelineUpdated {
        entry: TimelineEntry,
        stats: CaptureStats,
    },
    TimelineReplaced,
    TimelineCleared,
    ReplayChanged {
        replay: Option<ReplayState>,
    },
    Status {
        level: StatusLevel,
        message: String,
    },
}

#[derive(Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub(crate) fn status(&self, level: StatusLevel, message: impl Into<String>) {
        self.emit(SessionEvent::Status {
            level,
            message: message.into(),
        });
    }
}
