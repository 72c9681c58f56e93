use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Region;
use crate::replay::ReplayState;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    CameraOn,
    Recording,
    Stopped,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    /// Regions as they were when recording started.
    pub regions: Vec<Region>,
    pub started_at: Option<DateTime<Utc>>,
    /// Set while a historical session is on screen. Only ever paired with `Idle`.
    pub replay: Option<ReplayState>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera_active(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::CameraOn | SessionStatus::Recording | SessionStatus::Stopped
        )
    }

    pub fn is_recording(&self) -> bool {
        self.status == SessionStatus::Recording
    }

    pub fn is_replaying(&self) -> bool {
        self.replay.is_some()
    }

    /// True while `session_id` is the live recording. Replies for anything else
    /// are discarded.
    pub fn owns(&self, session_id: &str) -> bool {
        self.is_recording() && self.session_id.as_deref() == Some(session_id)
    }

    pub fn camera_started(&mut self) {
        *self = Self {
            status: SessionStatus::CameraOn,
            ..Self::default()
        };
    }

    pub fn begin_recording(
        &mut self,
        session_id: String,
        regions: Vec<Region>,
        started_at: DateTime<Utc>,
    ) {
        self.status = SessionStatus::Recording;
        self.session_id = Some(session_id);
        self.regions = regions;
        self.started_at = Some(started_at);
    }

    pub fn finish_recording(&mut self) {
        self.status = SessionStatus::Stopped;
        self.session_id = None;
        self.regions.clear();
        self.started_at = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
