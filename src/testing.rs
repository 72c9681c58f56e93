//! In-memory collaborators and a wired-up controller for async tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::backend::{
    DetectionReply, DetectionService, HistoricalArchive, MediaLocator, SessionRegistry,
};
use crate::camera::{StillCamera, StillImageSource};
use crate::models::{Region, SessionSummary, Timeline};
use crate::regions::{DisplayBox, Point};
use crate::sensing::EncodedFrame;
use crate::session::SessionController;
use crate::settings::CaptureSettings;
use crate::utils::sync::lock;

/// Records every call as `"<operation>:<session id>"`.
#[derive(Default)]
pub(crate) struct FakeBackend {
    calls: Mutex<Vec<String>>,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_submit: AtomicBool,
    reply_text: Mutex<String>,
    submit_delay: Mutex<Duration>,
    history: Mutex<BTreeMap<String, (Timeline, Vec<Region>)>>,
}

impl FakeBackend {
    pub(crate) fn count(&self, prefix: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub(crate) fn set_reply_text(&self, text: &str) {
        *lock(&self.reply_text) = text.to_string();
    }

    pub(crate) fn set_submit_delay(&self, delay: Duration) {
        *lock(&self.submit_delay) = delay;
    }

    pub(crate) fn add_history(&self, session_id: &str, timeline: Timeline, regions: Vec<Region>) {
        lock(&self.history).insert(session_id.to_string(), (timeline, regions));
    }

    fn record(&self, operation: &str, session_id: &str) {
        lock(&self.calls).push(format!("{operation}:{session_id}"));
    }

    fn stored(&self, session_id: &str) -> Result<(Timeline, Vec<Region>)> {
        lock(&self.history)
            .get(session_id)
            .cloned()
            .ok_or_else(|| anyhow!("404 session {session_id} not found"))
    }
}

#[async_trait]
impl SessionRegistry for FakeBackend {
    async fn start_session(&self, session_id: &str, _regions: &[Region]) -> Result<()> {
        self.record("start_session", session_id);
        if self.fail_start.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }

    async fn stop_session(&self, session_id: &str) -> Result<()> {
        self.record("stop_session", session_id);
        if self.fail_stop.load(Ordering::SeqCst) {
            bail!("connection reset");
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(lock(&self.history)
            .keys()
            .map(|session_id| SessionSummary {
                session_id: session_id.clone(),
                total_frames: None,
                unique_outputs: None,
                last_updated: None,
            })
            .collect())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.record("delete_session", session_id);
        if self.fail_delete.load(Ordering::SeqCst) {
            bail!("500 internal error");
        }
        lock(&self.history).remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl DetectionService for FakeBackend {
    async fn submit_frame(
        &self,
        session_id: &str,
        _frame: &EncodedFrame,
        regions: &[Region],
    ) -> Result<DetectionReply> {
        self.record("submit_frame", session_id);

        let delay = *lock(&self.submit_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_submit.load(Ordering::SeqCst) {
            bail!("timed out");
        }

        let text = lock(&self.reply_text).clone();
        Ok(DetectionReply {
            per_region_text: (0..regions.len()).map(|index| (index, text.clone())).collect(),
            ..DetectionReply::default()
        })
    }
}

#[async_trait]
impl HistoricalArchive for FakeBackend {
    async fn fetch_timeline(&self, session_id: &str) -> Result<Timeline> {
        Ok(self.stored(session_id)?.0)
    }

    async fn fetch_regions(&self, session_id: &str) -> Result<Vec<Region>> {
        Ok(self.stored(session_id)?.1)
    }

    async fn fetch_replay_media(&self, session_id: &str) -> Result<MediaLocator> {
        self.stored(session_id)?;
        Ok(MediaLocator {
            url: format!("http://fake/video/{session_id}"),
        })
    }
}

pub(crate) struct Harness {
    pub controller: SessionController,
    pub camera: Arc<StillCamera>,
    pub backend: Arc<FakeBackend>,
}

/// Controller over a 1280×720 still camera and a [`FakeBackend`], sampling
/// every 20ms.
pub(crate) fn harness() -> Harness {
    let camera = Arc::new(StillCamera::new(Arc::new(StillImageSource::solid(
        1280,
        720,
        [20, 20, 20],
    ))));
    let backend = Arc::new(FakeBackend::default());
    let settings = CaptureSettings {
        capture_interval_ms: 20,
        ..CaptureSettings::default()
    };

    let controller = SessionController::new(
        camera.clone(),
        backend.clone(),
        backend.clone(),
        &settings,
    );

    Harness {
        controller,
        camera,
        backend,
    }
}

/// The rendered video element: half the source resolution.
pub(crate) fn display() -> DisplayBox {
    DisplayBox::sized(640.0, 360.0)
}

/// Drags from `from` to `to` in display coordinates.
pub(crate) fn draw_region(
    controller: &SessionController,
    from: (f64, f64),
    to: (f64, f64),
) -> Option<Region> {
    controller.begin_drag(Point::new(from.0, from.1), display());
    controller.update_drag(Point::new(to.0, to.1), display());
    controller.end_drag(Point::new(to.0, to.1), display())
}

pub(crate) async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 3s");
}
