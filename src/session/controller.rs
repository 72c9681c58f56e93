use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::backend::{DetectionService, SessionRegistry};
use crate::camera::{Camera, CameraLease};
use crate::error::{CaptureError, CaptureResult};
use crate::events::{EventBus, SessionEvent, StatusLevel};
use crate::models::{Region, Timeline};
use crate::regions::{DisplayBox, DrawCommand, Point, Rect, RegionEditor, Viewport};
use crate::replay::ReplayState;
use crate::sensing::FrameSampler;
use crate::settings::CaptureSettings;
use crate::timeline::{CaptureStats, TimelineAggregator};
use crate::utils::sync::lock;

use super::dispatch::SubmissionDispatcher;
use super::state::{SessionState, SessionStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Read-only view of everything the display layer renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub regions: Vec<Region>,
    pub regions_locked: bool,
    pub provisional: Option<Rect>,
    pub timeline: Timeline,
    pub stats: CaptureStats,
    pub replay: Option<ReplayState>,
    pub sampling: bool,
}

/// Camera lifecycle and recording state machine.
///
/// Cheap to clone; every clone drives the same session. Transitions are
/// serialised, pointer and region edits are applied immediately.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    transition: Arc<Mutex<()>>,
    sampler: Arc<Mutex<FrameSampler>>,
    lease: Arc<StdMutex<Option<CameraLease>>>,
    editor: Arc<StdMutex<RegionEditor>>,
    timeline: Arc<StdMutex<TimelineAggregator>>,
    camera: Arc<dyn Camera>,
    registry: Arc<dyn SessionRegistry>,
    detection: Arc<dyn DetectionService>,
    events: EventBus,
}

impl SessionController {
    pub fn new(
        camera: Arc<dyn Camera>,
        registry: Arc<dyn SessionRegistry>,
        detection: Arc<dyn DetectionService>,
        settings: &CaptureSettings,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            transition: Arc::new(Mutex::new(())),
            sampler: Arc::new(Mutex::new(FrameSampler::new(
                settings.capture_interval(),
                settings.jpeg_quality(),
            ))),
            lease: Arc::new(StdMutex::new(None)),
            editor: Arc::new(StdMutex::new(RegionEditor::new())),
            timeline: Arc::new(StdMutex::new(TimelineAggregator::new())),
            camera,
            registry,
            detection,
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn start_camera(&self) -> CaptureResult<()> {
        let _transition = self.transition.lock().await;

        if self.state.lock().await.camera_active() {
            return Ok(());
        }

        let lease = match CameraLease::acquire(Arc::clone(&self.camera)).await {
            Ok(lease) => lease,
            Err(err) => {
                log_error!("Failed to acquire camera: {err:#}");
                self.events.status(
                    StatusLevel::Error,
                    format!("Failed to access camera: {err:#}"),
                );
                return Err(CaptureError::acquisition(err));
            }
        };

        let was_replaying = {
            let mut state = self.state.lock().await;
            let was_replaying = state.is_replaying();
            state.camera_started();
            was_replaying
        };

        *lock(&self.lease) = Some(lease);
        {
            let mut editor = lock(&self.editor);
            if was_replaying {
                editor.unlock();
                editor.reset();
            }
            editor.set_source_active(true);
        }

        if was_replaying {
            lock(&self.timeline).clear();
            self.events.emit(SessionEvent::ReplayChanged { replay: None });
            self.events.emit(SessionEvent::RegionsChanged { regions: Vec::new() });
            self.events.emit(SessionEvent::TimelineCleared);
        }

        log_info!("Camera connected");
        self.emit_state(SessionStatus::CameraOn, None);
        self.events.status(StatusLevel::Success, "Camera connected");
        Ok(())
    }

    /// Returns the camera to `Idle` from any live state. No-op when the camera
    /// is already off.
    pub async fn stop_camera(&self) -> CaptureResult<()> {
        let _transition = self.transition.lock().await;

        if !self.state.lock().await.camera_active() {
            return Ok(());
        }

        self.release_live_surface().await;
        self.events.status(StatusLevel::Info, "Camera disconnected");
        Ok(())
    }

    /// Mints a session id, locks the regions and starts sampling.
    pub async fn start_recording(&self) -> CaptureResult<String> {
        let _transition = self.transition.lock().await;

        let prior_status = self.state.lock().await.status;
        if !matches!(prior_status, SessionStatus::CameraOn | SessionStatus::Stopped) {
            return Err(CaptureError::validation(match prior_status {
                SessionStatus::Recording => "already recording",
                _ => "camera must be on to start recording",
            }));
        }

        let source = lock(&self.lease)
            .as_ref()
            .map(CameraLease::source)
            .ok_or_else(|| CaptureError::validation("camera must be on to start recording"))?;

        let regions = {
            let mut editor = lock(&self.editor);
            if editor.is_empty() {
                None
            } else {
                editor.lock();
                Some(editor.regions().to_vec())
            }
        };
        let Some(regions) = regions else {
            self.events
                .status(StatusLevel::Warning, "Please draw at least one region first");
            return Err(CaptureError::validation(
                "at least one region is required to record",
            ));
        };

        let session_id = Uuid::new_v4().to_string();

        if let Err(err) = self.registry.start_session(&session_id, &regions).await {
            log_error!("Failed to start session {session_id}: {err:#}");
            lock(&self.editor).unlock();
            self.events.status(
                StatusLevel::Error,
                format!("Failed to start session: {err:#}"),
            );
            return Err(CaptureError::transport(err));
        }

        lock(&self.timeline).clear();
        self.state
            .lock()
            .await
            .begin_recording(session_id.clone(), regions.clone(), Utc::now());

        let sink = Arc::new(SubmissionDispatcher::new(
            session_id.clone(),
            regions,
            Arc::clone(&self.state),
            Arc::clone(&self.timeline),
            Arc::clone(&self.detection),
            self.events.clone(),
        ));

        let started = self.sampler.lock().await.start(source, sink);
        if let Err(err) = started {
            log_error!("Failed to start sampler for {session_id}: {err:#}");
            {
                let mut state = self.state.lock().await;
                state.finish_recording();
                state.status = prior_status;
            }
            lock(&self.editor).unlock();
            if let Err(stop_err) = self.registry.stop_session(&session_id).await {
                log_warn!("Failed to roll back session {session_id}: {stop_err:#}");
            }
            return Err(CaptureError::validation(err.to_string()));
        }

        log_info!("Recording session {session_id}");
        self.emit_state(SessionStatus::Recording, Some(session_id.clone()));
        self.events.status(StatusLevel::Success, "Recording started");
        Ok(session_id)
    }

    /// Stops sampling, then tells the registry. The local stop always completes.
    pub async fn stop_recording(&self) -> CaptureResult<()> {
        let _transition = self.transition.lock().await;
        self.stop_recording_locked().await
    }

    /// Empties regions, timeline and frame statistics. A replayed session is
    /// left as well. Refused while recording.
    pub async fn clear_session(&self) -> CaptureResult<()> {
        let _transition = self.transition.lock().await;

        if self.state.lock().await.is_recording() {
            return Err(CaptureError::validation(
                "stop recording before clearing the session",
            ));
        }

        if self.clear_replay().await {
            return Ok(());
        }

        lock(&self.editor).reset();
        lock(&self.timeline).clear();

        log_info!("Session cleared");
        self.events.emit(SessionEvent::RegionsChanged { regions: Vec::new() });
        self.events.emit(SessionEvent::TimelineCleared);
        Ok(())
    }

    /// Caller holds the transition lock.
    pub(crate) async fn stop_recording_locked(&self) -> CaptureResult<()> {
        let session_id = {
            let state = self.state.lock().await;
            match (state.is_recording(), state.session_id.clone()) {
                (true, Some(session_id)) => session_id,
                _ => return Err(CaptureError::validation("not recording")),
            }
        };

        let mut sampler = self.sampler.lock().await;
        sampler.cancel();
        self.state.lock().await.finish_recording();
        if let Err(err) = sampler.stop().await {
            log_warn!("Sampler did not shut down cleanly: {err:#}");
        }
        drop(sampler);

        {
            let mut editor = lock(&self.editor);
            editor.unlock();
            editor.reset();
        }
        lock(&self.timeline).clear();

        self.stop_remote_session(&session_id).await;

        log_info!("Stopped session {session_id}");
        self.events.emit(SessionEvent::RegionsChanged { regions: Vec::new() });
        self.events.emit(SessionEvent::TimelineCleared);
        self.emit_state(SessionStatus::Stopped, None);
        self.events.status(StatusLevel::Info, "Recording stopped");
        Ok(())
    }

    pub fn begin_drag(&self, pointer: Point, display: DisplayBox) -> bool {
        let Some(viewport) = self.viewport(display) else {
            return false;
        };
        lock(&self.editor).begin_drag(pointer, &viewport)
    }

    pub fn update_drag(&self, pointer: Point, display: DisplayBox) -> Option<Rect> {
        let viewport = self.viewport(display)?;
        lock(&self.editor).update_drag(pointer, &viewport)
    }

    pub fn end_drag(&self, pointer: Point, display: DisplayBox) -> Option<Region> {
        let (committed, regions) = {
            let mut editor = lock(&self.editor);
            let Some(viewport) = self.viewport(display) else {
                editor.cancel_drag();
                return None;
            };
            let committed = editor.end_drag(pointer, &viewport).cloned();
            (committed, editor.regions().to_vec())
        };

        if committed.is_some() {
            self.events.emit(SessionEvent::RegionsChanged { regions });
        }
        committed
    }

    pub fn cancel_drag(&self) {
        lock(&self.editor).cancel_drag();
    }

    pub fn update_region_label(&self, id: &str, label: &str) -> CaptureResult<()> {
        let regions = {
            let mut editor = lock(&self.editor);
            editor.update_label(id, label)?;
            editor.regions().to_vec()
        };
        self.events.emit(SessionEvent::RegionsChanged { regions });
        Ok(())
    }

    pub fn remove_region(&self, id: &str) -> CaptureResult<Region> {
        let (removed, regions) = {
            let mut editor = lock(&self.editor);
            let removed = editor.remove(id)?;
            (removed, editor.regions().to_vec())
        };
        self.events.emit(SessionEvent::RegionsChanged { regions });
        Ok(removed)
    }

    pub fn clear_regions(&self) -> CaptureResult<()> {
        lock(&self.editor).clear()?;
        self.events.emit(SessionEvent::RegionsChanged { regions: Vec::new() });
        Ok(())
    }

    pub fn regions(&self) -> Vec<Region> {
        lock(&self.editor).regions().to_vec()
    }

    pub fn render_overlay(&self) -> Vec<DrawCommand> {
        lock(&self.editor).render()
    }

    pub fn timeline(&self) -> Timeline {
        lock(&self.timeline).timeline().clone()
    }

    pub fn stats(&self) -> CaptureStats {
        lock(&self.timeline).stats()
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let (status, session_id, replay) = {
            let state = self.state.lock().await;
            (state.status, state.session_id.clone(), state.replay.clone())
        };
        let sampling = self.sampler.lock().await.is_running();

        let (regions, regions_locked, provisional) = {
            let editor = lock(&self.editor);
            (editor.regions().to_vec(), editor.is_locked(), editor.provisional())
        };
        let (timeline, stats) = {
            let timeline = lock(&self.timeline);
            (timeline.timeline().clone(), timeline.stats())
        };

        ControllerSnapshot {
            status,
            session_id,
            regions,
            regions_locked,
            provisional,
            timeline,
            stats,
            replay,
            sampling,
        }
    }

    /// Serialises a multi-step operation against camera and recording transitions.
    pub(crate) async fn begin_transition(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.transition).lock_owned().await
    }

    pub(crate) async fn ensure_not_recording(&self) -> CaptureResult<()> {
        if self.state.lock().await.is_recording() {
            return Err(CaptureError::validation(
                "not available while recording",
            ));
        }
        Ok(())
    }

    pub(crate) async fn recording_session_id(&self) -> Option<String> {
        let state = self.state.lock().await;
        state
            .is_recording()
            .then(|| state.session_id.clone())
            .flatten()
    }

    pub(crate) async fn replayed_session_id(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .replay
            .as_ref()
            .map(|replay| replay.session_id.clone())
    }

    /// Forces the live surface to `Idle`: cancels sampling, releases the pixel
    /// source and empties regions and timeline. Caller holds the transition lock.
    pub(crate) async fn release_live_surface(&self) {
        let mut sampler = self.sampler.lock().await;
        sampler.cancel();

        let (was_active, recording) = {
            let mut state = self.state.lock().await;
            let was_active = state.camera_active();
            let recording = state
                .is_recording()
                .then(|| state.session_id.clone())
                .flatten();
            let replay = state.replay.take();
            state.reset();
            state.replay = replay;
            (was_active, recording)
        };

        if let Err(err) = sampler.stop().await {
            log_warn!("Sampler did not shut down cleanly: {err:#}");
        }
        drop(sampler);

        let lease = lock(&self.lease).take();
        drop(lease);

        {
            let mut editor = lock(&self.editor);
            editor.set_source_active(false);
            editor.unlock();
            editor.reset();
        }
        lock(&self.timeline).clear();

        if let Some(session_id) = recording {
            self.stop_remote_session(&session_id).await;
        }

        if was_active {
            log_info!("Camera released");
            self.events.emit(SessionEvent::RegionsChanged { regions: Vec::new() });
            self.events.emit(SessionEvent::TimelineCleared);
            self.emit_state(SessionStatus::Idle, None);
        }
    }

    /// Puts a historical session on screen. Caller holds the transition lock and
    /// has already released the live surface.
    pub(crate) async fn install_replay(
        &self,
        replay: ReplayState,
        regions: Vec<Region>,
        timeline: Timeline,
    ) {
        self.state.lock().await.replay = Some(replay.clone());

        {
            let mut editor = lock(&self.editor);
            editor.load_snapshot(regions.clone());
            editor.lock();
        }
        lock(&self.timeline).replace(timeline);

        self.events.emit(SessionEvent::ReplayChanged {
            replay: Some(replay),
        });
        self.events.emit(SessionEvent::RegionsChanged { regions });
        self.events.emit(SessionEvent::TimelineReplaced);
    }

    /// Leaves replay for the empty `Idle` surface. Returns false when nothing
    /// was being replayed.
    pub(crate) async fn clear_replay(&self) -> bool {
        if self.state.lock().await.replay.take().is_none() {
            return false;
        }

        {
            let mut editor = lock(&self.editor);
            editor.unlock();
            editor.reset();
        }
        lock(&self.timeline).clear();

        self.events.emit(SessionEvent::ReplayChanged { replay: None });
        self.events.emit(SessionEvent::RegionsChanged { regions: Vec::new() });
        self.events.emit(SessionEvent::TimelineCleared);
        true
    }

    pub(crate) fn replace_timeline(&self, timeline: Timeline) {
        lock(&self.timeline).replace(timeline);
        self.events.emit(SessionEvent::TimelineReplaced);
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    fn viewport(&self, display: DisplayBox) -> Option<Viewport> {
        let source = lock(&self.lease).as_ref()?.source();
        source
            .dimensions()
            .map(|frame| Viewport::new(display, frame))
    }

    async fn stop_remote_session(&self, session_id: &str) {
        if let Err(err) = self.registry.stop_session(session_id).await {
            log_warn!("Failed to stop session {session_id} on server: {err:#}");
            self.events.status(
                StatusLevel::Warning,
                format!("Session stopped locally but the server was not notified: {err:#}"),
            );
        }
    }

    fn emit_state(&self, status: SessionStatus, session_id: Option<String>) {
        self.events
            .emit(SessionEvent::StateChanged { status, session_id });
    }
}
