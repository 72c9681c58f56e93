//! Loading, deleting and leaving historical sessions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::{HistoricalArchive, MediaLocator, SessionRegistry};
use crate::error::{CaptureError, CaptureResult};
use crate::events::StatusLevel;
use crate::models::SessionSummary;
use crate::session::SessionController;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// The historical session currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayState {
    pub session_id: String,
    pub media: MediaLocator,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ReplayCoordinator {
    controller: SessionController,
    registry: Arc<dyn SessionRegistry>,
    archive: Arc<dyn HistoricalArchive>,
}

impl ReplayCoordinator {
    pub fn new(
        controller: SessionController,
        registry: Arc<dyn SessionRegistry>,
        archive: Arc<dyn HistoricalArchive>,
    ) -> Self {
        Self {
            controller,
            registry,
            archive,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub async fn list_sessions(&self) -> CaptureResult<Vec<SessionSummary>> {
        self.registry
            .list_sessions()
            .await
            .map_err(CaptureError::transport)
    }

    /// Swaps the live surface for a stored session: its regions (locked), its
    /// timeline and its recorded video.
    ///
    /// Everything is fetched before the live surface is touched, so a failed
    /// fetch leaves the current state as it was.
    pub async fn load_historical(&self, session_id: &str) -> CaptureResult<ReplayState> {
        let _transition = self.controller.begin_transition().await;
        self.controller.ensure_not_recording().await?;

        let fetched = tokio::try_join!(
            self.archive.fetch_timeline(session_id),
            self.archive.fetch_regions(session_id),
            self.archive.fetch_replay_media(session_id),
        );
        let (timeline, regions, media) = match fetched {
            Ok(fetched) => fetched,
            Err(err) => {
                log_error!("Failed to load session {session_id}: {err:#}");
                self.controller.events().status(
                    StatusLevel::Error,
                    format!("Failed to load session: {err:#}"),
                );
                return Err(CaptureError::transport(err));
            }
        };

        self.controller.release_live_surface().await;

        let replay = ReplayState {
            session_id: session_id.to_string(),
            media,
            loaded_at: Utc::now(),
        };
        self.controller
            .install_replay(replay.clone(), regions, timeline)
            .await;

        log_info!("Replaying session {session_id}");
        Ok(replay)
    }

    /// Deletes a stored session. The live recording is stopped first; a replayed
    /// session is taken off screen. Any other session leaves local state alone.
    pub async fn delete_historical(&self, session_id: &str) -> CaptureResult<()> {
        let _transition = self.controller.begin_transition().await;

        if self.controller.recording_session_id().await.as_deref() == Some(session_id) {
            log_info!("Stopping live session {session_id} before deleting it");
            self.controller.stop_recording_locked().await?;
        }

        if let Err(err) = self.registry.delete_session(session_id).await {
            log_error!("Failed to delete session {session_id}: {err:#}");
            self.controller.events().status(
                StatusLevel::Error,
                format!("Failed to delete session: {err:#}"),
            );
            return Err(CaptureError::transport(err));
        }

        if self.controller.replayed_session_id().await.as_deref() == Some(session_id) {
            self.controller.clear_replay().await;
        }

        log_info!("Deleted session {session_id}");
        self.controller
            .events()
            .status(StatusLevel::Success, "Session deleted");
        Ok(())
    }

    pub async fn exit_replay(&self) -> CaptureResult<()> {
        let _transition = self.controller.begin_transition().await;
        if self.controller.clear_replay().await {
            log_info!("Left replay");
        }
        Ok(())
    }

    /// Pulls the server-computed timeline for `session_id` and substitutes it.
    pub async fn refresh_timeline(&self, session_id: &str) -> CaptureResult<()> {
        let _transition = self.controller.begin_transition().await;
        self.controller.ensure_not_recording().await?;

        let timeline = self
            .archive
            .fetch_timeline(session_id)
            .await
            .map_err(CaptureError::transport)?;
        self.controller.replace_timeline(timeline);
        Ok(())
    }
}
