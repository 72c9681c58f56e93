use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Region, SessionSummary, Timeline};
use crate::sensing::EncodedFrame;
use crate::settings::CaptureSettings;

use super::wire::{
    AckResponse, ProcessFrameRequest, ProcessFrameResponse, RegionsResponse, SessionsResponse,
    StartSessionRequest, StopSessionRequest, TimelineResponse, VideoResponse,
};
use super::{DetectionReply, DetectionService, HistoricalArchive, MediaLocator, SessionRegistry};

/// JSON-over-HTTP client for the capture server.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(settings: &CaptureSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to create HTTP client")?;

        // Trailing slash so relative joins keep any path prefix.
        let mut base = settings.backend_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .with_context(|| format!("invalid backend url '{}'", settings.backend_url))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid request path '{path}'"))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.client.get(self.url(path)?).send().await?;
        decode(resp, path).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let resp = self.client.post(self.url(path)?).json(body).send().await?;
        decode(resp, path).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response, path: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(anyhow!("{path} failed: {status} {message}"));
    }

    resp.json::<T>()
        .await
        .with_context(|| format!("{path}: malformed response"))
}

#[async_trait]
impl SessionRegistry for HttpBackend {
    async fn start_session(&self, session_id: &str, regions: &[Region]) -> Result<()> {
        let body = StartSessionRequest {
            session_id,
            regions,
        };
        self.post_json::<_, AckResponse>("start_session", &body)
            .await?
            .into_result()
    }

    async fn stop_session(&self, session_id: &str) -> Result<()> {
        self.post_json::<_, AckResponse>("stop_session", &StopSessionRequest { session_id })
            .await?
            .into_result()
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let listing: SessionsResponse = self.get_json("get_sessions").await?;
        Ok(listing.sessions.into_iter().map(SessionSummary::from).collect())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = self.url(&format!("sessions/{session_id}"))?;
        let resp = self.client.delete(url).send().await?;
        decode::<AckResponse>(resp, "delete_session").await?.into_result()
    }
}

#[async_trait]
impl DetectionService for HttpBackend {
    async fn submit_frame(
        &self,
        session_id: &str,
        frame: &EncodedFrame,
        regions: &[Region],
    ) -> Result<DetectionReply> {
        let body = ProcessFrameRequest {
            image: frame.data_url(),
            regions,
            session_id,
        };

        // The server answers 400 with a JSON error body; surface that message.
        let resp = self
            .client
            .post(self.url("process_frame")?)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let parsed: ProcessFrameResponse = resp
            .json()
            .await
            .with_context(|| format!("process_frame: malformed response ({status})"))?;
        parsed.into_reply()
    }
}

#[async_trait]
impl HistoricalArchive for HttpBackend {
    async fn fetch_timeline(&self, session_id: &str) -> Result<Timeline> {
        let resp: TimelineResponse = self.get_json(&format!("get_timeline/{session_id}")).await?;
        resp.into_timeline()
    }

    async fn fetch_regions(&self, session_id: &str) -> Result<Vec<Region>> {
        let resp: RegionsResponse = self.get_json(&format!("get_regions/{session_id}")).await?;
        Ok(resp.into_regions())
    }

    async fn fetch_replay_media(&self, session_id: &str) -> Result<MediaLocator> {
        let resp: VideoResponse = self.get_json(&format!("get_video/{session_id}")).await?;
        let url = self
            .base_url
            .join(&resp.video_url)
            .with_context(|| format!("invalid video url '{}'", resp.video_url))?;
        Ok(MediaLocator {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: &str) -> HttpBackend {
        HttpBackend::new(&CaptureSettings {
            backend_url: url.to_string(),
            ..CaptureSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn joins_paths_under_base_prefix() {
        let backend = client_for("http://localhost:5000/api");
        assert_eq!(
            backend.url("get_timeline/s1").unwrap().as_str(),
            "http://localhost:5000/api/get_timeline/s1"
        );

        let backend = client_for("http://localhost:5000/");
        assert_eq!(
            backend.url("process_frame").unwrap().as_str(),
            "http://localhost:5000/process_frame"
        );
    }

    #[test]
    fn rejects_malformed_base_url() {
        let result = HttpBackend::new(&CaptureSettings {
            backend_url: "not a url".to_string(),
            ..CaptureSettings::default()
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let backend = client_for("http://127.0.0.1:9");
        assert!(backend.list_sessions().await.is_err());
    }
}
