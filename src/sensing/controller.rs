use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::camera::PixelSource;

use super::loop_worker::{sampling_loop, FrameSink, SamplingConfig};

/// Periodic snapshot task with an explicit stop handle. At most one loop runs
/// per sampler.
pub struct FrameSampler {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    interval: Duration,
    jpeg_quality: u8,
}

impl FrameSampler {
    pub fn new(interval: Duration, jpeg_quality: u8) -> Self {
        Self {
            handle: None,
            cancel_token: None,
            interval,
            jpeg_quality,
        }
    }

    pub fn is_running(&self) -> bool {
        match (&self.handle, &self.cancel_token) {
            (Some(_), Some(token)) => !token.is_cancelled(),
            _ => false,
        }
    }

    pub fn start(&mut self, source: Arc<dyn PixelSource>, sink: Arc<dyn FrameSink>) -> Result<()> {
        if self.handle.is_some() {
            bail!("sampler already active");
        }

        let cancel_token = CancellationToken::new();
        let config = SamplingConfig {
            interval: self.interval,
            jpeg_quality: self.jpeg_quality,
        };

        info!("Starting frame sampler every {}ms", self.interval.as_millis());
        let handle = tokio::spawn(sampling_loop(source, sink, config, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Requests cancellation. No tick fires after this returns.
    pub fn cancel(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }

    /// Cancels and waits for the loop to exit.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampling loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.cancel();
    }
}
