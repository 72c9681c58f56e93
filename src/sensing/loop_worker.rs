use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::camera::{FrameSize, PixelSource};

use super::snapshot::{encode_jpeg, EncodedFrame};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const CAPTURE_TIMEOUT_SECS: u64 = 5;

/// Receives every frame the sampler produces. Called on the sampler task, so
/// implementations should hand work off rather than block.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: EncodedFrame);
}

pub(crate) struct SamplingConfig {
    pub interval: Duration,
    pub jpeg_quality: u8,
}

pub(crate) async fn sampling_loop(
    source: Arc<dyn PixelSource>,
    sink: Arc<dyn FrameSink>,
    config: SamplingConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sequence: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down after {} frames", sequence);
                break;
            }
            _ = ticker.tick() => {
                let fut = capture_frame(&source, config.jpeg_quality, sequence);

                match tokio::time::timeout(Duration::from_secs(CAPTURE_TIMEOUT_SECS), fut).await {
                    Ok(Ok(Some(frame))) => {
                        // Cancelled while encoding: the frame belongs to a run that is over.
                        if cancel_token.is_cancelled() {
                            log_debug!("dropping frame {} captured during shutdown", sequence);
                            break;
                        }
                        sink.on_frame(frame);
                        sequence += 1;
                    }
                    Ok(Ok(None)) => log_debug!("source dimensions unknown; skipping tick"),
                    Ok(Err(err)) => log_warn!("frame capture failed: {err:#}"),
                    Err(_) => log_warn!("frame capture timeout (> {}s)", CAPTURE_TIMEOUT_SECS),
                }
            }
        }
    }
}

async fn capture_frame(
    source: &Arc<dyn PixelSource>,
    jpeg_quality: u8,
    sequence: u64,
) -> Result<Option<EncodedFrame>> {
    if source.dimensions().is_none() {
        return Ok(None);
    }

    let captured_at = Utc::now();
    let source = Arc::clone(source);
    let (size, jpeg) = tokio::task::spawn_blocking(move || -> Result<(FrameSize, Vec<u8>)> {
        let image = source.snapshot()?;
        let size = FrameSize::new(image.width(), image.height());
        Ok((size, encode_jpeg(&image, jpeg_quality)?))
    })
    .await
    .context("snapshot worker join failed")??;

    Ok(Some(EncodedFrame {
        sequence,
        captured_at,
        size,
        jpeg,
    }))
}
