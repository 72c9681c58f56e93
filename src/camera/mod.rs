//! Live pixel source seam.
//!
//! The capture device itself lives outside this crate. The controller only needs
//! something it can acquire, ask for dimensions, snapshot on demand, and release.

mod still;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use image::RgbImage;
use log::info;
use serde::{Deserialize, Serialize};

pub use still::{StillCamera, StillImageSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub trait PixelSource: Send + Sync {
    /// `None` until the device has reported its resolution.
    fn dimensions(&self) -> Option<FrameSize>;

    /// Full-resolution copy of the current frame.
    fn snapshot(&self) -> Result<RgbImage>;
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn PixelSource>>;

    fn release(&self, source: &Arc<dyn PixelSource>);
}

/// Exclusive hold on an acquired pixel source. The device is released when the
/// lease is dropped, on every path.
pub(crate) struct CameraLease {
    camera: Arc<dyn Camera>,
    source: Arc<dyn PixelSource>,
}

impl CameraLease {
    pub(crate) async fn acquire(camera: Arc<dyn Camera>) -> Result<Self> {
        let source = camera.acquire().await?;
        Ok(Self { camera, source })
    }

    pub(crate) fn source(&self) -> Arc<dyn PixelSource> {
        Arc::clone(&self.source)
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        info!("Releasing pixel source");
        self.camera.release(&self.source);
    }
}
