use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use image::{Rgb, RgbImage};

use crate::utils::sync::lock;

use super::{Camera, FrameSize, PixelSource};

/// Pixel source backed by an in-memory frame that can be swapped at any time.
pub struct StillImageSource {
    frame: Mutex<Option<RgbImage>>,
    snapshots: AtomicUsize,
}

impl StillImageSource {
    pub fn new(frame: RgbImage) -> Self {
        Self {
            frame: Mutex::new(Some(frame)),
            snapshots: AtomicUsize::new(0),
        }
    }

    /// A uniformly colored frame.
    pub fn solid(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    /// A source whose resolution is not known yet.
    pub fn pending() -> Self {
        Self {
            frame: Mutex::new(None),
            snapshots: AtomicUsize::new(0),
        }
    }

    pub fn set_frame(&self, frame: Option<RgbImage>) {
        *lock(&self.frame) = frame;
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }
}

impl PixelSource for StillImageSource {
    fn dimensions(&self) -> Option<FrameSize> {
        lock(&self.frame)
            .as_ref()
            .map(|frame| FrameSize::new(frame.width(), frame.height()))
    }

    fn snapshot(&self) -> Result<RgbImage> {
        let frame = lock(&self.frame)
            .clone()
            .ok_or_else(|| anyhow!("no frame available"))?;
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(frame)
    }
}

/// Camera that hands out a shared [`StillImageSource`], with an optional
/// acquisition failure to emulate a denied permission prompt.
pub struct StillCamera {
    source: Arc<StillImageSource>,
    denied: Mutex<Option<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl StillCamera {
    pub fn new(source: Arc<StillImageSource>) -> Self {
        Self {
            source,
            denied: Mutex::new(None),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> Arc<StillImageSource> {
        Arc::clone(&self.source)
    }

    /// Makes subsequent `acquire` calls fail with `reason` (or succeed again with `None`).
    pub fn set_denied(&self, reason: Option<&str>) {
        *lock(&self.denied) = reason.map(str::to_string);
    }

    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn is_held(&self) -> bool {
        self.acquire_count() > self.release_count()
    }
}

#[async_trait]
impl Camera for StillCamera {
    async fn acquire(&self) -> Result<Arc<dyn PixelSource>> {
        if let Some(reason) = lock(&self.denied).clone() {
            bail!(reason);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.source.clone() as Arc<dyn PixelSource>)
    }

    fn release(&self, _source: &Arc<dyn PixelSource>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
