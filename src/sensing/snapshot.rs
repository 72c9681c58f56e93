use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use image::{codecs::jpeg::JpegEncoder, RgbImage};

use crate::camera::FrameSize;

/// A JPEG snapshot taken on one sampler tick.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Position of the tick within its sampling run, starting at 0.
    pub sequence: u64,
    /// When the tick fired. Results derived from this frame carry this time.
    pub captured_at: DateTime<Utc>,
    pub size: FrameSize,
    pub jpeg: Vec<u8>,
}

impl EncodedFrame {
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.jpeg))
    }
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode_image(image)
        .context("jpeg encoding failed")?;
    Ok(buffer)
}
