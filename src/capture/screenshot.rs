//! The "capture visible tab" capability.
//!
//! This is the infrastructure layer. It talks to whatever produces the
//! frame. Hosts hand back a JPEG `data:` URI at backing-store resolution,
//! which is what the pipeline decodes.

use std::path::PathBuf;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use super::region::to_data_uri;

#[async_trait]
pub trait TabCapturer: Send + Sync {
    /// Captures the visible viewport as an encoded `data:` URI.
    /// `quality` is 0..=100.
    async fn capture_visible_tab(&self, quality: u8) -> Result<String, CaptureError>;
}

/// Encodes a raw frame the way a browser's tab capture hands it out.
pub fn frame_to_data_uri(frame: &DynamicImage, quality: u8) -> Result<String, CaptureError> {
    let rgb = frame.to_rgb8();
    let mut jpeg_bytes: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
    Ok(to_data_uri("image/jpeg", &jpeg_bytes))
}

/// Serves an image file as the visible tab. Used by the headless driver.
pub struct FileTabCapturer {
    path: PathBuf,
}

impl FileTabCapturer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TabCapturer for FileTabCapturer {
    async fn capture_visible_tab(&self, quality: u8) -> Result<String, CaptureError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let frame = image::open(&path).map_err(|e| CaptureError::SourceUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            frame_to_data_uri(&frame, quality)
        })
        .await
        .map_err(|e| CaptureError::CaptureFailed(format!("Capture task failed: {}", e)))?
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Cannot read {path}: {reason}")]
    SourceUnreadable { path: String, reason: String },

    #[error("Tab capture denied: {0}")]
    Denied(String),

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),
}
