//! Capture pipeline: capture the tab, decode, crop, re-encode, optionally
//! save. Owns no state between requests.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};

use super::geometry::CropGeometry;
use super::persist::{self, Downloader};
use super::region::{self, CropError};
use super::screenshot::{CaptureError, TabCapturer};
use crate::channel::{capture_channel, CaptureClient, CaptureInbox};
use crate::protocol::{CaptureFailure, CapturePayload, CaptureRequest, CaptureResponse};

pub struct CaptureService {
    capturer: Arc<dyn TabCapturer>,
    downloader: Option<Arc<dyn Downloader>>,
}

impl CaptureService {
    pub fn new(capturer: Arc<dyn TabCapturer>) -> Self {
        Self {
            capturer,
            downloader: None,
        }
    }

    /// Where `persist` requests are saved. Without one they are skipped.
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Run one request. Every failure is folded into `CaptureResponse::Failed`;
    /// a successful response always holds a complete image.
    pub async fn capture(&self, request: CaptureRequest) -> CaptureResponse {
        match self.run_pipeline(request).await {
            Ok(payload) => CaptureResponse::Captured(payload),
            Err(e) => {
                log::error!("[CAPTURE] {}", e);
                CaptureResponse::Failed(CaptureFailure::new(e.to_string()))
            }
        }
    }

    async fn run_pipeline(&self, request: CaptureRequest) -> Result<CapturePayload, PipelineError> {
        let start = std::time::Instant::now();
        let geometry = CropGeometry::from_css(&request.rect, request.device_pixel_ratio);

        // Step 1: grab the visible tab. Called exactly once per request.
        let data_uri = self.capturer.capture_visible_tab(request.tab_quality).await?;
        let capture_ms = start.elapsed().as_millis();
        log::info!("[CAPTURE] Tab captured in {}ms", capture_ms);

        if request.persist {
            self.spawn_persist(data_uri.clone(), geometry);
        }

        // Step 2: decode, crop and re-encode off the async threads
        let quality = request.encode_quality;
        let jpeg_bytes = tokio::task::spawn_blocking(move || {
            let frame = region::decode_data_uri(&data_uri)?;
            region::crop_to_jpeg_bytes(&frame, &geometry, quality)
        })
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))??;

        let image = STANDARD.encode(&jpeg_bytes);

        log::info!(
            "[CAPTURE] Cropped ({},{} {}x{}) -> {}x{} in {}ms total, {} bytes",
            geometry.sx,
            geometry.sy,
            geometry.sw,
            geometry.sh,
            geometry.tw,
            geometry.th,
            start.elapsed().as_millis(),
            jpeg_bytes.len()
        );

        Ok(CapturePayload { image, geometry })
    }

    fn spawn_persist(&self, data_uri: String, geometry: CropGeometry) {
        let Some(downloader) = self.downloader.clone() else {
            log::warn!("[PERSIST] Save requested but no download location is configured");
            return;
        };

        tokio::task::spawn_blocking(move || {
            match persist::persist_capture(&data_uri, &geometry, downloader.as_ref()) {
                Ok(path) => log::info!("[PERSIST] Saved {}", path.display()),
                Err(e) => log::warn!("[PERSIST] Save failed: {}", e),
            }
        });
    }
}

/// Answer requests from `inbox` until every client is gone.
pub async fn serve(service: Arc<CaptureService>, mut inbox: CaptureInbox) {
    while let Some(envelope) = inbox.recv().await {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let response = service.capture(envelope.request.clone()).await;
            envelope.respond(response);
        });
    }
    log::debug!("[CAPTURE] All clients gone, service loop exiting");
}

/// Start the service on the current runtime and hand back a client.
pub fn spawn_capture_service(service: CaptureService, capacity: usize) -> CaptureClient {
    let (client, inbox) = capture_channel(capacity);
    tokio::spawn(serve(Arc::new(service), inbox));
    client
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error("Capture worker failed: {0}")]
    Worker(String),
}
