//! Message vocabulary shared by the launcher, the page overlay and the
//! capture service.
//!
//! Wire names match the `screenshot-*` strings the embedding page listens
//! for. Page-facing messages travel over the same-window broadcast channel,
//! extension-facing ones over the runtime channel.

use serde::{Deserialize, Serialize};

use crate::capture::CropGeometry;
use crate::config::{DEFAULT_CANVAS_QUALITY, DEFAULT_TAB_QUALITY};
use crate::selection::SelectionRect;

/// Fallback text when a failure carries no message of its own.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Quality knobs for one selection session.
///
/// `capture_tab_quality` is handed to the tab capture capability (0..=100),
/// `canvas_quality` drives the JPEG re-encode of the cropped region (0..=1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySettings {
    pub capture_tab_quality: u8,
    pub canvas_quality: f32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            capture_tab_quality: DEFAULT_TAB_QUALITY,
            canvas_quality: DEFAULT_CANVAS_QUALITY,
        }
    }
}

/// Loosely-typed quality payload as sent by pages and the launcher.
///
/// Missing, zero and non-finite values fall back to the session defaults,
/// so `{captureTabQuality: 0}` behaves like an absent field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSelectionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_tab_quality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_quality: Option<f64>,
}

impl StartSelectionPayload {
    pub fn from_settings(quality: QualitySettings) -> Self {
        Self {
            capture_tab_quality: Some(f64::from(quality.capture_tab_quality)),
            canvas_quality: Some(f64::from(quality.canvas_quality)),
        }
    }

    /// Resolve against `defaults`, clamping into the valid ranges.
    pub fn resolve(&self, defaults: QualitySettings) -> QualitySettings {
        let capture_tab_quality = match truthy(self.capture_tab_quality) {
            Some(q) => q.round().clamp(0.0, 100.0) as u8,
            None => defaults.capture_tab_quality,
        };
        let canvas_quality = match truthy(self.canvas_quality) {
            Some(q) => q.clamp(0.0, 1.0) as f32,
            None => defaults.canvas_quality,
        };
        QualitySettings {
            capture_tab_quality,
            canvas_quality,
        }
    }
}

fn truthy(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

/// Commands the embedding page posts to the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageCommand {
    #[serde(rename = "screenshot-start-selection")]
    StartSelection {
        #[serde(default)]
        message: Option<StartSelectionPayload>,
    },
    #[serde(rename = "screenshot-reset")]
    Reset,
    #[serde(rename = "screenshot-ping")]
    Ping,
}

impl PageCommand {
    /// Parse a window message. The window channel is shared with unrelated
    /// traffic (including our own outbound posts), so anything that is not a
    /// command yields `None` instead of an error.
    pub fn from_window_message(data: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }
}

/// Messages the overlay posts back to the embedding page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    #[serde(rename = "screenshot-selection-done")]
    SelectionDone { image: String },
    #[serde(rename = "screenshot-capture-too-small")]
    CaptureTooSmall,
    #[serde(rename = "screenshot-error")]
    Error { error: String },
    #[serde(rename = "screenshot-pong")]
    Pong,
}

/// Messages on the extension runtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExtensionMessage {
    #[serde(rename = "screenshot-start-selection")]
    StartSelection {
        #[serde(default)]
        message: Option<StartSelectionPayload>,
    },
    #[serde(rename = "screenshot-capture-request")]
    CaptureRequest(CaptureRequest),
}

/// One capture job: a CSS-pixel rectangle plus everything needed to turn it
/// into an encoded image. Immutable once sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub rect: SelectionRect,
    pub device_pixel_ratio: f64,
    #[serde(rename = "quality")]
    pub tab_quality: u8,
    #[serde(rename = "canvasQuality")]
    pub encode_quality: f32,
    #[serde(rename = "saveImg", default)]
    pub persist: bool,
}

/// Successful capture: base64 JPEG plus the crop geometry that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturePayload {
    pub image: String,
    pub geometry: CropGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureFailure {
    pub message: String,
}

impl CaptureFailure {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self {
                message: UNKNOWN_ERROR.to_string(),
            }
        } else {
            Self { message }
        }
    }
}

/// The one reply a capture request gets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CaptureResponse {
    #[serde(rename = "screenshot-capture-result")]
    Captured(CapturePayload),
    #[serde(rename = "screenshot-error")]
    Failed(CaptureFailure),
}

impl CaptureResponse {
    pub fn into_result(self) -> Result<CapturePayload, CaptureFailure> {
        match self {
            CaptureResponse::Captured(payload) => Ok(payload),
            CaptureResponse::Failed(failure) => Err(failure),
        }
    }
}
