//! Capture service domain: public API.
//!
//! Turns a CSS-pixel selection into an encoded crop of the visible tab.
//! External code should only use the items exported here.

mod geometry;
mod persist;
mod region;
mod screenshot;
mod service;

pub use geometry::{effective_ratio, CropGeometry};
pub use persist::{persist_capture, screenshot_filename, DownloadDir, Downloader, PersistError};
pub use region::{crop_to_jpeg_bytes, crop_to_png_bytes, decode_data_uri, to_data_uri, CropError};
pub use screenshot::{frame_to_data_uri, CaptureError, FileTabCapturer, TabCapturer};
pub use service::{serve, spawn_capture_service, CaptureService};
