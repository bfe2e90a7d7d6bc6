//! Saving captures to a downloads location.
//!
//! Fire-and-forget from the service's point of view: whatever happens here
//! is logged and never reaches the in-band response.

use std::path::{Path, PathBuf};

use super::geometry::CropGeometry;
use super::region::{self, CropError};

pub const PERSIST_EXTENSION: &str = "png";

/// File-save capability.
pub trait Downloader: Send + Sync {
    fn download(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, PersistError>;
}

/// Writes files into one directory, creating it on first use.
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The platform downloads folder (`~/Downloads` and friends).
    pub fn system_default() -> Result<Self, PersistError> {
        dirs::download_dir()
            .map(Self::new)
            .ok_or(PersistError::NoDownloadDir)
    }

    /// `override_dir` if given, else the platform default.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, PersistError> {
        match override_dir {
            Some(dir) => Ok(Self::new(dir)),
            None => Self::system_default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DownloadDir {
    fn download(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        let dest = self.dir.join(filename);
        std::fs::write(&dest, bytes)?;
        Ok(dest)
    }
}

/// `screenshot-<unix-ms>.<ext>`
pub fn screenshot_filename(extension: &str) -> String {
    format!(
        "screenshot-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        extension
    )
}

/// Decodes the captured frame again, crops it, and saves it as PNG.
pub fn persist_capture(
    data_uri: &str,
    geometry: &CropGeometry,
    downloader: &dyn Downloader,
) -> Result<PathBuf, PersistError> {
    let frame = region::decode_data_uri(data_uri)?;
    let png_bytes = region::crop_to_png_bytes(&frame, geometry)?;
    downloader.download(&png_bytes, &screenshot_filename(PERSIST_EXTENSION))
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("No downloads directory available on this platform")]
    NoDownloadDir,

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error("Failed to write screenshot: {0}")]
    Io(#[from] std::io::Error),
}
