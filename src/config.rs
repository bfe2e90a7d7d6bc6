//! Runtime settings: built-in defaults plus environment overrides.
//!
//! Nothing is ever written back. A `.env` file next to the binary is
//! honoured for local development.

use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::QualitySettings;

/// Smallest accepted selection side, in CSS pixels.
pub const MIN_SIZE: f64 = 200.0;

pub const DEFAULT_TAB_QUALITY: u8 = 100;
pub const DEFAULT_CANVAS_QUALITY: f32 = 0.3;

pub const LAUNCHER_TAB_QUALITY: u8 = 100;
pub const LAUNCHER_CANVAS_QUALITY: f32 = 0.8;

/// Delay between hiding the selection rectangle and capturing the tab.
pub const PAINT_SETTLE_MS: u64 = 100;

pub const CAPTURE_CHANNEL_CAPACITY: usize = 8;

const ENV_MIN_SIZE: &str = "TAB_SNIP_MIN_SIZE";
const ENV_PAINT_SETTLE_MS: &str = "TAB_SNIP_PAINT_SETTLE_MS";
const ENV_DOWNLOAD_DIR: &str = "TAB_SNIP_DOWNLOAD_DIR";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub min_size: f64,
    pub paint_settle: Duration,
    /// Used when a start command carries no usable quality values.
    pub default_quality: QualitySettings,
    /// What the launcher sends with its start command.
    pub launcher_quality: QualitySettings,
    /// Overrides the platform downloads directory for saved screenshots.
    pub download_dir: Option<PathBuf>,
    pub channel_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_size: MIN_SIZE,
            paint_settle: Duration::from_millis(PAINT_SETTLE_MS),
            default_quality: QualitySettings::default(),
            launcher_quality: QualitySettings {
                capture_tab_quality: LAUNCHER_TAB_QUALITY,
                canvas_quality: LAUNCHER_CANVAS_QUALITY,
            },
            download_dir: None,
            channel_capacity: CAPTURE_CHANNEL_CAPACITY,
        }
    }
}

impl Settings {
    /// Defaults, then `.env`, then process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("[CONFIG] Loaded {}", path.display());
        }
        let mut settings = Self::default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Apply overrides from any key/value source. Unparseable values are
    /// logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MIN_SIZE) {
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => self.min_size = v,
                _ => log::warn!("[CONFIG] Ignoring {}={:?}", ENV_MIN_SIZE, raw),
            }
        }

        if let Some(raw) = lookup(ENV_PAINT_SETTLE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.paint_settle = Duration::from_millis(ms),
                Err(_) => log::warn!("[CONFIG] Ignoring {}={:?}", ENV_PAINT_SETTLE_MS, raw),
            }
        }

        if let Some(raw) = lookup(ENV_DOWNLOAD_DIR) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                log::warn!("[CONFIG] Ignoring empty {}", ENV_DOWNLOAD_DIR);
            } else {
                self.download_dir = Some(PathBuf::from(trimmed));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_extension_constants() {
        let s = Settings::default();
        assert_eq!(s.min_size, 200.0);
        assert_eq!(s.paint_settle, Duration::from_millis(100));
        assert_eq!(s.default_quality.capture_tab_quality, 100);
        assert_eq!(s.default_quality.canvas_quality, 0.3);
        assert_eq!(s.launcher_quality.canvas_quality, 0.8);
        assert!(s.download_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let mut s = Settings::default();
        s.apply_overrides(lookup(&[
            ("TAB_SNIP_MIN_SIZE", "150"),
            ("TAB_SNIP_PAINT_SETTLE_MS", "40"),
            ("TAB_SNIP_DOWNLOAD_DIR", "/tmp/snips"),
        ]));
        assert_eq!(s.min_size, 150.0);
        assert_eq!(s.paint_settle, Duration::from_millis(40));
        assert_eq!(s.download_dir, Some(PathBuf::from("/tmp/snips")));
    }

    #[test]
    fn bad_values_are_ignored() {
        let mut s = Settings::default();
        s.apply_overrides(lookup(&[
            ("TAB_SNIP_MIN_SIZE", "-5"),
            ("TAB_SNIP_PAINT_SETTLE_MS", "soon"),
            ("TAB_SNIP_DOWNLOAD_DIR", "   "),
        ]));
        assert_eq!(s, Settings::default());
    }
}
