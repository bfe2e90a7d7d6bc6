//! CSS-pixel → backing-store-pixel crop math.
//!
//! The output size is the source crop scaled by the device pixel ratio a
//! second time: `tw = floor(rect.width * ratio * ratio)`. Every captured
//! image's resolution depends on this, so it is kept exactly as is.

use serde::{Deserialize, Serialize};

use crate::selection::SelectionRect;

/// Source region in the captured frame plus the destination canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropGeometry {
    pub sx: f64,
    pub sy: f64,
    pub sw: f64,
    pub sh: f64,
    pub tw: u32,
    pub th: u32,
}

impl CropGeometry {
    pub fn from_css(rect: &SelectionRect, device_pixel_ratio: f64) -> Self {
        let ratio = effective_ratio(device_pixel_ratio);

        let sw = rect.width * ratio;
        let sh = rect.height * ratio;

        Self {
            sx: rect.x * ratio,
            sy: rect.y * ratio,
            sw,
            sh,
            // `as` saturates: negative or NaN sizes become 0 and are rejected
            // when drawing.
            tw: (sw * ratio).floor() as u32,
            th: (sh * ratio).floor() as u32,
        }
    }
}

/// Missing, zero, negative or non-finite ratios count as 1.
pub fn effective_ratio(device_pixel_ratio: f64) -> f64 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    }
}
