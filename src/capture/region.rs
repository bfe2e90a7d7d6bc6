//! Pure region cropping logic, the functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes an encoded frame in, returns encoded bytes out.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

use super::geometry::CropGeometry;

/// Decodes a `data:<mime>;base64,<payload>` URI into a bitmap.
pub fn decode_data_uri(data_uri: &str) -> Result<DynamicImage, CropError> {
    let (header, payload) = data_uri
        .split_once(',')
        .ok_or(CropError::InvalidDataUri)?;

    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(CropError::InvalidDataUri);
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| CropError::Base64(e.to_string()))?;

    image::load_from_memory(&bytes).map_err(|e| CropError::DecodeFailed(e.to_string()))
}

/// Builds a `data:` URI around already-encoded image bytes.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Draws the geometry's source region of `frame` onto a `tw x th` canvas,
/// stretching as needed.
///
/// Mirrors canvas `drawImage` clipping: any part of the source rectangle
/// outside the frame leaves the matching canvas area transparent.
///
/// # Arguments
/// * `frame` - The full captured frame
/// * `geometry` - `sx, sy, sw, sh` in frame pixels, `tw x th` canvas size
///
/// # Returns
/// The RGBA canvas, or `OutsideFrame` when no part of the source is visible
pub fn draw_region(frame: &DynamicImage, geometry: &CropGeometry) -> Result<RgbaImage, CropError> {
    let g = geometry;
    if g.tw == 0 || g.th == 0 || !(g.sw > 0.0) || !(g.sh > 0.0) {
        return Err(CropError::ZeroDimension);
    }

    let (frame_w, frame_h) = (f64::from(frame.width()), f64::from(frame.height()));

    let left = g.sx.max(0.0);
    let top = g.sy.max(0.0);
    let right = (g.sx + g.sw).min(frame_w);
    let bottom = (g.sy + g.sh).min(frame_h);

    if !(right > left) || !(bottom > top) {
        return Err(CropError::OutsideFrame {
            requested: (g.sx, g.sy, g.sw, g.sh),
            image_size: (frame.width(), frame.height()),
        });
    }

    // Destination area covered by the visible part of the source.
    let kx = f64::from(g.tw) / g.sw;
    let ky = f64::from(g.th) / g.sh;
    let dx0 = ((left - g.sx) * kx).round() as u32;
    let dy0 = ((top - g.sy) * ky).round() as u32;
    let dx1 = (((right - g.sx) * kx).round() as u32).min(g.tw);
    let dy1 = (((bottom - g.sy) * ky).round() as u32).min(g.th);

    let mut canvas = RgbaImage::new(g.tw, g.th);
    if dx1 <= dx0 || dy1 <= dy0 {
        return Ok(canvas);
    }

    let src_x = left.floor() as u32;
    let src_y = top.floor() as u32;
    let src_w = ((right.ceil() as u32).min(frame.width()) - src_x).max(1);
    let src_h = ((bottom.ceil() as u32).min(frame.height()) - src_y).max(1);

    let source = frame.crop_imm(src_x, src_y, src_w, src_h).to_rgba8();
    let (dst_w, dst_h) = (dx1 - dx0, dy1 - dy0);
    let scaled = if (src_w, src_h) == (dst_w, dst_h) {
        source
    } else {
        imageops::resize(&source, dst_w, dst_h, FilterType::Triangle)
    };

    imageops::replace(&mut canvas, &scaled, i64::from(dx0), i64::from(dy0));
    Ok(canvas)
}

/// Maps a 0..=1 canvas quality to the encoder's 1..=100 scale.
pub fn jpeg_quality(canvas_quality: f32) -> u8 {
    if !canvas_quality.is_finite() {
        return 100;
    }
    (canvas_quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// JPEG-encodes a canvas. JPEG has no alpha, so transparent areas come out
/// black, same as a browser canvas export.
pub fn encode_jpeg(canvas: &RgbaImage, canvas_quality: f32) -> Result<Vec<u8>, CropError> {
    let rgb = DynamicImage::ImageRgba8(canvas.clone()).to_rgb8();

    let mut jpeg_bytes: Vec<u8> = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, jpeg_quality(canvas_quality))
        .encode_image(&rgb)
        .map_err(|e| CropError::EncodingFailed(e.to_string()))?;

    Ok(jpeg_bytes)
}

pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>, CropError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    DynamicImage::ImageRgba8(canvas.clone())
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| CropError::EncodingFailed(e.to_string()))?;

    Ok(png_bytes)
}

/// Crops and scales `frame` per `geometry`, returning JPEG bytes.
///
/// This is a pure function with no side effects.
///
/// # Arguments
/// * `frame` - The decoded visible-tab capture, in backing-store pixels
/// * `geometry` - Source rectangle and destination size
/// * `canvas_quality` - Encoder quality on the 0..=1 canvas scale
///
/// # Returns
/// JPEG-encoded bytes of a `tw x th` image
pub fn crop_to_jpeg_bytes(
    frame: &DynamicImage,
    geometry: &CropGeometry,
    canvas_quality: f32,
) -> Result<Vec<u8>, CropError> {
    let canvas = draw_region(frame, geometry)?;
    encode_jpeg(&canvas, canvas_quality)
}

/// Crops and scales `frame` per `geometry`, returning PNG bytes.
pub fn crop_to_png_bytes(frame: &DynamicImage, geometry: &CropGeometry) -> Result<Vec<u8>, CropError> {
    let canvas = draw_region(frame, geometry)?;
    encode_png(&canvas)
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Captured frame is not a base64 data URI")]
    InvalidDataUri,

    #[error("Invalid base64 payload: {0}")]
    Base64(String),

    #[error("Image decoding failed: {0}")]
    DecodeFailed(String),

    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error("Crop rectangle {requested:?} lies outside the captured frame {image_size:?}")]
    OutsideFrame {
        requested: (f64, f64, f64, f64),
        image_size: (u32, u32),
    },

    #[error("Image encoding failed: {0}")]
    EncodingFailed(String),
}
