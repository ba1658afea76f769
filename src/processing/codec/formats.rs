//! Maps output formats and quality scalars to `image` crate encoders.
//!
//! One `save_*` function per format; [`encode`] dispatches. Quality is the
//! 0..=1 scalar from the preset table, `None` for lossless formats.

use std::io::Cursor;
use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::utils::{ConverterError, ImageFormat, encoder_quality};

type Result<T> = std::result::Result<T, ConverterError>;

// ── Encoder knobs ──────────────────────────────────────────────────────────────────────

const DEFAULT_QUALITY: f32 = 0.92;
/// 1 (slowest) ..= 10 (fastest)
const AVIF_SPEED: u8 = 6;

// ── Format save functions ──────────────────────────────────────────────────────────────

/// Encodes as baseline JPEG. Alpha is discarded.
pub fn save_jpeg(image: &DynamicImage, quality: Option<f32>) -> Result<Vec<u8>> {
    let q = encoder_quality(quality.unwrap_or(DEFAULT_QUALITY));
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut buffer), q)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ConverterError::encode(format!("JPEG encode failed: {e}")))?;
    Ok(buffer)
}

/// Encodes as lossless RGBA PNG.
pub fn save_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let mut buffer = Vec::new();
    PngEncoder::new(Cursor::new(&mut buffer))
        .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(|e| ConverterError::encode(format!("PNG encode failed: {e}")))?;
    Ok(buffer)
}

/// Encodes as WebP.
///
/// The pure-Rust encoder only writes lossless WebP, so quality below 1.0 is
/// applied by quantizing RGB channels first. Alpha is left untouched.
pub fn save_webp(image: &DynamicImage, quality: Option<f32>) -> Result<Vec<u8>> {
    let mut rgba = image.to_rgba8();
    let q = quality.map(encoder_quality).unwrap_or(100);
    quantize_rgb(rgba.as_mut(), q);

    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(Cursor::new(&mut buffer))
        .encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(|e| ConverterError::encode(format!("WebP encode failed: {e}")))?;
    Ok(buffer)
}

/// Encodes as uncompressed BMP with alpha.
pub fn save_bmp(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let mut buffer = Vec::new();
    BmpEncoder::new(&mut buffer)
        .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(|e| ConverterError::encode(format!("BMP encode failed: {e}")))?;
    Ok(buffer)
}

/// Encodes as AVIF (AV1 still image).
pub fn save_avif(image: &DynamicImage, quality: Option<f32>) -> Result<Vec<u8>> {
    let q = encoder_quality(quality.unwrap_or(DEFAULT_QUALITY));
    let rgba = image.to_rgba8();
    let mut buffer = Vec::new();
    AvifEncoder::new_with_speed_quality(Cursor::new(&mut buffer), AVIF_SPEED, q)
        .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
        .map_err(|e| ConverterError::encode(format!("AVIF encode failed: {e}")))?;
    Ok(buffer)
}

/// Dispatches to the correct save function.
///
/// TIFF and ICO are written as PNG; callers tag the output with
/// [`ImageFormat::encoded_as`].
pub fn encode(image: &DynamicImage, format: ImageFormat, quality: Option<f32>) -> Result<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ConverterError::encode(format!(
            "Cannot encode an empty {}x{} surface",
            image.width(),
            image.height()
        )));
    }
    match format.encoded_as() {
        ImageFormat::JPEG => save_jpeg(image, quality),
        ImageFormat::WebP => save_webp(image, quality),
        ImageFormat::AVIF => save_avif(image, quality),
        ImageFormat::BMP => save_bmp(image),
        ImageFormat::PNG | ImageFormat::TIFF | ImageFormat::ICO => save_png(image),
    }
}

// ── WebP quality emulation ─────────────────────────────────────────────────────────────

/// Reduces each RGB channel to fewer levels as quality drops.
fn quantize_rgb(data: &mut [u8], quality: u8) {
    if quality >= 100 {
        return;
    }
    let levels = levels_for_quality(quality);
    let step = 255.0 / (levels as f32 - 1.0);
    for pixel in data.chunks_exact_mut(4) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Fine palettes at high quality, aggressively coarse at low quality.
fn levels_for_quality(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = f32::from(quality.max(1)) / 100.0;
    (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0) as u16
}
