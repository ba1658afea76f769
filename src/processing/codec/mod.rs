//! Codec boundary: decode, draw and encode behind one async trait.
//!
//! [`RasterCodec`] is the production implementation on the `image` crate.
//! Every decode, draw and encode runs inside `tokio::task::spawn_blocking`
//! so the runtime is never blocked; progress is reported between those
//! steps at 25/50/75/100.

mod formats;
mod resize;

use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::core::{Dimensions, ImageBlob, PartialDimensions, QualityPreset, ResizeMode};
use crate::processing::geometry;
use crate::utils::formats::RESIZE_QUALITY;
use crate::utils::{ConverterError, ConverterResult, ImageFormat, quality_for};

pub use formats::encode;
pub use resize::draw;

/// Sub-progress callback, 0..=100, non-decreasing within one call.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Destination of a resize. Both axes must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mode: ResizeMode,
}

impl ResizeRequest {
    pub fn exact(dimensions: Dimensions, mode: ResizeMode) -> Self {
        Self {
            width: Some(dimensions.width),
            height: Some(dimensions.height),
            mode,
        }
    }

    /// The full target size, or `MissingDimensions`/`InvalidDimensions`.
    pub fn target(&self) -> ConverterResult<Dimensions> {
        let (Some(width), Some(height)) = (self.width, self.height) else {
            return Err(ConverterError::MissingDimensions);
        };
        if !geometry::validate(PartialDimensions::new(Some(width), Some(height))) {
            return Err(ConverterError::invalid_dimensions(format!("{width}×{height}")));
        }
        Ok(Dimensions::new(width, height))
    }
}

pub trait Codec: Send + Sync {
    /// Reads the natural size of `source` without a full decode where possible.
    fn probe(&self, source: &ImageBlob) -> impl Future<Output = ConverterResult<Dimensions>> + Send;

    /// Re-encodes `source` at its natural size to `format`.
    fn reencode(
        &self,
        source: &ImageBlob,
        format: ImageFormat,
        preset: QualityPreset,
        progress: ProgressFn<'_>,
    ) -> impl Future<Output = ConverterResult<ImageBlob>> + Send;

    /// Draws `source` onto an exactly sized surface, keeping the source format.
    fn resize(
        &self,
        source: &ImageBlob,
        request: ResizeRequest,
        progress: ProgressFn<'_>,
    ) -> impl Future<Output = ConverterResult<ImageBlob>> + Send;
}

/// `image`-crate codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec;

impl RasterCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for RasterCodec {
    async fn probe(&self, source: &ImageBlob) -> ConverterResult<Dimensions> {
        let bytes = Arc::clone(&source.bytes);
        let hint = source.format;
        tokio::task::spawn_blocking(move || -> ConverterResult<Dimensions> {
            let (width, height) = reader(&bytes, hint)?.into_dimensions()?;
            Ok(Dimensions::new(width, height))
        })
        .await?
    }

    async fn reencode(
        &self,
        source: &ImageBlob,
        format: ImageFormat,
        preset: QualityPreset,
        progress: ProgressFn<'_>,
    ) -> ConverterResult<ImageBlob> {
        let image = decode_blocking(source).await?;
        progress(25);
        // The decoded image already is the natural-size surface
        progress(50);

        let quality = quality_for(format, preset);
        progress(75);
        let bytes = encode_blocking(image, format, quality).await?;
        progress(100);

        debug!("Re-encoded {} → {} ({} bytes)", source.format, format.encoded_as(), bytes.len());
        Ok(ImageBlob::new(bytes, format.encoded_as()))
    }

    async fn resize(
        &self,
        source: &ImageBlob,
        request: ResizeRequest,
        progress: ProgressFn<'_>,
    ) -> ConverterResult<ImageBlob> {
        let target = request.target()?;
        let image = decode_blocking(source).await?;
        progress(25);

        let mode = request.mode;
        let surface = tokio::task::spawn_blocking(move || draw(&image, target, mode)).await?;
        progress(50);

        let format = source.format;
        let quality = format.encoded_as().is_lossy().then_some(RESIZE_QUALITY);
        progress(75);
        let bytes = encode_blocking(surface, format, quality).await?;
        progress(100);

        debug!("Resized to {}×{} ({:?}, {} bytes)", target.width, target.height, mode, bytes.len());
        Ok(ImageBlob::new(bytes, format.encoded_as()))
    }
}

/// Reader over `bytes`, sniffing the container and falling back to `hint`.
fn reader(bytes: &[u8], hint: ImageFormat) -> ConverterResult<ImageReader<Cursor<&[u8]>>> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConverterError::decode(format!("Failed to read image: {e}")))?;
    let format = match reader.format() {
        Some(format) => format,
        None => {
            reader.set_format(hint.image_format());
            hint.image_format()
        }
    };
    if format == image::ImageFormat::Avif && !ImageFormat::AVIF.is_decodable() {
        return Err(ConverterError::decode(
            "AVIF decoding is not available in this build (enable the avif-decode feature)",
        ));
    }
    Ok(reader)
}

async fn decode_blocking(source: &ImageBlob) -> ConverterResult<DynamicImage> {
    let bytes = Arc::clone(&source.bytes);
    let hint = source.format;
    tokio::task::spawn_blocking(move || -> ConverterResult<DynamicImage> {
        reader(&bytes, hint)?
            .decode()
            .map_err(|e| ConverterError::decode(format!("Failed to load image: {e}")))
    })
    .await?
}

async fn encode_blocking(
    image: DynamicImage,
    format: ImageFormat,
    quality: Option<f32>,
) -> ConverterResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || encode(&image, format, quality)).await?
}
