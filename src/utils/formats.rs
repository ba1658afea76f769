use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::core::QualityPreset;
use crate::utils::ConverterError;

/// Mime types accepted at ingestion. Anything else is rejected per file.
pub const ACCEPTED_INPUT_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/bmp",
    "image/avif",
];

/// Quality used by the resize stage regardless of preset.
pub const RESIZE_QUALITY: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    JPEG,
    PNG,
    WebP,
    BMP,
    AVIF,
    TIFF,
    ICO,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 7] = [
        Self::JPEG,
        Self::PNG,
        Self::WebP,
        Self::BMP,
        Self::AVIF,
        Self::TIFF,
        Self::ICO,
    ];

    /// Lowercase name, also used as the output file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JPEG => "jpeg",
            Self::PNG => "png",
            Self::WebP => "webp",
            Self::BMP => "bmp",
            Self::AVIF => "avif",
            Self::TIFF => "tiff",
            Self::ICO => "ico",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::JPEG => "image/jpeg",
            Self::PNG => "image/png",
            Self::WebP => "image/webp",
            Self::BMP => "image/bmp",
            Self::AVIF => "image/avif",
            Self::TIFF => "image/tiff",
            Self::ICO => "image/x-icon",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_lowercase();
        match mime.as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::JPEG),
            "image/png" => Some(Self::PNG),
            "image/webp" => Some(Self::WebP),
            "image/bmp" => Some(Self::BMP),
            "image/avif" => Some(Self::AVIF),
            "image/tiff" => Some(Self::TIFF),
            "image/x-icon" | "image/vnd.microsoft.icon" => Some(Self::ICO),
            _ => None,
        }
    }

    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::JPEG => &["jpg", "jpeg"],
            Self::PNG => &["png"],
            Self::WebP => &["webp"],
            Self::BMP => &["bmp"],
            Self::AVIF => &["avif"],
            Self::TIFF => &["tif", "tiff"],
            Self::ICO => &["ico"],
        }
    }

    /// Formats whose encoder takes a quality scalar
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::JPEG | Self::WebP | Self::AVIF)
    }

    /// Declared output formats that are actually written as PNG
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::TIFF | Self::ICO)
    }

    /// Format the encoder really produces when asked for `self`
    pub fn encoded_as(&self) -> Self {
        if self.is_degraded() { Self::PNG } else { *self }
    }

    /// Whether this build can decode the format. AVIF needs the
    /// `avif-decode` feature; TIFF and ICO are never read.
    pub fn is_decodable(&self) -> bool {
        match self {
            Self::AVIF => cfg!(feature = "avif-decode"),
            Self::TIFF | Self::ICO => false,
            _ => true,
        }
    }

    pub fn is_accepted_input(&self) -> bool {
        ACCEPTED_INPUT_TYPES.contains(&self.mime())
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::JPEG => image::ImageFormat::Jpeg,
            Self::PNG => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
            Self::BMP => image::ImageFormat::Bmp,
            Self::AVIF => image::ImageFormat::Avif,
            Self::TIFF => image::ImageFormat::Tiff,
            Self::ICO => image::ImageFormat::Ico,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = ConverterError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        let ext = ext.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&ext.as_str()))
            .ok_or_else(|| ConverterError::config(format!("Unsupported image format: {ext}")))
    }
}

/// Encoder quality in 0..=1 for a lossy format, `None` for lossless ones.
pub fn quality_for(format: ImageFormat, preset: QualityPreset) -> Option<f32> {
    if !format.encoded_as().is_lossy() {
        return None;
    }
    Some(match preset {
        QualityPreset::High => 0.92,
        QualityPreset::Medium => 0.80,
        QualityPreset::Low => 0.60,
    })
}

/// Maps a 0..=1 quality scalar onto the 1..=100 scale the encoders expect.
pub fn encoder_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Guess the declared mime type of a file from its extension.
pub fn mime_from_extension(path: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())?;
    ImageFormat::from_str(ext).ok().map(|f| f.mime())
}
