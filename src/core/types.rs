//! Core types for conversion settings, payloads and geometry inputs.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::utils::ImageFormat;

/// Smallest and largest accepted custom scale percentage.
pub const MIN_SCALE_PERCENT: u32 = 1;
pub const MAX_SCALE_PERCENT: u32 = 400;
const DEFAULT_SCALE_PERCENT: u32 = 100;

/// Width and height of an image in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height as a 64-bit float
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// A target size where either axis may be left open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl PartialDimensions {
    pub const fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub const fn width(width: u32) -> Self {
        Self { width: Some(width), height: None }
    }

    pub const fn height(height: u32) -> Self {
        Self { width: None, height: Some(height) }
    }

    /// Both axes, if both are present
    pub fn complete(&self) -> Option<Dimensions> {
        Some(Dimensions::new(self.width?, self.height?))
    }
}

impl From<Dimensions> for PartialDimensions {
    fn from(d: Dimensions) -> Self {
        Self::new(Some(d.width), Some(d.height))
    }
}

/// How a source is laid out inside an explicit destination size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Scale to contain, letterboxed with transparent padding
    #[default]
    Fit,
    /// Scale to cover, overflow cropped
    Fill,
}

/// Per-item explicit resize settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: bool,
    pub mode: ResizeMode,
    pub enabled: bool,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            mode: ResizeMode::Fit,
            enabled: false,
        }
    }
}

impl ResizeSettings {
    pub fn target(&self) -> PartialDimensions {
        PartialDimensions::new(self.width, self.height)
    }
}

/// Named destination size offered for global resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePreset {
    pub name: &'static str,
    pub dimensions: Dimensions,
}

pub const RESIZE_PRESETS: [ResizePreset; 6] = [
    ResizePreset { name: "HD", dimensions: Dimensions::new(1920, 1080) },
    ResizePreset { name: "4K", dimensions: Dimensions::new(3840, 2160) },
    ResizePreset { name: "Instagram Square", dimensions: Dimensions::new(1080, 1080) },
    ResizePreset { name: "Instagram Story", dimensions: Dimensions::new(1080, 1920) },
    ResizePreset { name: "Facebook Cover", dimensions: Dimensions::new(1200, 630) },
    ResizePreset { name: "Twitter Header", dimensions: Dimensions::new(1500, 500) },
];

impl ResizePreset {
    /// Case-insensitive lookup by name.
    pub fn find(name: &str) -> Option<Self> {
        RESIZE_PRESETS
            .into_iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Enabled settings targeting this preset, aspect lock on.
    pub fn settings(&self, mode: ResizeMode) -> ResizeSettings {
        ResizeSettings {
            width: Some(self.dimensions.width),
            height: Some(self.dimensions.height),
            maintain_aspect_ratio: true,
            mode,
            enabled: true,
        }
    }
}

/// Partial update of [`ResizeSettings`]; only `Some` fields are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizePatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: Option<bool>,
    pub mode: Option<ResizeMode>,
    pub enabled: Option<bool>,
}

impl ResizePatch {
    pub fn apply(&self, settings: &mut ResizeSettings) {
        if let Some(width) = self.width {
            settings.width = Some(width);
        }
        if let Some(height) = self.height {
            settings.height = Some(height);
        }
        if let Some(keep) = self.maintain_aspect_ratio {
            settings.maintain_aspect_ratio = keep;
        }
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(enabled) = self.enabled {
            settings.enabled = enabled;
        }
    }
}

/// Coarse three-level encoder quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    #[default]
    High,
    Medium,
    Low,
}

/// Percentage-of-original pre-resize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputScale {
    #[default]
    Original,
    Half,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    pub quality_preset: QualityPreset,
    pub output_scale: OutputScale,
    pub custom_scale_percent: Option<u32>,
}

impl ConversionOptions {
    /// Scale factor of the scale-preset stage, `None` when it does not run.
    pub fn scale_factor(&self) -> Option<f64> {
        match self.output_scale {
            OutputScale::Original => None,
            OutputScale::Half => Some(0.5),
            OutputScale::Custom => {
                let percent = self.custom_scale_percent.unwrap_or(DEFAULT_SCALE_PERCENT);
                Some(percent as f64 / 100.0)
            }
        }
    }
}

/// Partial update of [`ConversionOptions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsPatch {
    pub quality_preset: Option<QualityPreset>,
    pub output_scale: Option<OutputScale>,
    pub custom_scale_percent: Option<u32>,
}

impl OptionsPatch {
    pub fn apply(&self, options: &mut ConversionOptions) {
        if let Some(preset) = self.quality_preset {
            options.quality_preset = preset;
        }
        if let Some(scale) = self.output_scale {
            options.output_scale = scale;
        }
        if let Some(percent) = self.custom_scale_percent {
            options.custom_scale_percent = Some(percent.clamp(MIN_SCALE_PERCENT, MAX_SCALE_PERCENT));
        }
    }
}

/// Encoded image bytes tagged with the format they are encoded in.
///
/// Bytes are shared, so snapshots of an item never copy payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Arc<[u8]>,
    pub format: ImageFormat,
}

impl ImageBlob {
    pub fn new(bytes: impl Into<Arc<[u8]>>, format: ImageFormat) -> Self {
        Self { bytes: bytes.into(), format }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Output of a successful conversion: payload plus effective output format.
pub type Artifact = ImageBlob;

/// A file offered for ingestion: display name, declared mime type, payload.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_per_preset() {
        let mut options = ConversionOptions::default();
        assert_eq!(options.scale_factor(), None);
        options.output_scale = OutputScale::Half;
        assert_eq!(options.scale_factor(), Some(0.5));
        options.output_scale = OutputScale::Custom;
        assert_eq!(options.scale_factor(), Some(1.0));
        options.custom_scale_percent = Some(250);
        assert_eq!(options.scale_factor(), Some(2.5));
    }

    #[test]
    fn options_patch_merges_and_clamps() {
        let mut options = ConversionOptions::default();
        OptionsPatch {
            output_scale: Some(OutputScale::Custom),
            custom_scale_percent: Some(900),
            ..Default::default()
        }
        .apply(&mut options);
        assert_eq!(options.quality_preset, QualityPreset::High);
        assert_eq!(options.output_scale, OutputScale::Custom);
        assert_eq!(options.custom_scale_percent, Some(MAX_SCALE_PERCENT));
    }

    #[test]
    fn resize_patch_keeps_untouched_fields() {
        let mut settings = ResizeSettings {
            width: Some(800),
            height: Some(600),
            ..Default::default()
        };
        ResizePatch {
            enabled: Some(true),
            mode: Some(ResizeMode::Fill),
            ..Default::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.width, Some(800));
        assert_eq!(settings.height, Some(600));
        assert!(settings.maintain_aspect_ratio);
        assert_eq!(settings.mode, ResizeMode::Fill);
        assert!(settings.enabled);
    }

    #[test]
    fn presets_are_found_by_name() {
        let story = ResizePreset::find("instagram story").unwrap();
        assert_eq!(story.dimensions, Dimensions::new(1080, 1920));
        assert!(ResizePreset::find("8K").is_none());
        let settings = story.settings(ResizeMode::Fill);
        assert!(settings.enabled);
        assert_eq!(settings.target().complete(), Some(Dimensions::new(1080, 1920)));
    }

    #[test]
    fn settings_serialize_camel_case() {
        let json = serde_json::to_value(ResizeSettings::default()).unwrap();
        assert_eq!(json["maintainAspectRatio"], true);
        assert_eq!(json["mode"], "fit");
    }
}
