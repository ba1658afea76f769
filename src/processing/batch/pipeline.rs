//! Per-item stage plan and the fixed progress bands each stage reports into.
//!
//! | stages run            | scale    | resize   | reencode  |
//! |-----------------------|----------|----------|-----------|
//! | reencode only         |          |          | 0..=100   |
//! | scale + reencode      | 0..=30   |          | 50..=100  |
//! | resize + reencode     |          | 0..=50   | 50..=100  |
//! | scale + resize + re.  | 0..=30   | 30..=50  | 50..=100  |
//!
//! A skipped stage leaves its band unused; it never widens another stage's.

use crate::core::{ConversionOptions, Dimensions, QualityPreset, ResizeSettings};
use crate::processing::codec::ResizeRequest;
use crate::processing::geometry;
use crate::utils::ImageFormat;

/// Inclusive slice of an item's 0..=100 progress owned by one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub start: u8,
    pub end: u8,
}

impl Band {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Maps stage sub-progress (0..=100) linearly into the band.
    pub fn map(&self, sub: u8) -> u8 {
        let span = f64::from(self.end - self.start);
        let offset = (span * f64::from(sub.min(100)) / 100.0).round() as u8;
        self.start + offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Pre-resize to a percentage of the original size
    ScalePreset(ResizeRequest),
    /// Resize to the item's explicit width/height
    Resize(ResizeRequest),
    Reencode { format: ImageFormat, preset: QualityPreset },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScalePreset(_) => "scale",
            Self::Resize(_) => "resize",
            Self::Reencode { .. } => "reencode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedStage {
    pub stage: Stage,
    pub band: Band,
}

/// Settings captured when an item's conversion starts. Later edits to the
/// item do not reach a pipeline that is already running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub target_format: ImageFormat,
    pub resize: ResizeSettings,
    pub options: ConversionOptions,
    pub original_dimensions: Option<Dimensions>,
}

/// Bands for the stages that run. `None` marks a skipped stage.
pub fn bands(scale_runs: bool, resize_runs: bool) -> (Option<Band>, Option<Band>, Band) {
    let scale = scale_runs.then_some(Band::new(0, 30));
    let resize = resize_runs.then(|| if scale_runs { Band::new(30, 50) } else { Band::new(0, 50) });
    let base = if scale_runs || resize_runs { 50 } else { 0 };
    (scale, resize, Band::new(base, 100))
}

/// Orders the stages for one item: scale preset, explicit resize, reencode.
pub fn plan(settings: &PipelineSettings) -> Vec<PlannedStage> {
    let mode = settings.resize.mode;

    // The scale preset needs the original size to derive its target
    let scale = settings
        .options
        .scale_factor()
        .zip(settings.original_dimensions)
        .map(|(factor, original)| {
            ResizeRequest::exact(geometry::scaled(original, factor), mode)
        });
    let resize = settings.resize.enabled.then(|| ResizeRequest {
        width: settings.resize.width,
        height: settings.resize.height,
        mode,
    });

    let (scale_band, resize_band, reencode_band) = bands(scale.is_some(), resize.is_some());

    let mut stages = Vec::with_capacity(3);
    if let (Some(request), Some(band)) = (scale, scale_band) {
        stages.push(PlannedStage { stage: Stage::ScalePreset(request), band });
    }
    if let (Some(request), Some(band)) = (resize, resize_band) {
        stages.push(PlannedStage { stage: Stage::Resize(request), band });
    }
    stages.push(PlannedStage {
        stage: Stage::Reencode {
            format: settings.target_format,
            preset: settings.options.quality_preset,
        },
        band: reencode_band,
    });
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OutputScale, ResizeMode};

    fn settings() -> PipelineSettings {
        PipelineSettings {
            target_format: ImageFormat::WebP,
            resize: ResizeSettings::default(),
            options: ConversionOptions::default(),
            original_dimensions: Some(Dimensions::new(1920, 1080)),
        }
    }

    fn band_list(plan: &[PlannedStage]) -> Vec<(u8, u8)> {
        plan.iter().map(|s| (s.band.start, s.band.end)).collect()
    }

    #[test]
    fn reencode_alone_owns_everything() {
        let plan = plan(&settings());
        assert_eq!(plan.len(), 1);
        assert_eq!(band_list(&plan), vec![(0, 100)]);
    }

    #[test]
    fn scale_only_keeps_its_band() {
        let mut s = settings();
        s.options.output_scale = OutputScale::Half;
        let plan = plan(&s);
        assert_eq!(band_list(&plan), vec![(0, 30), (50, 100)]);
        assert_eq!(plan[0].band.map(100), 30);
        assert_eq!(plan[1].band.map(0), 50);
        assert_eq!(
            plan[0].stage,
            Stage::ScalePreset(ResizeRequest::exact(Dimensions::new(960, 540), ResizeMode::Fit))
        );
    }

    #[test]
    fn resize_only_takes_first_half() {
        let mut s = settings();
        s.resize.enabled = true;
        s.resize.width = Some(800);
        s.resize.height = Some(600);
        s.resize.mode = ResizeMode::Fill;
        let plan = plan(&s);
        assert_eq!(band_list(&plan), vec![(0, 50), (50, 100)]);
        assert_eq!(plan[0].stage.name(), "resize");
    }

    #[test]
    fn all_three_stages_split_30_20_50() {
        let mut s = settings();
        s.options.output_scale = OutputScale::Custom;
        s.options.custom_scale_percent = Some(25);
        s.resize.enabled = true;
        s.resize.width = Some(100);
        s.resize.height = Some(100);
        let plan = plan(&s);
        assert_eq!(band_list(&plan), vec![(0, 30), (30, 50), (50, 100)]);
        assert_eq!(
            plan[0].stage,
            Stage::ScalePreset(ResizeRequest::exact(Dimensions::new(480, 270), ResizeMode::Fit))
        );
    }

    #[test]
    fn scale_is_skipped_without_original_dimensions() {
        let mut s = settings();
        s.options.output_scale = OutputScale::Half;
        s.original_dimensions = None;
        assert_eq!(band_list(&plan(&s)), vec![(0, 100)]);
    }

    #[test]
    fn band_mapping_is_linear_and_clamped() {
        let band = Band::new(30, 50);
        assert_eq!(band.map(0), 30);
        assert_eq!(band.map(50), 40);
        assert_eq!(band.map(100), 50);
        assert_eq!(band.map(250), 50);
        assert_eq!(Band::new(0, 30).map(25), 8);
    }
}
