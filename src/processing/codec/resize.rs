//! Draws a decoded source onto a destination surface of an exact size.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::core::{Dimensions, ResizeMode};
use crate::processing::geometry::{self, center_offset};

const FILTER: FilterType = FilterType::Lanczos3;

/// Produces a `target`-sized surface from `image` using the given layout.
pub fn draw(image: &DynamicImage, target: Dimensions, mode: ResizeMode) -> DynamicImage {
    match mode {
        ResizeMode::Fit => draw_fit(image, target),
        ResizeMode::Fill => draw_fill(image, target),
    }
}

/// Scales to contain and centers the result on a transparent surface.
fn draw_fit(image: &DynamicImage, target: Dimensions) -> DynamicImage {
    let source = Dimensions::new(image.width(), image.height());
    let placed = geometry::fit(source, target);
    // Extreme ratios can round an axis to zero
    let placed = Dimensions::new(placed.width.max(1), placed.height.max(1));

    let scaled = image.resize_exact(placed.width, placed.height, FILTER).to_rgba8();
    let mut canvas = RgbaImage::new(target.width, target.height);
    imageops::overlay(
        &mut canvas,
        &scaled,
        center_offset(target.width, placed.width),
        center_offset(target.height, placed.height),
    );
    DynamicImage::ImageRgba8(canvas)
}

/// Scales to cover and keeps the centered `target`-sized window.
///
/// Only the source region that lands inside the destination is resampled,
/// so the oversized cover surface is never allocated. The window is clamped
/// to the source bounds.
fn draw_fill(image: &DynamicImage, target: Dimensions) -> DynamicImage {
    let source = Dimensions::new(image.width(), image.height());
    let cover = geometry::fill(source, target);

    let scale_x = source.width as f64 / cover.width.max(1) as f64;
    let scale_y = source.height as f64 / cover.height.max(1) as f64;

    let crop_w = ((target.width as f64 * scale_x).round() as u32).clamp(1, source.width);
    let crop_h = ((target.height as f64 * scale_y).round() as u32).clamp(1, source.height);

    // Negated draw offset, in source pixels
    let x = (-center_offset(target.width, cover.width)).max(0) as f64 * scale_x;
    let y = (-center_offset(target.height, cover.height)).max(0) as f64 * scale_y;
    let x = (x.round() as u32).min(source.width - crop_w);
    let y = (y.round() as u32).min(source.height - crop_h);

    image
        .crop_imm(x, y, crop_w, crop_h)
        .resize_exact(target.width, target.height, FILTER)
}
