//! Output file names for downloads and archive entries.

use crate::utils::{ImageFormat, base_name};

/// Sequence token, zero-padded to three digits
pub const SEQUENCE_TOKEN: &str = "{n}";
/// Original file name without its extension
pub const NAME_TOKEN: &str = "{name}";

/// Builds an archive entry name for the `sequence`-th (1-based) completed item.
///
/// Without a pattern the name is `<base>-convertido-<seq>`. The extension
/// is always that of the bytes actually written.
pub fn entry_name(
    pattern: Option<&str>,
    original_name: &str,
    sequence: usize,
    format: ImageFormat,
) -> String {
    let base = base_name(original_name);
    let sequence = format!("{sequence:03}");
    let stem = match pattern.map(str::trim).filter(|p| !p.is_empty()) {
        Some(pattern) => pattern
            .replace(SEQUENCE_TOKEN, &sequence)
            .replace(NAME_TOKEN, base),
        None => format!("{base}-convertido-{sequence}"),
    };
    // Entries stay flat inside the archive
    let stem = stem.replace(['/', '\\'], "_");
    format!("{stem}.{}", format.encoded_as())
}

/// Single-file download name: `<base>-convertido.<ext>`.
pub fn download_name(original_name: &str, format: ImageFormat) -> String {
    format!("{}-convertido.{}", base_name(original_name), format.encoded_as())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pattern_uses_base_and_sequence() {
        assert_eq!(
            entry_name(None, "holiday.photo.png", 3, ImageFormat::WebP),
            "holiday.photo-convertido-003.webp"
        );
    }

    #[test]
    fn tokens_are_replaced_everywhere() {
        assert_eq!(
            entry_name(Some("{name}_{n}_{n}"), "cat.jpg", 12, ImageFormat::JPEG),
            "cat_012_012.jpeg"
        );
        assert_eq!(entry_name(Some("img-{n}"), "cat.jpg", 1000, ImageFormat::PNG), "img-1000.png");
    }

    #[test]
    fn blank_pattern_falls_back_to_default() {
        assert_eq!(entry_name(Some("   "), "a.bmp", 1, ImageFormat::BMP), "a-convertido-001.bmp");
    }

    #[test]
    fn degraded_formats_get_png_extension() {
        assert_eq!(entry_name(None, "scan.png", 1, ImageFormat::TIFF), "scan-convertido-001.png");
        assert_eq!(download_name("scan.png", ImageFormat::ICO), "scan-convertido.png");
    }

    #[test]
    fn separators_do_not_create_folders() {
        assert_eq!(entry_name(Some("a/{name}"), "b.png", 1, ImageFormat::PNG), "a_b.png");
    }
}
