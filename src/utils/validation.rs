use crate::core::SourceFile;
use crate::utils::{ConverterError, ConverterResult, ImageFormat};

/// Validates a file offered for ingestion and returns its source format.
///
/// Only the declared mime type is consulted; content sniffing is left to the
/// codec, which reports a decode error for mislabelled payloads.
pub fn validate_source(file: &SourceFile) -> ConverterResult<ImageFormat> {
    let format = ImageFormat::from_mime(&file.mime)
        .filter(ImageFormat::is_accepted_input)
        .ok_or_else(|| ConverterError::unsupported_input(&file.name, &file.mime))?;

    if file.bytes.is_empty() {
        return Err(ConverterError::EmptyInput(file.name.clone()));
    }

    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_declared_image_types() {
        let file = SourceFile::new("a.bmp", "image/bmp", vec![0]);
        assert_eq!(validate_source(&file).unwrap(), ImageFormat::BMP);
    }

    #[test]
    fn rejects_unsupported_types_with_reason() {
        let file = SourceFile::new("scan.tiff", "image/tiff", vec![0]);
        assert_eq!(
            validate_source(&file),
            Err(ConverterError::unsupported_input("scan.tiff", "image/tiff"))
        );
        let file = SourceFile::new("notes.txt", "text/plain", vec![0]);
        assert!(matches!(
            validate_source(&file),
            Err(ConverterError::UnsupportedInputType { .. })
        ));
    }

    #[test]
    fn rejects_empty_payloads() {
        let file = SourceFile::new("empty.png", "image/png", Vec::new());
        assert_eq!(
            validate_source(&file),
            Err(ConverterError::EmptyInput("empty.png".into()))
        );
    }
}
