use std::path::Path;
use tokio::fs;
use crate::core::SourceFile;
use crate::utils::{ConverterError, ConverterResult, mime_from_extension};

/// Last path component, or the input itself when it has none
pub fn extract_filename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// File name with its final extension stripped ("a.b.png" → "a.b")
pub fn base_name(name: &str) -> &str {
    let name = extract_filename(name);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Reads a file from disk into a [`SourceFile`], deriving the declared mime
/// type from its extension. Unknown extensions get an empty mime type so
/// ingestion can reject them with a reason.
pub async fn read_source(path: impl AsRef<Path>) -> ConverterResult<SourceFile> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .await
        .map_err(|e| ConverterError::IO(format!("Cannot read {}: {e}", path.display())))?;
    let display = path.to_string_lossy();
    let name = extract_filename(&display).to_string();
    let mime = mime_from_extension(&display).unwrap_or_default().to_string();
    Ok(SourceFile::new(name, mime, bytes))
}

/// Writes bytes to `path`, creating parent directories as needed.
pub async fn write_output(path: impl AsRef<Path>, bytes: &[u8]) -> ConverterResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_last_extension() {
        assert_eq!(base_name("holiday.photo.png"), "holiday.photo");
        assert_eq!(base_name("dir/cat.jpeg"), "cat");
        assert_eq!(base_name("README"), "README");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[tokio::test]
    async fn read_source_derives_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let source = read_source(&path).await.unwrap();
        assert_eq!(source.name, "pixel.png");
        assert_eq!(source.mime, "image/png");
        assert_eq!(source.size(), 3);
    }

    #[tokio::test]
    async fn write_output_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/file.bin");
        write_output(&path, b"abc").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }
}
