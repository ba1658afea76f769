//! Error types for the batch converter.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use std::io;
use thiserror::Error;
use serde::Serialize;

use crate::core::ItemId;

/// Main error type for the converter.
///
/// Every failure that can reach a caller (ingestion, codec, persistence,
/// export) is expressed as one of these variants. None of them is fatal to
/// the process; the worst case is a single item parked in `error`.
#[derive(Error, Debug, Clone, Serialize, PartialEq)]
pub enum ConverterError {
    /// File was offered with a mime type the converter does not ingest
    #[error("Unsupported format: {name} ({mime})")]
    UnsupportedInputType { name: String, mime: String },

    /// File carried no bytes at all
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Resize was requested before the target size was resolved
    #[error("Target dimensions not specified")]
    MissingDimensions,

    /// Width or height outside 1..=10000
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Source bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Surface could not be encoded to the target format
    #[error("Encode error: {0}")]
    Encode(String),

    /// Catch-all for a failed pipeline stage
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Key-value store read/write failure
    #[error("Store error: {0}")]
    Store(String),

    /// Archive packaging failure
    #[error("Archive error: {0}")]
    Archive(String),

    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),

    /// No item with this id in the registry
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// Operation refused because a conversion is already running
    #[error("Busy: {0}")]
    Busy(String),
}

/// Convenience result type for converter operations.
pub type ConverterResult<T> = Result<T, ConverterError>;

// Helper methods for error creation
impl ConverterError {
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::Encode(msg.into())
    }

    pub fn conversion<T: Into<String>>(msg: T) -> Self {
        Self::Conversion(msg.into())
    }

    pub fn store<T: Into<String>>(msg: T) -> Self {
        Self::Store(msg.into())
    }

    pub fn archive<T: Into<String>>(msg: T) -> Self {
        Self::Archive(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_dimensions<T: Into<String>>(msg: T) -> Self {
        Self::InvalidDimensions(msg.into())
    }

    pub fn unsupported_input(name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self::UnsupportedInputType {
            name: name.into(),
            mime: mime.into(),
        }
    }

    /// Message recorded on an item that failed conversion.
    ///
    /// Codec failures keep their own wording; anything else is already a
    /// human-readable description.
    pub fn item_message(&self) -> String {
        match self {
            Self::Conversion(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

// Convert std::io::Error to ConverterError
impl From<io::Error> for ConverterError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

impl From<serde_json::Error> for ConverterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<zip::result::ZipError> for ConverterError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

// Most `image` failures surface while reading the source
impl From<image::ImageError> for ConverterError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => Self::Encode(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}

// Blocking codec work runs on tokio's pool; a join failure means the task panicked.
impl From<tokio::task::JoinError> for ConverterError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Conversion(format!("Task panicked: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_input_names_the_file() {
        let err = ConverterError::unsupported_input("scan.gif", "image/gif");
        assert_eq!(err.to_string(), "Unsupported format: scan.gif (image/gif)");
    }

    #[test]
    fn conversion_message_is_unwrapped_for_items() {
        let err = ConverterError::conversion("canvas exploded");
        assert_eq!(err.item_message(), "canvas exploded");
        let err = ConverterError::decode("bad header");
        assert_eq!(err.item_message(), "Decode error: bad header");
    }

    #[test]
    fn io_errors_convert() {
        let err: ConverterError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ConverterError::IO(msg) if msg == "gone"));
    }
}
