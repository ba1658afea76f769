pub mod error;
pub mod validation;
pub mod formats;
pub mod fs;

pub use error::{ConverterError, ConverterResult};
pub use validation::validate_source;
pub use formats::{ImageFormat, mime_from_extension, quality_for, encoder_quality};
pub use fs::{base_name, extract_filename, read_source, write_output};
