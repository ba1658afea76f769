// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod history;
pub mod processing;
pub mod export;

// Public exports for external consumers
pub use core::{AppState, ConverterConfig, ConverterEvent, EventSink, ItemId, SourceFile};
pub use processing::{BatchProcessor, BatchSummary, Codec, RasterCodec};
pub use utils::{ConverterError, ConverterResult, ImageFormat};

// This library file is the engine's public API; the command-line front end
// lives in main.rs.
