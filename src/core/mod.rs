//! Core types and state management.
//!
//! - [`Registry`]: the item collection and its [`Action`] vocabulary
//! - [`Item`]: one submitted image and its lifecycle
//! - [`AppState`]: shared registry, history, store and event sink
//! - [`ConverterEvent`]: everything a UI can observe

mod config;
mod item;
mod preview;
mod progress;
mod registry;
mod state;
mod types;

pub use config::ConverterConfig;
pub use item::{Item, ItemId, ItemStatus, StatusKind};
pub use preview::{PreviewHandle, PreviewPool};
pub use progress::{
    ChannelSink, ConverterEvent, EventSink, MemorySink, NoopSink, Notification, NotificationLevel,
    Progress, ProgressType, percentage,
};
pub use registry::{Action, ItemDefaults, Registry};
pub use state::{AppState, IngestReport};
pub use types::{
    Artifact, ConversionOptions, Dimensions, ImageBlob, MAX_SCALE_PERCENT, MIN_SCALE_PERCENT,
    OptionsPatch, OutputScale, PartialDimensions, QualityPreset, RESIZE_PRESETS, ResizeMode,
    ResizePatch, ResizePreset, ResizeSettings, SourceFile,
};
