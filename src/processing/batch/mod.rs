mod pipeline;
mod processor;

pub use pipeline::{Band, PipelineSettings, PlannedStage, Stage, bands, plan};
pub use processor::{BatchProcessor, BatchSummary};
