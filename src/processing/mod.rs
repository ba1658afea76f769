pub mod batch;
pub mod codec;
pub mod geometry;

pub use batch::{BatchProcessor, BatchSummary};
pub use codec::{Codec, ProgressFn, RasterCodec, ResizeRequest};
