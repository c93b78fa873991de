pub mod api;
pub mod builder;
pub mod chunk;
pub mod pipeline;
pub mod tracker;

pub use api::HnClient;
pub use pipeline::{IngestPipeline, IngestReport, PipelineConfig};
pub use tracker::ProcessedIndex;

pub mod prelude {
    pub use super::api::HnClient;
    pub use super::pipeline::{IngestPipeline, IngestReport, PipelineConfig};
    pub use super::tracker::ProcessedIndex;
    pub use hn_core::{Document, Error, Item, Result, StoryCategory};
}
