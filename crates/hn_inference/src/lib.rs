pub mod eval;
pub mod models;
pub mod prompt;
pub mod rag;

pub use models::create_model;
pub use rag::{RagAnswer, RagEngine, SourceRef};

/// Model selection and connection settings, filled in from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub model_name: Option<String>,
    pub model_url: Option<String>,
    pub api_key: Option<String>,
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::rag::{RagAnswer, RagEngine};
    pub use super::Config;
    pub use hn_core::{Document, Error, InferenceModel, Result};
}
