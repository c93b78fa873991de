use std::sync::Arc;

use hn_core::{Error, InferenceModel, Result};

use crate::Config;

pub mod dummy;
pub mod huggingface;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use dummy::DummyModel;
pub use huggingface::HuggingFaceModel;

#[cfg(feature = "ollama")]
pub use ollama::OllamaModel;

/// Instantiate an inference model by name. `ollama` is the default and
/// talks to a locally running server; `dummy` is deterministic and only
/// meant for tests and dry runs.
pub async fn create_model(config: Config) -> Result<Arc<dyn InferenceModel>> {
    let name = config
        .model_name
        .clone()
        .unwrap_or_else(|| "ollama".to_string());

    match name.as_str() {
        "dummy" => Ok(Arc::new(DummyModel::new())),
        "huggingface" => Ok(Arc::new(HuggingFaceModel::new(&config)?)),
        #[cfg(feature = "ollama")]
        "ollama" => Ok(Arc::new(ollama::OllamaModel::new(&config).await?)),
        #[cfg(not(feature = "ollama"))]
        "ollama" => Err(Error::Config(
            "built without the `ollama` feature".to_string(),
        )),
        other => Err(Error::Config(format!("Unknown model: {}", other))),
    }
}
