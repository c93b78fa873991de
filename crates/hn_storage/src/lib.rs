use std::path::Path;
use std::sync::Arc;

use hn_core::{DocumentStore, Error, Result, DEFAULT_VECTOR_SIZE};

pub mod backends;

pub use backends::*;

/// Connection settings shared by the vector store backends.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub collection: String,
    pub vector_size: u64,
}

impl BackendConfig {
    pub fn new(url: String, collection: String, vector_size: u64) -> Self {
        Self {
            url,
            collection,
            vector_size,
        }
    }

    pub fn with_url(&mut self, url: &str) -> &mut Self {
        self.url = url.to_string();
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(
            "memory://".to_string(),
            "hackernews".to_string(),
            DEFAULT_VECTOR_SIZE,
        )
    }
}

/// Instantiate a storage backend by name. `backend_url` overrides the
/// backend's default server URL; `data_dir` is where file-backed stores
/// keep their database.
pub async fn create_storage(
    kind: &str,
    backend_url: Option<&str>,
    data_dir: &Path,
) -> Result<Arc<dyn DocumentStore>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = data_dir.join("documents.db");
            Ok(Arc::new(SqliteStorage::new_with_path(&path).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Config(
            "built without the `sqlite` feature".to_string(),
        )),
        #[cfg(feature = "chroma")]
        "chroma" => {
            let mut config = ChromaConfig::new();
            if let Some(url) = backend_url {
                config.config.with_url(url);
            }
            Ok(Arc::new(ChromaStorage::new(config)?))
        }
        #[cfg(not(feature = "chroma"))]
        "chroma" => Err(Error::Config(
            "built without the `chroma` feature".to_string(),
        )),
        other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::BackendConfig;
    pub use hn_core::DocumentStore;
}
