use std::sync::Arc;

use hn_core::DocumentStore;
use hn_inference::RagEngine;

pub struct AppState {
    pub engine: RagEngine,
    pub storage: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(engine: RagEngine, storage: Arc<dyn DocumentStore>) -> Self {
        Self { engine, storage }
    }
}
