use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use hn_core::{cosine_similarity, Document, DocumentStore, Result};

/// In-memory vector store. The default backend, and the one the tests run
/// against; nothing survives the process.
pub struct MemoryStorage {
    entries: Arc<RwLock<Vec<(Document, Vec<f32>)>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStorage {
    async fn store_document(&self, document: &Document, embedding: &[f32]) -> Result<()> {
        let mut entries = self.entries.write().await;
        if let Some((existing, existing_embedding)) =
            entries.iter_mut().find(|(d, _)| d.id == document.id)
        {
            *existing = document.clone();
            *existing_embedding = embedding.to_vec();
        } else {
            entries.push((document.clone(), embedding.to_vec()));
        }
        Ok(())
    }

    async fn find_similar(&self, embedding: &[f32], limit: usize) -> Result<Vec<Document>> {
        let entries = self.entries.read().await;
        let mut scored: Vec<(f32, &Document)> = entries
            .iter()
            .map(|(doc, emb)| (cosine_similarity(embedding, emb), doc))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Document>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(doc, _)| doc.category == category)
            .map(|(doc, _)| doc.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|(doc, _)| doc.id != id);
        Ok(())
    }
}
