use async_trait::async_trait;
use chromadb::v1::{
    client::ChromaClient,
    collection::{CollectionEntries, QueryOptions},
};
use std::env;
use std::ops::Deref;
use std::sync::Arc;

use crate::BackendConfig;
use hn_core::{Document, DocumentStore, Error, Result, DEFAULT_VECTOR_SIZE};

/// Upper bound on entries touched by full-collection scans (count, category
/// filters). A local index stays far below this.
const MAX_SCAN: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub config: BackendConfig,
}

impl ChromaConfig {
    pub fn new() -> Self {
        let host = env::var("CHROMA_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("CHROMA_PORT").unwrap_or_else(|_| "8000".to_string());
        let url = format!("http://{}:{}", host, port);
        Self {
            config: BackendConfig::new(url, "hackernews".to_string(), DEFAULT_VECTOR_SIZE),
        }
    }
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for ChromaConfig {
    type Target = BackendConfig;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

/// Vector store backed by a local ChromaDB server.
pub struct ChromaStorage {
    client: Arc<ChromaClient>,
    config: ChromaConfig,
}

impl ChromaStorage {
    pub fn new(config: ChromaConfig) -> Result<Self> {
        let client = Arc::new(ChromaClient::new(Default::default()));
        Ok(Self { client, config })
    }

    fn entry_metadata(document: &Document) -> Result<serde_json::Map<String, serde_json::Value>> {
        let doc_str = serde_json::to_string(document)?;
        Ok(serde_json::Map::from_iter(vec![
            (
                "source_id".to_string(),
                serde_json::Value::String(document.source_id.clone()),
            ),
            (
                "category".to_string(),
                serde_json::Value::String(document.category.clone()),
            ),
            (
                "posted_at".to_string(),
                serde_json::Value::String(document.posted_at.to_rfc3339()),
            ),
            ("doc".to_string(), serde_json::Value::String(doc_str)),
        ]))
    }

    fn documents_from_results(results: chromadb::v1::collection::QueryResult) -> Vec<Document> {
        let mut documents = Vec::new();
        if let Some(metadatas) = results.metadatas {
            for metadata_vec in metadatas {
                if let Some(metadata_vec) = metadata_vec {
                    for metadata in metadata_vec {
                        if let Some(metadata) = metadata {
                            if let Some(doc_str) = metadata.get("doc").and_then(|v| v.as_str()) {
                                if let Ok(document) = serde_json::from_str::<Document>(doc_str) {
                                    documents.push(document);
                                }
                            }
                        }
                    }
                }
            }
        }
        documents
    }

    fn scan(&self, where_metadata: Option<serde_json::Value>, limit: usize) -> Result<Vec<Document>> {
        let collection = self
            .client
            .get_or_create_collection(&self.config.collection, None)
            .map_err(Error::External)?;

        let query_options = QueryOptions {
            // Zero vector: retrieval order is irrelevant for filtered scans.
            query_embeddings: Some(vec![vec![0.0; self.config.vector_size as usize]]),
            query_texts: None,
            n_results: Some(limit),
            where_document: None,
            where_metadata,
            include: None,
        };

        let results = collection
            .query(query_options, None)
            .map_err(Error::External)?;
        Ok(Self::documents_from_results(results))
    }
}

#[async_trait]
impl DocumentStore for ChromaStorage {
    async fn store_document(&self, document: &Document, embedding: &[f32]) -> Result<()> {
        let collection = self
            .client
            .get_or_create_collection(&self.config.collection, None)
            .map_err(Error::External)?;

        let metadata = Self::entry_metadata(document)?;
        let entries = CollectionEntries {
            ids: vec![&document.id],
            embeddings: Some(vec![embedding.to_vec()]),
            metadatas: Some(vec![metadata]),
            documents: None,
        };

        collection.add(entries, None).map_err(Error::External)?;
        Ok(())
    }

    async fn find_similar(&self, embedding: &[f32], limit: usize) -> Result<Vec<Document>> {
        let collection = self
            .client
            .get_or_create_collection(&self.config.collection, None)
            .map_err(Error::External)?;

        let query_options = QueryOptions {
            query_embeddings: Some(vec![embedding.to_vec()]),
            query_texts: None,
            n_results: Some(limit),
            where_document: None,
            where_metadata: None,
            include: None,
        };

        let results = collection
            .query(query_options, None)
            .map_err(Error::External)?;
        Ok(Self::documents_from_results(results))
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Document>> {
        let where_metadata = serde_json::Value::Object(serde_json::Map::from_iter(vec![(
            "category".to_string(),
            serde_json::Value::String(category.to_string()),
        )]));
        self.scan(Some(where_metadata), MAX_SCAN)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.scan(None, MAX_SCAN)?.len())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let collection = self
            .client
            .get_or_create_collection(&self.config.collection, None)
            .map_err(Error::External)?;

        collection
            .delete(Some(vec![id]), None, None)
            .map_err(|e| Error::Storage(format!("Failed to delete document: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hn_core::DocumentKind;

    // Requires a ChromaDB server on localhost:8000.
    #[tokio::test]
    #[ignore]
    async fn stores_and_retrieves_against_a_live_server() {
        let storage = ChromaStorage::new(ChromaConfig::new()).unwrap();
        let document = Document {
            id: "chroma-test".to_string(),
            source_id: "chroma-test".to_string(),
            kind: DocumentKind::Story,
            author: "tester".to_string(),
            posted_at: Utc::now(),
            category: "topstories".to_string(),
            text: "Test content".to_string(),
        };

        let embedding = vec![0.0; DEFAULT_VECTOR_SIZE as usize];
        storage.store_document(&document, &embedding).await.unwrap();
        let similar = storage.find_similar(&embedding, 1).await.unwrap();
        assert!(!similar.is_empty());
        storage.delete_document("chroma-test").await.unwrap();
    }
}
