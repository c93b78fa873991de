use crate::types::Document;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a document together with its embedding. Storing the same id
    /// twice replaces the earlier record.
    async fn store_document(&self, document: &Document, embedding: &[f32]) -> Result<()>;

    /// Return up to `limit` documents ranked by similarity to `embedding`.
    async fn find_similar(&self, embedding: &[f32], limit: usize) -> Result<Vec<Document>>;

    /// Return all documents tagged with the given category.
    async fn get_by_category(&self, category: &str) -> Result<Vec<Document>>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize>;

    /// Remove a document by id. Removing an unknown id is not an error.
    async fn delete_document(&self, id: &str) -> Result<()>;
}
