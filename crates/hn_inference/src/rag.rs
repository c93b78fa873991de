//! Retrieval-augmented answering: embed the question, pull the closest
//! documents out of the store, and hand the stuffed context to the model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use hn_core::{Document, DocumentKind, DocumentStore, InferenceModel, Result};

use crate::prompt::NO_DATA_ANSWER;

/// Retrieval depth. Six results keeps answers grounded across several
/// stories without drowning a small local model.
const DEFAULT_TOP_K: usize = 6;

/// Separator between stuffed context documents.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub source_id: String,
    pub kind: DocumentKind,
    pub category: String,
}

impl From<&Document> for SourceRef {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            source_id: doc.source_id.clone(),
            kind: doc.kind,
            category: doc.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

impl RagAnswer {
    pub fn no_data() -> Self {
        Self {
            answer: NO_DATA_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.sources.is_empty()
    }
}

pub struct RagEngine {
    storage: Arc<dyn DocumentStore>,
    model: Arc<dyn InferenceModel>,
    top_k: usize,
}

impl RagEngine {
    pub fn new(storage: Arc<dyn DocumentStore>, model: Arc<dyn InferenceModel>) -> Self {
        Self {
            storage,
            model,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Answer a question from indexed content. An empty index yields the
    /// explicit no-data answer rather than an error; model failures are
    /// errors for the caller to surface.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let embedding = self.model.generate_embeddings(question).await?;
        let documents = self.storage.find_similar(&embedding, self.top_k).await?;
        if documents.is_empty() {
            info!("🔍 No indexed content matched the question");
            return Ok(RagAnswer::no_data());
        }

        info!("🔍 Retrieved {} documents for the question", documents.len());
        let context = documents
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let answer = self.model.answer_question(question, &context).await?;

        let mut sources: Vec<SourceRef> = Vec::new();
        for doc in &documents {
            let source = SourceRef::from(doc);
            if !sources.iter().any(|s| s.source_id == source.source_id) {
                sources.push(source);
            }
        }

        Ok(RagAnswer { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DummyModel;
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::RwLock;

    struct FakeStorage {
        entries: RwLock<Vec<Document>>,
    }

    impl FakeStorage {
        fn empty() -> Self {
            Self {
                entries: RwLock::new(Vec::new()),
            }
        }

        fn with_documents(docs: Vec<Document>) -> Self {
            Self {
                entries: RwLock::new(docs),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStorage {
        async fn store_document(&self, document: &Document, _embedding: &[f32]) -> Result<()> {
            self.entries.write().await.push(document.clone());
            Ok(())
        }

        async fn find_similar(&self, _embedding: &[f32], limit: usize) -> Result<Vec<Document>> {
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .take(limit)
                .cloned()
                .collect())
        }

        async fn get_by_category(&self, _category: &str) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<usize> {
            Ok(self.entries.read().await.len())
        }

        async fn delete_document(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn doc(id: &str, source_id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            source_id: source_id.to_string(),
            kind: DocumentKind::Story,
            author: "tester".to_string(),
            posted_at: Utc::now(),
            category: "topstories".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_index_answers_no_data_without_error() {
        let engine = RagEngine::new(Arc::new(FakeStorage::empty()), Arc::new(DummyModel::new()));
        let answer = engine.answer("anything new?").await.unwrap();
        assert!(answer.is_no_data());
        assert_eq!(answer.answer, NO_DATA_ANSWER);
    }

    #[tokio::test]
    async fn answers_with_deduplicated_sources() {
        let storage = FakeStorage::with_documents(vec![
            doc("1", "1", "Rust 2.0 announced on HackerNews."),
            doc("1#1", "1", "Continuation chunk of the same story."),
            doc("2", "2", "Another story entirely."),
        ]);
        let engine = RagEngine::new(Arc::new(storage), Arc::new(DummyModel::new()));

        let answer = engine.answer("what was announced?").await.unwrap();
        assert!(!answer.is_no_data());
        assert!(answer.answer.contains("Rust 2.0"));
        // Chunks of the same item collapse to one source reference.
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].source_id, "1");
    }

    #[tokio::test]
    async fn respects_top_k() {
        let docs: Vec<Document> = (0..10)
            .map(|i| doc(&i.to_string(), &i.to_string(), "text"))
            .collect();
        let engine = RagEngine::new(
            Arc::new(FakeStorage::with_documents(docs)),
            Arc::new(DummyModel::new()),
        )
        .with_top_k(3);

        let answer = engine.answer("q").await.unwrap();
        assert_eq!(answer.sources.len(), 3);
    }
}
