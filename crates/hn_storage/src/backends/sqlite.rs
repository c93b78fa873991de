use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hn_core::{cosine_similarity, Document, DocumentStore, Error, Result};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL,
        category TEXT NOT NULL,
        posted_at TEXT NOT NULL,
        doc TEXT NOT NULL,
        embedding TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

/// File-backed store. Embeddings are kept as JSON and similarity is ranked
/// in process, which is plenty for a single local index.
pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<(Document, Vec<f32>)> {
        let doc: String = row.get("doc");
        let embedding: String = row.get("embedding");
        Ok((
            serde_json::from_str(&doc)?,
            serde_json::from_str(&embedding)?,
        ))
    }
}

#[async_trait]
impl DocumentStore for SqliteStorage {
    async fn store_document(&self, document: &Document, embedding: &[f32]) -> Result<()> {
        let doc = serde_json::to_string(document)?;
        let embedding = serde_json::to_string(embedding)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO documents
            (id, source_id, category, posted_at, doc, embedding)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.source_id)
        .bind(&document.category)
        .bind(document.posted_at.to_rfc3339())
        .bind(doc)
        .bind(embedding)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to store document: {}", e)))?;

        Ok(())
    }

    async fn find_similar(&self, embedding: &[f32], limit: usize) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT doc, embedding FROM documents")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to load documents: {}", e)))?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let (doc, stored) = Self::decode_row(row)?;
            scored.push((cosine_similarity(embedding, &stored), doc));
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, doc)| doc)
            .collect())
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT doc, embedding FROM documents WHERE category = ? ORDER BY posted_at DESC",
        )
        .bind(category)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to load documents: {}", e)))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            documents.push(Self::decode_row(row)?.0);
        }
        Ok(documents)
    }

    async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to count documents: {}", e)))?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete document: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hn_core::DocumentKind;
    use tempfile::tempdir;

    fn doc(id: &str, category: &str) -> Document {
        Document {
            id: id.to_string(),
            source_id: id.to_string(),
            kind: DocumentKind::Story,
            author: "tester".to_string(),
            posted_at: Utc::now(),
            category: category.to_string(),
            text: "Test content".to_string(),
        }
    }

    #[tokio::test]
    async fn round_trips_documents_through_the_database() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new_with_path(&db_path).await.unwrap();
        storage
            .store_document(&doc("1", "topstories"), &[1.0, 0.0])
            .await
            .unwrap();
        storage
            .store_document(&doc("2", "askstories"), &[0.0, 1.0])
            .await
            .unwrap();

        assert_eq!(storage.count().await.unwrap(), 2);

        let similar = storage.find_similar(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(similar[0].id, "1");

        let ask = storage.get_by_category("askstories").await.unwrap();
        assert_eq!(ask.len(), 1);
        assert_eq!(ask[0].kind, DocumentKind::Story);

        storage.delete_document("1").await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replaces_on_duplicate_id() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new_with_path(&db_path).await.unwrap();
        storage
            .store_document(&doc("1", "topstories"), &[1.0])
            .await
            .unwrap();
        storage
            .store_document(&doc("1", "topstories"), &[0.5])
            .await
            .unwrap();
        assert_eq!(storage.count().await.unwrap(), 1);
    }
}
