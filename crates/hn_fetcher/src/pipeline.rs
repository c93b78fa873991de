//! One ingest run: sweep the category endpoints, drop ids that are already
//! in the processed index, fetch stories and their comment trees, build and
//! embed documents, store them, then mark the ids processed.
//!
//! Individual item failures are logged and skipped. An item is only marked
//! processed once every document derived from it has been stored, so a
//! failed embed or store is retried on the next run.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use hn_core::{Document, DocumentStore, InferenceModel, ItemKind, Result, StoryCategory};

use crate::api::HnClient;
use crate::builder;
use crate::chunk;
use crate::tracker::ProcessedIndex;

/// Queue batch size for comment traversal.
const FETCH_BATCH: usize = 20;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub stories_per_category: usize,
    pub max_comment_depth: usize,
    /// Top-level comments followed per story.
    pub story_comment_limit: usize,
    /// Replies followed per comment.
    pub reply_limit: usize,
    /// Concurrent network and embedding calls.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stories_per_category: 10,
            max_comment_depth: 5,
            story_comment_limit: 5,
            reply_limit: 3,
            concurrency: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub new_stories: usize,
    pub new_comments: usize,
    pub new_users: usize,
    pub documents_indexed: usize,
    pub skipped_items: usize,
    pub already_processed: usize,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.new_stories == 0 && self.new_comments == 0 && self.new_users == 0
    }

    fn merge(&mut self, other: IngestReport) {
        self.new_stories += other.new_stories;
        self.new_comments += other.new_comments;
        self.new_users += other.new_users;
        self.documents_indexed += other.documents_indexed;
        self.skipped_items += other.skipped_items;
        self.already_processed += other.already_processed;
    }
}

pub struct IngestPipeline {
    client: HnClient,
    tracker: ProcessedIndex,
    storage: Arc<dyn DocumentStore>,
    model: Arc<dyn InferenceModel>,
    semaphore: Arc<Semaphore>,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(
        client: HnClient,
        tracker: ProcessedIndex,
        storage: Arc<dyn DocumentStore>,
        model: Arc<dyn InferenceModel>,
        config: PipelineConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            client,
            tracker,
            storage,
            model,
            semaphore,
            config,
        }
    }

    pub async fn run(&self) -> Result<IngestReport> {
        self.tracker.load().await?;
        info!("📇 Processed index holds {} items", self.tracker.len().await);

        let mut report = IngestReport::default();
        let mut seen_items: HashSet<u64> = HashSet::new();
        let mut seen_users: HashSet<String> = HashSet::new();

        for category in StoryCategory::all() {
            let ids = match self
                .client
                .story_ids(category, self.config.stories_per_category)
                .await
            {
                Ok(ids) => ids,
                Err(err) => {
                    warn!("⚠️ Skipping {}: {}", category, err);
                    continue;
                }
            };

            let mut new_ids = Vec::new();
            for id in ids {
                if seen_items.contains(&id) || self.tracker.contains(id).await {
                    report.already_processed += 1;
                } else {
                    new_ids.push(id);
                }
            }
            if new_ids.is_empty() {
                info!("✅ {}: nothing new", category);
                continue;
            }
            info!("🗞️ {}: {} new stories", category, new_ids.len());

            let batch = self
                .ingest_category(category, new_ids, &mut seen_items, &mut seen_users)
                .await?;
            report.merge(batch);
        }

        if report.is_empty() {
            info!("✨ No new data found - everything is up to date");
        } else {
            info!(
                "✨ Ingested {} stories, {} comments, {} users ({} documents)",
                report.new_stories, report.new_comments, report.new_users, report.documents_indexed
            );
        }
        Ok(report)
    }

    async fn ingest_category(
        &self,
        category: StoryCategory,
        story_ids: Vec<u64>,
        seen_items: &mut HashSet<u64>,
        seen_users: &mut HashSet<String>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        // (item id, document) pairs awaiting embedding.
        let mut pending: Vec<(u64, Document)> = Vec::new();
        // Items fetched but yielding no document (tombstones, odd kinds):
        // marked processed so they are never fetched again.
        let mut fetched_no_doc: Vec<u64> = Vec::new();
        let mut user_requests: Vec<(String, String)> = Vec::new();
        let mut comment_queue: Vec<(u64, usize)> = Vec::new();

        for (id, maybe_item) in self.fetch_items(&story_ids).await {
            seen_items.insert(id);
            let Some(item) = maybe_item else {
                report.skipped_items += 1;
                continue;
            };

            match builder::document_for_item(&item, category, 0) {
                Some(doc) if matches!(item.kind, ItemKind::Story | ItemKind::Job) => {
                    report.new_stories += 1;
                    if let Some(author) = item.by.clone() {
                        if seen_users.insert(author.clone()) {
                            user_requests
                                .push((author, format!("author_of_{}_story", category.as_str())));
                        }
                    }
                    for kid in item.kids.iter().take(self.config.story_comment_limit) {
                        comment_queue.push((*kid, 0));
                    }
                    pending.push((item.id, doc));
                }
                _ => {
                    report.skipped_items += 1;
                    fetched_no_doc.push(id);
                }
            }
        }

        // Breadth-first walk of the comment trees, batched like the fetch
        // of the story ids above.
        while !comment_queue.is_empty() {
            let take = comment_queue.len().min(FETCH_BATCH);
            let batch: Vec<(u64, usize)> = comment_queue.drain(..take).collect();

            let mut to_fetch = Vec::new();
            for (id, depth) in batch {
                if seen_items.contains(&id) || self.tracker.contains(id).await {
                    continue;
                }
                to_fetch.push((id, depth));
            }
            if to_fetch.is_empty() {
                continue;
            }

            let ids: Vec<u64> = to_fetch.iter().map(|(id, _)| *id).collect();
            let results = self.fetch_items(&ids).await;
            for ((id, maybe_item), (_, depth)) in results.into_iter().zip(to_fetch) {
                seen_items.insert(id);
                let Some(item) = maybe_item else {
                    report.skipped_items += 1;
                    continue;
                };

                if item.kind != ItemKind::Comment {
                    report.skipped_items += 1;
                    fetched_no_doc.push(id);
                    continue;
                }

                match builder::comment_document(&item, category, depth) {
                    Some(doc) => {
                        report.new_comments += 1;
                        if let Some(author) = item.by.clone() {
                            if seen_users.insert(author.clone()) {
                                user_requests
                                    .push((author, format!("commenter_on_{}", category.as_str())));
                            }
                        }
                        if depth + 1 < self.config.max_comment_depth {
                            for kid in item.kids.iter().take(self.config.reply_limit) {
                                comment_queue.push((*kid, depth + 1));
                            }
                        }
                        pending.push((item.id, doc));
                    }
                    None => {
                        report.skipped_items += 1;
                        fetched_no_doc.push(id);
                    }
                }
            }
        }

        // Author profiles, one fetch per user per run.
        let user_documents = self.fetch_user_documents(user_requests).await;
        report.new_users = user_documents.len();

        // Chunk, embed, store.
        let mut jobs: Vec<(Option<u64>, Document)> = Vec::new();
        for (id, doc) in &pending {
            for piece in chunk::split_document(doc) {
                jobs.push((Some(*id), piece));
            }
        }
        for doc in &user_documents {
            for piece in chunk::split_document(doc) {
                jobs.push((None, piece));
            }
        }

        let mut failed_items: HashSet<u64> = HashSet::new();
        let mut stored_items: HashSet<u64> = HashSet::new();
        for (item_id, stored) in self.embed_and_store(jobs).await {
            if stored {
                report.documents_indexed += 1;
                if let Some(id) = item_id {
                    stored_items.insert(id);
                }
            } else if let Some(id) = item_id {
                failed_items.insert(id);
            }
        }

        let to_mark: Vec<u64> = stored_items
            .difference(&failed_items)
            .copied()
            .chain(fetched_no_doc)
            .collect();
        self.tracker.mark_all(to_mark).await?;

        Ok(report)
    }

    async fn fetch_items(&self, ids: &[u64]) -> Vec<(u64, Option<hn_core::Item>)> {
        let futures: Vec<_> = ids
            .iter()
            .copied()
            .map(|id| {
                let client = self.client.clone();
                let semaphore = self.semaphore.clone();
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return (id, None),
                    };
                    match client.item(id).await {
                        Ok(item) => (id, item),
                        Err(err) => {
                            warn!("⚠️ Skipping item {}: {}", id, err);
                            (id, None)
                        }
                    }
                }
            })
            .collect();
        join_all(futures).await
    }

    async fn fetch_user_documents(&self, requests: Vec<(String, String)>) -> Vec<Document> {
        let futures: Vec<_> = requests
            .into_iter()
            .map(|(name, context)| {
                let client = self.client.clone();
                let semaphore = self.semaphore.clone();
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return None,
                    };
                    match client.user(&name).await {
                        Ok(Some(profile)) => builder::user_document(&profile, &context),
                        Ok(None) => {
                            warn!("⚠️ Unknown user {}", name);
                            None
                        }
                        Err(err) => {
                            warn!("⚠️ Skipping user {}: {}", name, err);
                            None
                        }
                    }
                }
            })
            .collect();
        join_all(futures).await.into_iter().flatten().collect()
    }

    /// Embed and store every chunk; returns one `(source item id, stored)`
    /// entry per chunk.
    async fn embed_and_store(&self, jobs: Vec<(Option<u64>, Document)>) -> Vec<(Option<u64>, bool)> {
        let futures: Vec<_> = jobs
            .into_iter()
            .map(|(item_id, doc)| {
                let model = self.model.clone();
                let storage = self.storage.clone();
                let semaphore = self.semaphore.clone();
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return (item_id, false),
                    };
                    let embedding = match model.generate_embeddings(&doc.text).await {
                        Ok(embedding) => embedding,
                        Err(err) => {
                            warn!("⚠️ Embedding failed for {}: {}", doc.id, err);
                            return (item_id, false);
                        }
                    };
                    match storage.store_document(&doc, &embedding).await {
                        Ok(()) => (item_id, true),
                        Err(err) => {
                            warn!("⚠️ Storing {} failed: {}", doc.id, err);
                            (item_id, false)
                        }
                    }
                }
            })
            .collect();
        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct RecordingStorage {
        documents: Mutex<Vec<Document>>,
    }

    impl RecordingStorage {
        fn new() -> Self {
            Self {
                documents: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStorage {
        async fn store_document(&self, document: &Document, _embedding: &[f32]) -> Result<()> {
            self.documents.lock().unwrap().push(document.clone());
            Ok(())
        }

        async fn find_similar(&self, _embedding: &[f32], _limit: usize) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn get_by_category(&self, _category: &str) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }

        async fn count(&self) -> Result<usize> {
            Ok(self.documents.lock().unwrap().len())
        }

        async fn delete_document(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct FlatModel;

    #[async_trait]
    impl InferenceModel for FlatModel {
        fn name(&self) -> &str {
            "flat"
        }

        async fn answer_question(&self, _question: &str, _context: &str) -> Result<String> {
            Ok("answer".to_string())
        }

        async fn generate_embeddings(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1; 8])
        }
    }

    /// Mounts empty id lists for every category the test does not override.
    async fn mount_empty_categories(server: &MockServer, except: &[StoryCategory]) {
        for category in StoryCategory::all() {
            if except.contains(&category) {
                continue;
            }
            server
                .mock_async(|when, then| {
                    when.method(GET).path(format!("/{}.json", category.as_str()));
                    then.status(200).json_body(json!([]));
                })
                .await;
        }
    }

    fn pipeline_for(server: &MockServer, tracker: ProcessedIndex) -> IngestPipeline {
        let client = HnClient::new()
            .unwrap()
            .with_base_url(server.base_url())
            .with_max_retries(1);
        IngestPipeline::new(
            client,
            tracker,
            Arc::new(RecordingStorage::new()),
            Arc::new(FlatModel),
            PipelineConfig::default(),
        )
    }

    #[tokio::test]
    async fn ingests_story_thread_and_authors_once() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/topstories.json");
                then.status(200).json_body(json!([1]));
            })
            .await;
        mount_empty_categories(&server, &[StoryCategory::Top]).await;

        let story = server
            .mock_async(|when, then| {
                when.method(GET).path("/item/1.json");
                then.status(200).json_body(json!({
                    "id": 1, "type": "story", "by": "alice", "time": 1700000000,
                    "title": "A story", "score": 10, "kids": [2]
                }));
            })
            .await;
        let comment = server
            .mock_async(|when, then| {
                when.method(GET).path("/item/2.json");
                then.status(200).json_body(json!({
                    "id": 2, "type": "comment", "by": "bob", "time": 1700000100,
                    "parent": 1, "text": "<p>interesting</p>"
                }));
            })
            .await;
        for user in ["alice", "bob"] {
            server
                .mock_async(move |when, then| {
                    when.method(GET).path(format!("/user/{}.json", user));
                    then.status(200).json_body(json!({
                        "id": user, "created": 1600000000, "karma": 42
                    }));
                })
                .await;
        }

        let dir = tempdir().unwrap();
        let tracker_path = dir.path().join("processed_ids.json");

        let pipeline = pipeline_for(&server, ProcessedIndex::new(&tracker_path));
        let report = pipeline.run().await.unwrap();
        assert_eq!(report.new_stories, 1);
        assert_eq!(report.new_comments, 1);
        assert_eq!(report.new_users, 2);
        assert_eq!(report.documents_indexed, 4);
        assert_eq!(report.skipped_items, 0);

        // A second run over the unchanged remote set ingests nothing and
        // never re-requests item details for processed ids.
        let second = pipeline_for(&server, ProcessedIndex::new(&tracker_path));
        let report = second.run().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(report.already_processed, 1);
        assert_eq!(story.hits_async().await, 1);
        assert_eq!(comment.hits_async().await, 1);
    }

    #[tokio::test]
    async fn missing_items_are_skipped_and_retried_next_run() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/topstories.json");
                then.status(200).json_body(json!([9]));
            })
            .await;
        mount_empty_categories(&server, &[StoryCategory::Top]).await;

        let purged = server
            .mock_async(|when, then| {
                when.method(GET).path("/item/9.json");
                then.status(200).json_body(json!(null));
            })
            .await;

        let dir = tempdir().unwrap();
        let tracker_path = dir.path().join("processed_ids.json");

        let pipeline = pipeline_for(&server, ProcessedIndex::new(&tracker_path));
        let report = pipeline.run().await.unwrap();
        assert_eq!(report.skipped_items, 1);
        assert_eq!(report.documents_indexed, 0);

        // The id was never marked processed, so the next run tries again.
        let second = pipeline_for(&server, ProcessedIndex::new(&tracker_path));
        second.run().await.unwrap();
        assert_eq!(purged.hits_async().await, 2);
    }

    #[tokio::test]
    async fn failing_category_endpoint_does_not_abort_the_run() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/topstories.json");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/beststories.json");
                then.status(200).json_body(json!([3]));
            })
            .await;
        for category in [
            StoryCategory::New,
            StoryCategory::Ask,
            StoryCategory::Show,
            StoryCategory::Job,
        ] {
            server
                .mock_async(move |when, then| {
                    when.method(GET).path(format!("/{}.json", category.as_str()));
                    then.status(200).json_body(json!([]));
                })
                .await;
        }
        server
            .mock_async(|when, then| {
                when.method(GET).path("/item/3.json");
                then.status(200).json_body(json!({
                    "id": 3, "type": "story", "by": "carol", "time": 1700000000,
                    "title": "Survives", "score": 1
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/user/carol.json");
                then.status(200).json_body(json!({"id": "carol", "karma": 1}));
            })
            .await;

        let dir = tempdir().unwrap();
        let pipeline = pipeline_for(
            &server,
            ProcessedIndex::new(dir.path().join("processed_ids.json")),
        );
        let report = pipeline.run().await.unwrap();
        assert_eq!(report.new_stories, 1);
    }

    #[tokio::test]
    async fn tombstoned_items_are_marked_and_not_refetched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/topstories.json");
                then.status(200).json_body(json!([7]));
            })
            .await;
        mount_empty_categories(&server, &[StoryCategory::Top]).await;
        let dead = server
            .mock_async(|when, then| {
                when.method(GET).path("/item/7.json");
                then.status(200)
                    .json_body(json!({"id": 7, "type": "story", "dead": true}));
            })
            .await;

        let dir = tempdir().unwrap();
        let tracker_path = dir.path().join("processed_ids.json");

        let pipeline = pipeline_for(&server, ProcessedIndex::new(&tracker_path));
        pipeline.run().await.unwrap();

        let second = pipeline_for(&server, ProcessedIndex::new(&tracker_path));
        let report = second.run().await.unwrap();
        assert_eq!(report.already_processed, 1);
        assert_eq!(dead.hits_async().await, 1);
    }
}
