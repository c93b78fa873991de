use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use hn_core::Result;

/// Persisted set of item ids that have already been ingested. An id in the
/// set is never fetched or embedded again, which is what makes repeated
/// pipeline runs idempotent.
///
/// State is a JSON array of ids on disk. The pipeline is the only writer
/// within a run, so no cross-process coordination is attempted.
#[derive(Clone, Debug)]
pub struct ProcessedIndex {
    path: PathBuf,
    state: Arc<Mutex<HashSet<u64>>>,
}

impl ProcessedIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads previously persisted ids, if any.
    pub async fn load(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let data = fs::read_to_string(&self.path).await?;
        let ids: Vec<u64> = serde_json::from_str(&data)?;
        let mut guard = self.state.lock().await;
        guard.clear();
        guard.extend(ids);
        Ok(())
    }

    pub async fn contains(&self, id: u64) -> bool {
        let guard = self.state.lock().await;
        guard.contains(&id)
    }

    pub async fn len(&self) -> usize {
        let guard = self.state.lock().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Marks a single id as processed and persists the updated set.
    pub async fn mark(&self, id: u64) -> Result<()> {
        self.mark_all(std::iter::once(id)).await
    }

    /// Marks a batch of ids as processed with a single write to disk.
    pub async fn mark_all(&self, ids: impl IntoIterator<Item = u64>) -> Result<()> {
        let mut guard = self.state.lock().await;
        let mut changed = false;
        for id in ids {
            changed |= guard.insert(id);
        }
        if !changed && self.path.exists() {
            return Ok(());
        }
        let mut snapshot: Vec<u64> = guard.iter().copied().collect();
        drop(guard);
        snapshot.sort_unstable();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let serialized = serde_json::to_string(&snapshot)?;
        fs::write(&self.path, serialized).await?;
        Ok(())
    }
}
