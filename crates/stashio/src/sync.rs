//! # Background Sync
//!
//! Deferred-work hook: tags registered while offline are dispatched when
//! connectivity resumes. A sync event may fire more than once for a single
//! registration, so the task behind a tag must be idempotent.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::WorkerError;

/// A deferred reconciliation task run when a sync tag fires.
///
/// Implementations must be idempotent and safe to invoke multiple times
/// for the same queued submission.
#[async_trait]
pub trait SyncTask: Send + Sync {
    async fn run(&self, tag: &str) -> Result<(), WorkerError>;
}

/// Placeholder task: logs the dispatch and does nothing.
#[derive(Debug, Default)]
pub struct NoopSync;

#[async_trait]
impl SyncTask for NoopSync {
    async fn run(&self, tag: &str) -> Result<(), WorkerError> {
        debug!(tag = %tag, "Background sync placeholder ran");
        Ok(())
    }
}

/// Registered sync tags and the task dispatched when one fires.
pub struct SyncRegistry {
    tags: RwLock<HashSet<String>>,
    task: Arc<dyn SyncTask>,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::with_task(Arc::new(NoopSync))
    }

    /// Create a registry dispatching to a custom task.
    pub fn with_task(task: Arc<dyn SyncTask>) -> Self {
        Self {
            tags: RwLock::new(HashSet::new()),
            task,
        }
    }

    /// Register a named sync tag. Re-registering is a no-op.
    pub fn register(&self, tag: impl Into<String>) {
        let tag = tag.into();
        if self.tags.write().insert(tag.clone()) {
            debug!(tag = %tag, "Registered background sync tag");
        }
    }

    /// Check whether a tag is registered.
    pub fn is_registered(&self, tag: &str) -> bool {
        self.tags.read().contains(tag)
    }

    /// Dispatch a sync event for `tag`.
    ///
    /// Returns `false` without running the task when the tag was never
    /// registered. Safe to call repeatedly for the same registration.
    pub async fn dispatch(&self, tag: &str) -> Result<bool, WorkerError> {
        if !self.is_registered(tag) {
            debug!(tag = %tag, "Ignoring sync event for unregistered tag");
            return Ok(false);
        }

        info!(tag = %tag, "Background sync triggered");
        self.task.run(tag).await?;
        Ok(true)
    }
}

impl Default for SyncRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl SyncTask for CountingTask {
        async fn run(&self, _tag: &str) -> Result<(), WorkerError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_registered_tag() {
        let task = Arc::new(CountingTask::default());
        let registry = SyncRegistry::with_task(task.clone());

        registry.register("background-sync");
        assert!(registry.is_registered("background-sync"));

        assert!(registry.dispatch("background-sync").await.unwrap());
        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeat_dispatch_is_safe() {
        let task = Arc::new(CountingTask::default());
        let registry = SyncRegistry::with_task(task.clone());
        registry.register("background-sync");

        // One registration may fire any number of times
        assert!(registry.dispatch("background-sync").await.unwrap());
        assert!(registry.dispatch("background-sync").await.unwrap());
        assert_eq!(task.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unregistered_tag_is_ignored() {
        let task = Arc::new(CountingTask::default());
        let registry = SyncRegistry::with_task(task.clone());

        assert!(!registry.dispatch("unknown-tag").await.unwrap());
        assert_eq!(task.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_noop_task_dispatches() {
        let registry = SyncRegistry::new();
        registry.register("background-sync");
        assert!(registry.dispatch("background-sync").await.unwrap());
    }
}
