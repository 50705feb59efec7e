use std::sync::Arc;

use async_trait::async_trait;

use super::QueryStorage;
use crate::error::Result;
use crate::resilience::{execute_with_retry, RetryPolicy};

/// Wraps any backend with the retry executor, so callers observe the plain
/// [`QueryStorage`] contract plus resilience to transient backend failures.
/// Not-found surfaces from the first attempt that encounters it.
pub struct RetryingStorage {
    inner: Arc<dyn QueryStorage>,
    policy: RetryPolicy,
}

impl RetryingStorage {
    pub fn new(inner: Arc<dyn QueryStorage>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl QueryStorage for RetryingStorage {
    async fn ensure_ready(&self) -> Result<()> {
        // Initialization failures are fatal at startup, never retried.
        self.inner.ensure_ready().await
    }

    async fn write_query(&self, query_id: &str, environment: &str, content: &str) -> Result<()> {
        execute_with_retry(self.policy, || {
            self.inner.write_query(query_id, environment, content)
        })
        .await
    }

    async fn read_query(&self, query_id: &str, environment: &str) -> Result<String> {
        execute_with_retry(self.policy, || self.inner.read_query(query_id, environment)).await
    }
}
