use tracing::debug;

use crate::error::Result;
use crate::fetch::QueryFetcher;
use crate::query::QueryReference;
use crate::storage::{QueryStorage, RetryingStorage};

/// Composes the fetcher and the retrying storage decorator: create fetches
/// then stores, read goes straight to storage.
pub struct QueryService {
    fetcher: QueryFetcher,
    storage: RetryingStorage,
}

impl QueryService {
    pub fn new(fetcher: QueryFetcher, storage: RetryingStorage) -> Self {
        Self { fetcher, storage }
    }

    /// Fetches the full record for `reference` from its coordinator and
    /// persists it. A fetch failure short-circuits before any write, so no
    /// partial state is left behind.
    pub async fn create_query(&self, reference: &QueryReference, environment: &str) -> Result<()> {
        let record = self.fetcher.fetch_query(reference).await?;
        debug!(
            query_id = reference.query_id(),
            bytes = record.len(),
            "fetched query record"
        );
        self.storage
            .write_query(reference.query_id(), environment, &record)
            .await
    }

    /// Returns the stored record verbatim; no upstream fetch is involved.
    pub async fn get_query(&self, query_id: &str, environment: &str) -> Result<String> {
        self.storage.read_query(query_id, environment).await
    }
}
