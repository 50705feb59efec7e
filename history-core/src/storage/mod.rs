pub mod filesystem;
pub mod object;
pub mod retrying;

use std::sync::Arc;

use async_trait::async_trait;

pub use filesystem::LocalFileSystemStorage;
pub use object::RemoteObjectStorage;
pub use retrying::RetryingStorage;

use crate::config::{StorageBackendKind, StorageConfig};
use crate::error::{HistoryError, Result};

/// Extension every persisted record carries, regardless of backend.
pub const RECORD_EXTENSION: &str = "json";

/// Durable key-value persistence of one JSON record per query identifier,
/// scoped by an environment namespace. Behaves identically across variants,
/// including error classification: a missing record is a not-found error,
/// never a generic storage failure.
#[async_trait]
pub trait QueryStorage: Send + Sync {
    /// Idempotently provisions the storage location. Failures are fatal at
    /// startup and are not retried.
    async fn ensure_ready(&self) -> Result<()>;

    /// Durably stores `content` under `(environment, query_id)`, overwriting
    /// any previous value. Last write wins.
    async fn write_query(&self, query_id: &str, environment: &str, content: &str) -> Result<()>;

    /// Returns the previously stored content for `(environment, query_id)`.
    async fn read_query(&self, query_id: &str, environment: &str) -> Result<String>;
}

/// Selects the backend once at startup; nothing else inspects the variant.
pub fn backend_from_config(config: &StorageConfig) -> Result<Arc<dyn QueryStorage>> {
    match config.backend {
        StorageBackendKind::Filesystem => {
            Ok(Arc::new(LocalFileSystemStorage::new(config.root.clone())))
        }
        StorageBackendKind::Object => Ok(Arc::new(RemoteObjectStorage::from_config(config)?)),
    }
}

pub(crate) fn storage_error(query_id: &str, message: String) -> HistoryError {
    HistoryError::Storage {
        query_id: query_id.to_string(),
        message,
    }
}
