use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{storage_error, QueryStorage, RECORD_EXTENSION};
use crate::error::{HistoryError, Result};
use crate::query::validate_query_id;

/// Stores one file per query identifier under an environment-scoped
/// directory: `{root}/{environment}/{query_id}.json`.
pub struct LocalFileSystemStorage {
    root: PathBuf,
}

impl LocalFileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn query_path(&self, query_id: &str, environment: &str) -> PathBuf {
        self.root
            .join(environment)
            .join(format!("{query_id}.{RECORD_EXTENSION}"))
    }
}

#[async_trait]
impl QueryStorage for LocalFileSystemStorage {
    async fn ensure_ready(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|err| {
            HistoryError::StorageInit(format!(
                "cannot create query directory {}: {err}",
                self.root.display()
            ))
        })
    }

    async fn write_query(&self, query_id: &str, environment: &str, content: &str) -> Result<()> {
        validate_query_id(query_id)?;
        let path = self.query_path(query_id, environment);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|err| {
                storage_error(
                    query_id,
                    format!("cannot create {}: {err}", parent.display()),
                )
            })?;
        }
        fs::write(&path, content).await.map_err(|err| {
            storage_error(query_id, format!("write to {} failed: {err}", path.display()))
        })?;
        debug!(query_id, path = %path.display(), "stored query record");
        Ok(())
    }

    async fn read_query(&self, query_id: &str, environment: &str) -> Result<String> {
        validate_query_id(query_id)?;
        let path = self.query_path(query_id, environment);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(HistoryError::NotFound {
                    query_id: query_id.to_string(),
                })
            }
            Err(err) => Err(storage_error(
                query_id,
                format!("read from {} failed: {err}", path.display()),
            )),
        }
    }
}
