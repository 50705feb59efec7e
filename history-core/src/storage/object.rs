use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::debug;

use super::{storage_error, QueryStorage, RECORD_EXTENSION};
use crate::config::StorageConfig;
use crate::error::{HistoryError, Result};
use crate::query::validate_query_id;

/// Remote object-store backend speaking plain HTTP to a gateway: records
/// live at `{endpoint}/{bucket}/{environment}/{query_id}.json`. Only the
/// minimal put/get/probe operations are implemented.
pub struct RemoteObjectStorage {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    auth_token: Option<String>,
}

impl RemoteObjectStorage {
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|endpoint| endpoint.trim_end_matches('/'))
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| {
                HistoryError::InvalidConfig("object storage requires storage.endpoint".to_string())
            })?
            .to_string();
        let bucket = config
            .bucket
            .as_deref()
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| {
                HistoryError::InvalidConfig("object storage requires storage.bucket".to_string())
            })?
            .to_string();
        let client = reqwest::Client::builder().build().map_err(|err| {
            HistoryError::InvalidConfig(format!("cannot build object store client: {err}"))
        })?;
        Ok(Self {
            client,
            endpoint,
            bucket,
            auth_token: config.auth_token.clone(),
        })
    }

    fn object_url(&self, query_id: &str, environment: &str) -> String {
        format!(
            "{}/{}/{}/{}.{}",
            self.endpoint, self.bucket, environment, query_id, RECORD_EXTENSION
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl QueryStorage for RemoteObjectStorage {
    async fn ensure_ready(&self) -> Result<()> {
        let url = format!("{}/{}", self.endpoint, self.bucket);
        let response = self
            .authorized(self.client.head(&url))
            .send()
            .await
            .map_err(|err| {
                HistoryError::StorageInit(format!("object store unreachable at {url}: {err}"))
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(HistoryError::StorageInit(format!(
                "bucket {} is not accessible: status {}",
                self.bucket,
                response.status()
            )))
        }
    }

    async fn write_query(&self, query_id: &str, environment: &str, content: &str) -> Result<()> {
        validate_query_id(query_id)?;
        let url = self.object_url(query_id, environment);
        let response = self
            .authorized(self.client.put(&url))
            .header(CONTENT_TYPE, "application/json")
            .body(content.to_string())
            .send()
            .await
            .map_err(|err| storage_error(query_id, format!("put {url} failed: {err}")))?;
        if !response.status().is_success() {
            return Err(storage_error(
                query_id,
                format!("put {url} answered with status {}", response.status()),
            ));
        }
        debug!(query_id, url = %url, "stored query record");
        Ok(())
    }

    async fn read_query(&self, query_id: &str, environment: &str) -> Result<String> {
        validate_query_id(query_id)?;
        let url = self.object_url(query_id, environment);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|err| storage_error(query_id, format!("get {url} failed: {err}")))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HistoryError::NotFound {
                query_id: query_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(storage_error(
                query_id,
                format!("get {url} answered with status {status}"),
            ));
        }
        response
            .text()
            .await
            .map_err(|err| storage_error(query_id, format!("failed to read object body: {err}")))
    }
}
