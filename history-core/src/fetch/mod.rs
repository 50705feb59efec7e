use std::sync::Arc;

use reqwest::header::COOKIE;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::auth::SessionManager;
use crate::config::CoordinatorConfig;
use crate::error::{HistoryError, Result};
use crate::query::QueryReference;

enum FetchAttempt {
    Body(String),
    SessionRejected,
}

/// Reads the full query record back from the coordinator that reported it,
/// authenticating through the [`SessionManager`].
pub struct QueryFetcher {
    client: reqwest::Client,
    sessions: Arc<SessionManager>,
}

impl QueryFetcher {
    pub fn new(config: &CoordinatorConfig, sessions: Arc<SessionManager>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| {
                HistoryError::InvalidConfig(format!("cannot build fetch client: {err}"))
            })?;
        Ok(Self { client, sessions })
    }

    /// Fetches the query record, refreshing the session and retrying the GET
    /// exactly once if the coordinator rejects the cached cookie. Only auth
    /// rejections warrant that refresh; everything else surfaces directly.
    pub async fn fetch_query(&self, reference: &QueryReference) -> Result<String> {
        let coordinator = reference.coordinator_url();
        let cookie = self.sessions.session_token(coordinator).await?;

        match self.issue_fetch(reference, &cookie).await? {
            FetchAttempt::Body(body) => Ok(body),
            FetchAttempt::SessionRejected => {
                info!(
                    query_id = reference.query_id(),
                    coordinator, "session rejected, refreshing and retrying once"
                );
                let cookie = self.sessions.refresh_session_token(coordinator).await?;
                match self.issue_fetch(reference, &cookie).await? {
                    FetchAttempt::Body(body) => Ok(body),
                    FetchAttempt::SessionRejected => Err(HistoryError::Auth {
                        coordinator: coordinator.to_string(),
                        message: "coordinator rejected a freshly established session".to_string(),
                    }),
                }
            }
        }
    }

    async fn issue_fetch(&self, reference: &QueryReference, cookie: &str) -> Result<FetchAttempt> {
        let query_id = reference.query_id();
        let url = format!(
            "{}/ui/api/query/{}",
            reference.coordinator_url().trim_end_matches('/'),
            query_id
        );
        debug!(query_id, url = %url, "fetching query record");

        let response = self
            .client
            .get(&url)
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|err| fetch_error(query_id, format!("fetch request failed: {err}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(FetchAttempt::SessionRejected);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(HistoryError::NotFound {
                query_id: query_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(fetch_error(
                query_id,
                format!("coordinator answered with status {status}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|err| fetch_error(query_id, format!("failed to read response body: {err}")))?;
        Ok(FetchAttempt::Body(body))
    }
}

fn fetch_error(query_id: &str, message: String) -> HistoryError {
    HistoryError::Fetch {
        query_id: query_id.to_string(),
        message,
    }
}
