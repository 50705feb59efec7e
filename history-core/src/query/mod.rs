use crate::error::{HistoryError, Result};

/// Header on the inbound notification naming the coordinator that owns the
/// completed query.
pub const COORDINATOR_URL_HEADER: &str = "x-coordinator-url";

/// Immutable fetch target: which query, on which coordinator. Created once
/// per inbound notification and discarded after the orchestration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReference {
    query_id: String,
    coordinator_url: String,
}

impl QueryReference {
    pub fn new(query_id: impl Into<String>, coordinator_url: impl Into<String>) -> Result<Self> {
        let query_id = query_id.into();
        let coordinator_url = coordinator_url.into();
        validate_query_id(&query_id)?;
        if coordinator_url.trim().is_empty() {
            return Err(HistoryError::InvalidQueryEvent(
                "coordinator url must not be empty".to_string(),
            ));
        }
        Ok(Self {
            query_id,
            coordinator_url,
        })
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn coordinator_url(&self) -> &str {
        &self.coordinator_url
    }
}

/// Identifiers end up as storage keys and URL path segments; reject anything
/// that could escape the per-environment prefix.
pub fn validate_query_id(query_id: &str) -> Result<()> {
    if query_id.trim().is_empty() {
        return Err(HistoryError::InvalidQueryEvent(
            "query id must not be empty".to_string(),
        ));
    }
    if query_id.contains(['/', '\\', '\0']) || query_id.contains("..") {
        return Err(HistoryError::InvalidQueryEvent(format!(
            "query id {query_id:?} contains path-significant characters"
        )));
    }
    Ok(())
}

/// Builds a [`QueryReference`] from a completed-query event payload and the
/// coordinator header value. Only `metadata.queryId` is inspected; the rest
/// of the payload is opaque (the stored bytes come from the coordinator
/// fetch, not from the notification body).
pub fn reference_from_event(
    event_json: &str,
    coordinator_url: Option<&str>,
) -> Result<QueryReference> {
    let event: serde_json::Value = serde_json::from_str(event_json)
        .map_err(|err| HistoryError::InvalidQueryEvent(format!("malformed event payload: {err}")))?;

    let query_id = event
        .pointer("/metadata/queryId")
        .and_then(|value| value.as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            HistoryError::InvalidQueryEvent(
                "event payload is missing metadata.queryId".to_string(),
            )
        })?;

    let coordinator_url = coordinator_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            HistoryError::InvalidQueryEvent(format!(
                "missing {COORDINATOR_URL_HEADER} header on query event"
            ))
        })?;

    QueryReference::new(query_id, coordinator_url)
}
