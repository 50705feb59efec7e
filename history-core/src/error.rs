use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("invalid query event: {0}")]
    InvalidQueryEvent(String),

    #[error("authentication with coordinator {coordinator} failed: {message}")]
    Auth { coordinator: String, message: String },

    #[error("failed to fetch query {query_id}: {message}")]
    Fetch { query_id: String, message: String },

    #[error("query {query_id} not found")]
    NotFound { query_id: String },

    #[error("storage operation for query {query_id} failed: {message}")]
    Storage { query_id: String, message: String },

    #[error("storage initialization failed: {0}")]
    StorageInit(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HistoryError {
    /// Transient kinds the retry executor is allowed to loop on. Every other
    /// kind is definitive and must surface on the attempt that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HistoryError::Fetch { .. } | HistoryError::Storage { .. }
        )
    }

    pub fn query_id(&self) -> Option<&str> {
        match self {
            HistoryError::Fetch { query_id, .. }
            | HistoryError::NotFound { query_id }
            | HistoryError::Storage { query_id, .. } => Some(query_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
