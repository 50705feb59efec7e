pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod observability;
pub mod query;
pub mod resilience;
pub mod service;
pub mod storage;

pub use auth::SessionManager;
pub use error::{HistoryError, Result};
pub use fetch::QueryFetcher;
pub use query::QueryReference;
pub use service::QueryService;
pub use storage::QueryStorage;
