use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::HistoryError;
use crate::observability::ServiceMetrics;
use crate::query::{self, COORDINATOR_URL_HEADER};
use crate::service::QueryService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    pub environment: String,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    fn fail(&self, err: HistoryError) -> ErrorResponse {
        self.metrics.record_error();
        ErrorResponse(err)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/query", post(create_query).get(base_query_path))
        .route("/api/v1/query/:query_id", get(get_query))
        .route("/health", get(health))
        .route("/metrics", get(export_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, listen_addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(addr = %listen_addr, "query history server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn create_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<String, ErrorResponse> {
    let coordinator = headers
        .get(COORDINATOR_URL_HEADER)
        .and_then(|value| value.to_str().ok());
    let reference =
        query::reference_from_event(&body, coordinator).map_err(|err| state.fail(err))?;

    info!(
        event = "received_query_complete_event",
        query_id = reference.query_id(),
        coordinator = reference.coordinator_url()
    );

    state
        .service
        .create_query(&reference, &state.environment)
        .await
        .map_err(|err| state.fail(err))?;
    state.metrics.record_created();
    info!(event = "create_query_succeeded", query_id = reference.query_id());

    Ok(format!(
        "Query {} was successfully created.",
        reference.query_id()
    ))
}

/// The bare collection path is not a valid endpoint.
async fn base_query_path() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn get_query(
    State(state): State<AppState>,
    Path(query_id): Path<String>,
) -> Result<Response, ErrorResponse> {
    info!(event = "received_query_read_event", query_id = %query_id);

    let record = state
        .service
        .get_query(&query_id, &state.environment)
        .await
        .map_err(|err| state.fail(err))?;
    state.metrics.record_read();
    info!(event = "get_query_succeeded", query_id = %query_id);

    Ok(([(CONTENT_TYPE, "application/json")], record).into_response())
}

async fn health() -> &'static str {
    "ok"
}

async fn export_metrics(State(state): State<AppState>) -> Response {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.export(),
    )
        .into_response()
}

/// Maps error kinds to transport status codes; the core never translates
/// kinds itself.
pub struct ErrorResponse(HistoryError);

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            HistoryError::InvalidQueryEvent(_) => StatusCode::BAD_REQUEST,
            HistoryError::NotFound { .. } => StatusCode::NOT_FOUND,
            HistoryError::Auth { .. }
            | HistoryError::Fetch { .. }
            | HistoryError::Storage { .. }
            | HistoryError::StorageInit(_)
            | HistoryError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = match &err {
            HistoryError::InvalidQueryEvent(message) => {
                format!("Received invalid query event: {message}")
            }
            HistoryError::Auth { .. } => {
                format!("Failed to authenticate with the coordinator: {err}")
            }
            HistoryError::Fetch { .. } => {
                format!("Failed to fetch query from coordinator: {err}")
            }
            HistoryError::NotFound { query_id } => format!("Query {query_id} not found."),
            HistoryError::Storage { .. } => format!("Error handling query file: {err}"),
            HistoryError::StorageInit(_) => format!("Error initializing storage: {err}"),
            HistoryError::InvalidConfig(_) => format!("Something went wrong: {err}"),
        };
        warn!(status = %status, error = %err, "request failed");
        (status, body).into_response()
    }
}
