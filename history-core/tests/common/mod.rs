#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use history_core::config::CoordinatorConfig;
use history_core::resilience::RetryPolicy;
use history_core::storage::{LocalFileSystemStorage, QueryStorage, RetryingStorage};
use history_core::{QueryFetcher, QueryService, SessionManager};

pub const SESSION_COOKIE: &str = "engine_session";

/// In-process stand-in for a query-engine coordinator: cookie login plus an
/// authenticated query API, with counters and failure knobs for assertions.
#[derive(Clone)]
pub struct Coordinator {
    logins: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
    reject_all: Arc<AtomicBool>,
    valid_cookie: Arc<Mutex<String>>,
    records: Arc<Mutex<HashMap<String, String>>>,
    login_delay: Duration,
}

impl Coordinator {
    fn new(login_delay: Duration) -> Self {
        Self {
            logins: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
            reject_all: Arc::new(AtomicBool::new(false)),
            valid_cookie: Arc::new(Mutex::new(String::new())),
            records: Arc::new(Mutex::new(HashMap::new())),
            login_delay,
        }
    }

    pub fn put_record(&self, query_id: &str, body: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(query_id.to_string(), body.to_string());
    }

    /// Invalidates the current session server-side, as an expiry would.
    pub fn expire_sessions(&self) {
        self.valid_cookie.lock().unwrap().push_str("-expired");
    }

    /// When set, every fetch is rejected as unauthorized even with a fresh
    /// session.
    pub fn reject_all_fetches(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

async fn login(State(coordinator): State<Coordinator>) -> Response {
    tokio::time::sleep(coordinator.login_delay).await;
    let n = coordinator.logins.fetch_add(1, Ordering::SeqCst) + 1;
    let cookie = format!("{SESSION_COOKIE}=token-{n}");
    *coordinator.valid_cookie.lock().unwrap() = cookie.clone();
    (
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, format!("{cookie}; Path=/; HttpOnly")),
            (header::LOCATION, "/ui".to_string()),
        ],
    )
        .into_response()
}

async fn fetch_query(
    State(coordinator): State<Coordinator>,
    AxumPath(query_id): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    coordinator.fetches.fetch_add(1, Ordering::SeqCst);

    let presented = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let valid = coordinator.valid_cookie.lock().unwrap().clone();
    if coordinator.reject_all.load(Ordering::SeqCst) || presented != valid {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match coordinator.records.lock().unwrap().get(&query_id) {
        Some(body) => (
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Starts a fake coordinator on an ephemeral port and returns its handle
/// plus base URL.
pub async fn spawn_coordinator(login_delay: Duration) -> (Coordinator, String) {
    let coordinator = Coordinator::new(login_delay);
    let app = Router::new()
        .route("/ui/login", post(login))
        .route("/ui/api/query/:query_id", get(fetch_query))
        .with_state(coordinator.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (coordinator, format!("http://{addr}"))
}

pub fn coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        username: "history".to_string(),
        password: "secret".to_string(),
        request_timeout_ms: 5_000,
    }
}

/// Real session manager, fetcher, and retrying filesystem storage rooted at
/// `root`.
pub fn service_over(root: &Path) -> QueryService {
    let config = coordinator_config();
    let sessions = Arc::new(SessionManager::new(&config).unwrap());
    let fetcher = QueryFetcher::new(&config, sessions).unwrap();
    let backend: Arc<dyn QueryStorage> = Arc::new(LocalFileSystemStorage::new(root));
    let storage = RetryingStorage::new(backend, RetryPolicy::new(3, Duration::from_millis(10)));
    QueryService::new(fetcher, storage)
}
