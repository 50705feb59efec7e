use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reqwest::header::SET_COOKIE;
use tracing::{debug, info};

use crate::config::CoordinatorConfig;
use crate::error::{HistoryError, Result};

/// One cached session cookie per coordinator, guarded by its own lock so a
/// login for one coordinator never serializes against another.
type SessionSlot = Arc<tokio::sync::Mutex<Option<String>>>;

/// Owns the per-coordinator session cookies. Sessions are created on first
/// use, replaced on refresh, and live for the process lifetime; validity is
/// inferred from rejected fetches, not tracked by timestamp.
pub struct SessionManager {
    client: reqwest::Client,
    username: String,
    password: String,
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionManager {
    pub fn new(config: &CoordinatorConfig) -> Result<Self> {
        // Redirects stay unfollowed so the session cookie on the login
        // response is observable.
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| {
                HistoryError::InvalidConfig(format!("cannot build login client: {err}"))
            })?;
        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the cached session cookie for `coordinator_url`, logging in
    /// first if none exists. Concurrent callers for the same coordinator
    /// produce exactly one login; the rest await it and observe the cached
    /// cookie.
    pub async fn session_token(&self, coordinator_url: &str) -> Result<String> {
        let slot = self.slot(coordinator_url);
        let mut session = slot.lock().await;
        if let Some(cookie) = session.as_ref() {
            return Ok(cookie.clone());
        }
        let cookie = self.login(coordinator_url).await?;
        *session = Some(cookie.clone());
        Ok(cookie)
    }

    /// Unconditionally performs a fresh login and replaces the cached entry.
    /// Invoked after a fetch using the cached cookie was rejected.
    pub async fn refresh_session_token(&self, coordinator_url: &str) -> Result<String> {
        let slot = self.slot(coordinator_url);
        let mut session = slot.lock().await;
        let cookie = self.login(coordinator_url).await?;
        *session = Some(cookie.clone());
        Ok(cookie)
    }

    fn slot(&self, coordinator_url: &str) -> SessionSlot {
        // The map lock is never held across an await.
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(coordinator_url.to_string())
            .or_default()
            .clone()
    }

    async fn login(&self, coordinator_url: &str) -> Result<String> {
        let url = format!("{}/ui/login", coordinator_url.trim_end_matches('/'));
        debug!(coordinator = coordinator_url, "logging in to coordinator");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|err| auth_error(coordinator_url, format!("login request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() && !status.is_redirection() {
            return Err(auth_error(
                coordinator_url,
                format!("login rejected with status {status}"),
            ));
        }

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                auth_error(
                    coordinator_url,
                    "login response carried no session cookie".to_string(),
                )
            })?;

        info!(coordinator = coordinator_url, "established coordinator session");
        Ok(cookie)
    }
}

fn auth_error(coordinator: &str, message: String) -> HistoryError {
    HistoryError::Auth {
        coordinator: coordinator.to_string(),
        message,
    }
}
