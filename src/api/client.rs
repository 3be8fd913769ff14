//! AnalysisClient - request/response calls to the analysis service.

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::types::{SeriesId, SeriesStarted, SessionId, SessionStarted, SessionSummary};

/// The environment variable that overrides the cached bearer token.
pub const TOKEN_ENV: &str = "SQUAT_COACH_TOKEN";

/// Default base URL for the analysis REST API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/analysis";

/// Connection timeout. Only connecting is bounded; a slow response is awaited
/// for as long as it takes.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the session/series endpoints.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    token: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl AnalysisClient {
    /// Create a client for `base_url` that authenticates with `token`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingToken` if the token is empty.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ApiError::MissingToken);
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new session. `POST /session/start`.
    pub async fn start_session(&self) -> Result<SessionId, ApiError> {
        let started: SessionStarted = self.post_json("session/start").await?;
        log::info!("Session created: {}", started.session_id);
        Ok(started.session_id)
    }

    /// Create a new series in the current session. `POST /serie/start`.
    pub async fn start_series(&self) -> Result<SeriesId, ApiError> {
        let started: SeriesStarted = self.post_json("serie/start").await?;
        log::info!("Series created: {}", started.serie_id);
        Ok(started.serie_id)
    }

    /// Close a series. `POST /serie/{id}/end`; the response body is ignored.
    pub async fn end_series(&self, id: &SeriesId) -> Result<(), ApiError> {
        self.post(&format!("serie/{}/end", id)).await?;
        log::info!("Series {} ended", id);
        Ok(())
    }

    /// Close a session and fetch its aggregate. `POST /session/{id}/end`.
    pub async fn end_session(&self, id: &SessionId) -> Result<SessionSummary, ApiError> {
        let summary: SessionSummary = self.post_json(&format!("session/{}/end", id)).await?;
        log::info!("Session {} ended: {:?}", id, summary);
        Ok(summary)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.post(path).await?;
        Ok(response.json().await?)
    }

    /// Send an authenticated, body-less JSON POST and reject non-2xx replies.
    async fn post(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

/// Errors from the analysis REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bearer token not configured (set SQUAT_COACH_TOKEN or log in again)")]
    MissingToken,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error {status}: {body}")]
    Status { status: u16, body: String },
}
