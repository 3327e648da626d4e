//! Data API oracle
//!
//! ```http
//! GET https://www.googleapis.com/youtube/v3/videos?part=status,snippet&id=<id>&key=<key>
//! ```
//!
//! Response mapping:
//! - no `items` → `NotFound`
//! - `snippet.liveBroadcastContent == "upcoming"` → `PremiereUpcoming`
//! - otherwise `status.privacyStatus` (`public`/`private`/`unlisted`)
//! - anything unexpected → `Unknown`

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use vidnotify_core::traits::StatusOracle;
use vidnotify_core::{Error, Result, VisibilityStatus};

/// Data API videos endpoint
const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Status oracle backed by the YouTube Data API v3
pub struct DataApiOracle {
    /// API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Endpoint (overridable for tests and proxies)
    endpoint: String,

    /// HTTP client
    client: reqwest::Client,
}

impl std::fmt::Debug for DataApiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataApiOracle")
            .field("api_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl DataApiOracle {
    /// Create a new Data API oracle
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a Data API oracle with a custom HTTP timeout
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("YouTube API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            endpoint: DATA_API_URL.to_string(),
            client,
        })
    }

    /// Point the oracle at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Perform the query, returning the decoded JSON body
    async fn query(&self, item_id: &str) -> Result<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("part", "status,snippet"),
                ("id", item_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                400 | 403 => Error::http(format!(
                    "Request rejected (invalid key or quota exhausted). Status: {}",
                    status
                )),
                500..=599 => Error::http(format!("Data API server error (transient): {}", status)),
                _ => Error::http(format!("Unexpected status: {}", status)),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::http(format!("Malformed response: {}", e.without_url())))
    }
}

/// Map a `videos.list` response body to a visibility status
pub fn status_from_response(body: &Value) -> VisibilityStatus {
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        return VisibilityStatus::Unknown;
    };
    let Some(video) = items.first() else {
        return VisibilityStatus::NotFound;
    };

    let broadcast = video
        .pointer("/snippet/liveBroadcastContent")
        .and_then(Value::as_str);
    if broadcast == Some("upcoming") {
        return VisibilityStatus::PremiereUpcoming;
    }

    video
        .pointer("/status/privacyStatus")
        .and_then(Value::as_str)
        .map(VisibilityStatus::from_privacy_status)
        .unwrap_or(VisibilityStatus::Unknown)
}

#[async_trait]
impl StatusOracle for DataApiOracle {
    async fn check(&self, item_id: &str) -> VisibilityStatus {
        match self.query(item_id).await {
            Ok(body) => status_from_response(&body),
            Err(e) => {
                tracing::warn!("Data API check for {} failed: {}", item_id, e);
                VisibilityStatus::Unknown
            }
        }
    }

    fn oracle_name(&self) -> &'static str {
        "data-api"
    }
}
