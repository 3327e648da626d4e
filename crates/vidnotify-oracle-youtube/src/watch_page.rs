//! Watch page oracle
//!
//! Scans the HTML of `https://www.youtube.com/watch?v=<id>` for markers in
//! the embedded player response. The markers are not a stable interface;
//! the classifier is a plain function so it can be swapped when the page
//! changes.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use vidnotify_core::traits::StatusOracle;
use vidnotify_core::{Error, Result, VisibilityStatus};

/// Watch page prefix
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Default HTTP timeout for page requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Classifier signature: page HTML in, status out
pub type PageClassifier = fn(&str) -> VisibilityStatus;

static UPCOMING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""isUpcoming"\s*:\s*true|"upcomingEventData"\s*:"#)
        .expect("Invalid regex pattern for upcoming marker")
});

static PLAYABILITY_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""playabilityStatus"\s*:\s*\{\s*"status"\s*:\s*"([A-Z_]+)""#)
        .expect("Invalid regex pattern for playability status")
});

static PRIVATE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""isPrivate"\s*:\s*true"#).expect("Invalid regex pattern for private marker")
});

static UNLISTED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""isUnlisted"\s*:\s*true"#).expect("Invalid regex pattern for unlisted marker")
});

/// Classify a watch page
///
/// Precedence:
/// 1. Upcoming/premiere markers → `PremiereUpcoming`
/// 2. `LOGIN_REQUIRED` or an `isPrivate` flag → `Private`
/// 3. `ERROR` → `NotFound`
/// 4. `isUnlisted: true` → `Unlisted`
/// 5. `OK` → `Public`
/// 6. Anything else → `Unknown`
pub fn classify_watch_page(html: &str) -> VisibilityStatus {
    if UPCOMING_MARKER.is_match(html) {
        return VisibilityStatus::PremiereUpcoming;
    }

    let playability = PLAYABILITY_STATUS
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());

    if playability == Some("LOGIN_REQUIRED") || PRIVATE_MARKER.is_match(html) {
        return VisibilityStatus::Private;
    }

    match playability {
        Some("ERROR") => VisibilityStatus::NotFound,
        Some("LIVE_STREAM_OFFLINE") => VisibilityStatus::PremiereUpcoming,
        _ if UNLISTED_MARKER.is_match(html) => VisibilityStatus::Unlisted,
        Some("OK") => VisibilityStatus::Public,
        _ => VisibilityStatus::Unknown,
    }
}

/// Status oracle that scans the public watch page
pub struct WatchPageOracle {
    /// URL prefix the id is appended to
    base_url: String,

    /// Page classifier
    classify: PageClassifier,

    /// HTTP client
    client: reqwest::Client,
}

impl std::fmt::Debug for WatchPageOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchPageOracle")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl WatchPageOracle {
    /// Create a new watch page oracle
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a watch page oracle with a custom HTTP timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vidnotify/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: WATCH_URL_PREFIX.to_string(),
            classify: classify_watch_page,
            client,
        })
    }

    /// Replace the page classifier
    pub fn with_classifier(mut self, classify: PageClassifier) -> Self {
        self.classify = classify;
        self
    }

    /// Replace the URL prefix the id is appended to
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the page HTML; `Ok(None)` when the page does not exist
    async fn fetch_page(&self, item_id: &str) -> Result<Option<String>> {
        let url = format!("{}{}", self.base_url, item_id);
        let response = self
            .client
            .get(&url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::http(format!("HTTP error: {}", status)));
        }

        response
            .text()
            .await
            .map(Some)
            .map_err(|e| Error::http(format!("Failed to read page: {}", e)))
    }
}

#[async_trait]
impl StatusOracle for WatchPageOracle {
    async fn check(&self, item_id: &str) -> VisibilityStatus {
        match self.fetch_page(item_id).await {
            Ok(Some(html)) => (self.classify)(&html),
            Ok(None) => VisibilityStatus::NotFound,
            Err(e) => {
                tracing::warn!("Watch page check for {} failed: {}", item_id, e);
                VisibilityStatus::Unknown
            }
        }
    }

    fn oracle_name(&self) -> &'static str {
        "watch-page"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(player_response: &str) -> String {
        format!(
            "<html><script>var ytInitialPlayerResponse = {};</script></html>",
            player_response
        )
    }

    #[test]
    fn test_public_page() {
        let html = page(r#"{"playabilityStatus":{"status":"OK","playableInEmbed":true},"microformat":{"playerMicroformatRenderer":{"isUnlisted":false}}}"#);
        assert_eq!(classify_watch_page(&html), VisibilityStatus::Public);
    }

    #[test]
    fn test_upcoming_premiere() {
        let html = page(r#"{"playabilityStatus":{"status":"OK"},"videoDetails":{"isUpcoming":true},"upcomingEventData":{"startTime":"1767261600"}}"#);
        assert_eq!(classify_watch_page(&html), VisibilityStatus::PremiereUpcoming);
    }

    #[test]
    fn test_offline_live_stream_is_upcoming() {
        let html = page(r#"{"playabilityStatus":{"status":"LIVE_STREAM_OFFLINE"}}"#);
        assert_eq!(classify_watch_page(&html), VisibilityStatus::PremiereUpcoming);
    }

    #[test]
    fn test_private_page() {
        let login = page(r#"{"playabilityStatus":{"status":"LOGIN_REQUIRED","reason":"Private video"}}"#);
        assert_eq!(classify_watch_page(&login), VisibilityStatus::Private);

        let flagged = page(r#"{"playabilityStatus":{"status":"OK"},"videoDetails":{"isPrivate":true}}"#);
        assert_eq!(classify_watch_page(&flagged), VisibilityStatus::Private);
    }

    #[test]
    fn test_removed_video() {
        let html = page(r#"{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}}"#);
        assert_eq!(classify_watch_page(&html), VisibilityStatus::NotFound);
    }

    #[test]
    fn test_unlisted_page() {
        let html = page(r#"{"playabilityStatus":{"status":"OK"},"microformat":{"playerMicroformatRenderer":{"isUnlisted":true}}}"#);
        assert_eq!(classify_watch_page(&html), VisibilityStatus::Unlisted);
    }

    #[test]
    fn test_unrecognized_page_is_unknown() {
        assert_eq!(classify_watch_page("<html>consent</html>"), VisibilityStatus::Unknown);
        let html = page(r#"{"playabilityStatus":{"status":"UNPLAYABLE"}}"#);
        assert_eq!(classify_watch_page(&html), VisibilityStatus::Unknown);
    }

    #[tokio::test]
    async fn test_custom_classifier_is_used() {
        fn always_public(_: &str) -> VisibilityStatus {
            VisibilityStatus::Public
        }

        let oracle = WatchPageOracle::with_timeout(Duration::from_secs(2))
            .unwrap()
            .with_classifier(always_public)
            .with_base_url("http://127.0.0.1:9/watch?v=");

        // Transport failure wins over the classifier
        assert_eq!(oracle.check("abc").await, VisibilityStatus::Unknown);
        assert_eq!(oracle.oracle_name(), "watch-page");
    }
}
