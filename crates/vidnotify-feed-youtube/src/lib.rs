// # YouTube Feed Source
//
// Fetches the public per-channel Atom feed and turns it into an ordered
// snapshot of `Item`s, newest first.
//
// ## Trust Level: Untrusted (Feed Source)
//
// - Performs exactly one HTTP GET per `fetch`
// - Never touches state and never retries (the next scheduled run is the retry)
// - Any transport, status or parse failure is returned as `Error::Feed`
//
// ## Feed Format
//
// ```xml
// <entry>
//   <id>yt:video:VIDEO_ID</id>
//   <yt:videoId>VIDEO_ID</yt:videoId>
//   <title>...</title>
//   <link rel="alternate" href="https://www.youtube.com/watch?v=VIDEO_ID"/>
// </entry>
// ```

use async_trait::async_trait;
use std::time::Duration;
use vidnotify_core::config::SourceConfig;
use vidnotify_core::traits::FeedSource;
use vidnotify_core::{Error, Item, Result};

/// Channel feed endpoint
const FEED_BASE_URL: &str = "https://www.youtube.com/feeds/videos.xml";

/// Watch page prefix used when an entry carries no usable link
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Prefix YouTube puts in front of the video id in `<id>`
const ENTRY_ID_PREFIX: &str = "yt:video:";

/// Default HTTP timeout for the feed request
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Feed source backed by the channel's Atom feed
#[derive(Debug)]
pub struct YoutubeFeedSource {
    /// Fully-qualified feed URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl YoutubeFeedSource {
    /// Create a feed source from configuration
    ///
    /// Uses `feed_url` when set, otherwise the public channel feed for
    /// `channel_id`.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a feed source with a custom HTTP timeout
    pub fn with_timeout(config: &SourceConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: feed_url(config),
            client,
        })
    }

    /// URL this source fetches
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Resolve the feed URL for a source configuration
pub fn feed_url(config: &SourceConfig) -> String {
    match &config.feed_url {
        Some(url) if !url.trim().is_empty() => url.clone(),
        _ => format!("{}?channel_id={}", FEED_BASE_URL, config.channel_id),
    }
}

/// Parse an Atom document into feed items, preserving document order
///
/// The video id comes from the `yt:video:` entry id, or failing that from
/// the `v=` parameter of the entry's watch link. The parser invents an id
/// for entries that have none, so entries matching neither form are
/// skipped. Duplicate ids keep their first (newest) occurrence.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Item>> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| Error::feed(format!("Failed to parse feed: {}", e)))?;

    let mut items: Vec<Item> = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let link = entry
            .links
            .iter()
            .find(|link| link.rel.as_deref().is_none_or(|rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|link| link.href.clone());

        let Some(id) = video_id(&entry.id, link.as_deref()) else {
            tracing::debug!("Skipping feed entry without a video id ({})", entry.id);
            continue;
        };
        if items.iter().any(|item| item.id == id) {
            tracing::debug!("Skipping duplicate feed entry {}", id);
            continue;
        }

        let title = entry.title.map(|t| t.content).unwrap_or_default();
        let link = link.unwrap_or_else(|| format!("{}{}", WATCH_URL_PREFIX, id));

        items.push(Item::new(id, title, link));
    }

    Ok(items)
}

/// Extract the video id from an entry id or, failing that, its watch link
fn video_id(entry_id: &str, link: Option<&str>) -> Option<String> {
    let from_entry = entry_id
        .strip_prefix(ENTRY_ID_PREFIX)
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let from_link = || {
        let (_, query) = link?.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))
            .filter(|id| !id.is_empty())
    };

    from_entry.or_else(from_link).map(str::to_string)
}

#[async_trait]
impl FeedSource for YoutubeFeedSource {
    async fn fetch(&self) -> Result<Vec<Item>> {
        tracing::debug!("Fetching feed {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::feed(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::feed(format!("HTTP error: {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::feed(format!("Failed to read response: {}", e)))?;

        let items = parse_feed(&body)?;
        tracing::info!("Feed returned {} item(s)", items.len());
        Ok(items)
    }

    fn source_name(&self) -> &'static str {
        "youtube-feed"
    }
}
