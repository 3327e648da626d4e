//! Configuration types for vidnotify
//!
//! The configuration is built once at the start of a run (the binary reads it
//! from the environment) and handed to each component. No component reads the
//! process environment on its own.

use serde::{Deserialize, Serialize};

/// Main vidnotify configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VidnotifyConfig {
    /// Tracked channel
    pub source: SourceConfig,

    /// Status oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Notification destination
    pub notifier: NotifierConfig,

    /// State store configuration
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Optional remote mirror of the state file
    #[serde(default)]
    pub mirror: Option<MirrorConfig>,

    /// Reconciliation settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Time budget for fetching the feed (in seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl VidnotifyConfig {
    /// Create a configuration with defaults for everything but the required fields
    pub fn new(source: SourceConfig, notifier: NotifierConfig) -> Self {
        Self {
            source,
            oracle: OracleConfig::default(),
            notifier,
            state_store: StateStoreConfig::default(),
            mirror: None,
            engine: EngineConfig::default(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }

    /// Validate the configuration
    ///
    /// Any error here aborts the run before it has side effects.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.notifier.validate()?;
        self.state_store.validate()?;
        self.engine.validate()?;

        if self.fetch_timeout_secs == 0 {
            return Err(crate::Error::config("Feed fetch timeout must be > 0"));
        }

        if let Some(mirror) = &self.mirror {
            mirror.validate()?;
        }

        Ok(())
    }
}

/// Tracked channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Channel identifier
    pub channel_id: String,

    /// Feed URL override (defaults to the channel's public feed)
    #[serde(default)]
    pub feed_url: Option<String>,
}

impl SourceConfig {
    /// Create a source configuration for `channel_id`
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            feed_url: None,
        }
    }

    /// Override the feed URL
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = Some(url.into());
        self
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.channel_id.trim().is_empty() {
            return Err(crate::Error::config("Channel id cannot be empty"));
        }
        if let Some(url) = &self.feed_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "Feed URL must use HTTP or HTTPS scheme. Got: {}",
                url
            )));
        }
        Ok(())
    }
}

/// Status oracle configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// API key for the structured status query (optional)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Whether to scan the watch page for premiere markers
    #[serde(default = "default_page_scan")]
    pub page_scan: bool,
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("page_scan", &self.page_scan)
            .finish()
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            page_scan: default_page_scan(),
        }
    }
}

/// Notification destination configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Bot credential
    pub bot_token: String,

    /// Destination identifier
    pub chat_id: String,

    /// Optional sub-destination (thread) identifier
    #[serde(default)]
    pub thread_id: Option<String>,
}

// The credential must never reach the logs
impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("bot_token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

impl NotifierConfig {
    /// Create a notifier configuration
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            thread_id: None,
        }
    }

    /// Set the thread identifier
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.bot_token.trim().is_empty() {
            return Err(crate::Error::config("Bot token cannot be empty"));
        }
        if self.chat_id.trim().is_empty() {
            return Err(crate::Error::config("Chat id cannot be empty"));
        }
        Ok(())
    }
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateStoreConfig {
    /// Path to the state file
    #[serde(default = "default_state_path")]
    pub path: String,

    /// Time budget for each load/save (in seconds)
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
            io_timeout_secs: default_io_timeout_secs(),
        }
    }
}

impl StateStoreConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.path.trim().is_empty() {
            return Err(crate::Error::config("State file path cannot be empty"));
        }
        if self.io_timeout_secs == 0 {
            return Err(crate::Error::config("State I/O timeout must be > 0"));
        }
        Ok(())
    }
}

/// Remote mirror configuration (version-controlled push of the state file)
#[derive(Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Write-capable credential
    pub token: String,

    /// Remote identifier (`owner/repo`)
    pub repository: String,

    /// Branch to push to (defaults to the checked-out branch)
    #[serde(default)]
    pub branch: Option<String>,
}

impl std::fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("token", &"<REDACTED>")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .finish()
    }
}

impl MirrorConfig {
    /// Build a mirror configuration when both credential and remote are present
    ///
    /// Returns `None` (mirror disabled) when either is missing or blank.
    pub fn from_parts(token: Option<String>, repository: Option<String>) -> Option<Self> {
        let token = token.filter(|t| !t.trim().is_empty())?;
        let repository = repository.filter(|r| !r.trim().is_empty())?;
        Some(Self {
            token,
            repository,
            branch: None,
        })
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if !self.repository.contains('/') {
            return Err(crate::Error::config(format!(
                "Mirror repository must look like owner/repo. Got: {}",
                self.repository
            )));
        }
        Ok(())
    }
}

/// Which feed items are evaluated each run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateMode {
    /// Only the single newest feed item
    #[default]
    Newest,
    /// Every item newer than the last notified one, oldest first
    CatchUp,
}

/// What happens to an upload whose status is `PremiereUpcoming`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremierePolicy {
    /// Neither notify nor track; an existing pending record is dropped
    #[default]
    Skip,
    /// Keep a pending record with status `PremiereUpcoming`
    TrackPending,
}

/// Reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Candidate selection mode
    #[serde(default)]
    pub mode: CandidateMode,

    /// Maximum number of items evaluated in catch-up mode
    ///
    /// Bounds the lookback when no notified item appears in the snapshot
    /// (cold state store), so a first run does not replay the whole backlog.
    #[serde(default = "default_catch_up_limit")]
    pub catch_up_limit: usize,

    /// Premiere handling
    #[serde(default)]
    pub premiere_policy: PremierePolicy,

    /// Pending records older than this are dropped (in days)
    #[serde(default = "default_pending_ttl_days")]
    pub pending_ttl_days: u32,

    /// Time budget for one oracle check (in seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Time budget for one send (in seconds)
    #[serde(default = "default_call_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Message text; `{title}`, `{link}` and `{id}` are substituted
    #[serde(default = "default_message_template")]
    pub message_template: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: CandidateMode::default(),
            catch_up_limit: default_catch_up_limit(),
            premiere_policy: PremierePolicy::default(),
            pending_ttl_days: default_pending_ttl_days(),
            check_timeout_secs: default_call_timeout_secs(),
            send_timeout_secs: default_call_timeout_secs(),
            message_template: default_message_template(),
        }
    }
}

impl EngineConfig {
    /// Set the candidate mode
    pub fn with_mode(mut self, mode: CandidateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the premiere policy
    pub fn with_premiere_policy(mut self, policy: PremierePolicy) -> Self {
        self.premiere_policy = policy;
        self
    }

    /// Set the catch-up lookback
    pub fn with_catch_up_limit(mut self, limit: usize) -> Self {
        self.catch_up_limit = limit;
        self
    }

    /// Retention threshold as a chrono duration
    pub fn pending_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.pending_ttl_days))
    }

    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.catch_up_limit == 0 {
            return Err(crate::Error::config("Catch-up limit must be > 0"));
        }
        if self.pending_ttl_days == 0 {
            return Err(crate::Error::config("Pending TTL must be at least one day"));
        }
        if self.check_timeout_secs == 0 || self.send_timeout_secs == 0 {
            return Err(crate::Error::config("Collaborator timeouts must be > 0"));
        }
        if self.message_template.trim().is_empty() {
            return Err(crate::Error::config("Message template cannot be empty"));
        }
        Ok(())
    }
}

fn default_page_scan() -> bool {
    true
}

fn default_state_path() -> String {
    "last_video.json".to_string()
}

fn default_io_timeout_secs() -> u64 {
    30
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

fn default_catch_up_limit() -> usize {
    5
}

fn default_pending_ttl_days() -> u32 {
    30
}

fn default_call_timeout_secs() -> u64 {
    20
}

fn default_message_template() -> String {
    "New video on the channel! 🎥\n{title}\n{link}".to_string()
}
