// # vidnotify - single scheduled run
//
// This binary is a THIN integration layer:
// - Reads configuration from environment variables
// - Initializes logging and the runtime
// - Wires the feed source, status oracle, notifier and state store
// - Executes exactly one run and maps its outcome to an exit code
//
// All reconciliation logic lives in vidnotify-core. Scheduling (cron, CI
// schedule) is external, and the scheduler must never start two runs against
// the same state file at once.
//
// ## Configuration
//
// ### Source
// - `VIDNOTIFY_CHANNEL_ID`: Channel to watch (required)
// - `VIDNOTIFY_FEED_URL`: Feed URL override
//
// ### Destination
// - `VIDNOTIFY_BOT_TOKEN`: Telegram bot token (required)
// - `VIDNOTIFY_CHAT_ID`: Destination chat (required)
// - `VIDNOTIFY_THREAD_ID`: Forum topic within the chat
// - `VIDNOTIFY_MESSAGE_TEMPLATE`: Message text (`{title}`, `{link}`, `{id}`;
//   a literal `\n` becomes a newline)
//
// ### Status Oracle
// - `VIDNOTIFY_YOUTUBE_API_KEY`: Data API key; without it only the watch page is scanned
// - `VIDNOTIFY_PAGE_SCAN`: Also scan the watch page for premieres (default true)
//
// ### State
// - `VIDNOTIFY_STATE_PATH`: State file (default `last_video.json`)
// - `GITHUB_TOKEN` / `GITHUB_PUSH_TOKEN` + `GITHUB_REPOSITORY`: push the state
//   file back to the repository after each save
// - `VIDNOTIFY_MIRROR_BRANCH`: Branch to push to (default: checked-out branch)
//
// ### Engine
// - `VIDNOTIFY_MODE`: `newest` (default) or `catch_up`
// - `VIDNOTIFY_CATCH_UP_LIMIT`: Catch-up lookback (default 5)
// - `VIDNOTIFY_PREMIERE_POLICY`: `skip` (default) or `track_pending`
// - `VIDNOTIFY_PENDING_TTL_DAYS`: Pending retention (default 30)
// - `VIDNOTIFY_HTTP_TIMEOUT_SECS`: Time budget per external call (default 20)
// - `VIDNOTIFY_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export VIDNOTIFY_CHANNEL_ID=UCxxxxxxxxxxxxxxxxxxxxxx
// export VIDNOTIFY_BOT_TOKEN=123456:ABC...
// export VIDNOTIFY_CHAT_ID=-1001234567890
// export VIDNOTIFY_YOUTUBE_API_KEY=AIza...
//
// vidnotify
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use vidnotify_core::traits::StatusOracle;
use vidnotify_core::{
    CandidateMode, CombinedOracle, FileStateStore, GitMirror, MirrorConfig, NotifierConfig,
    PremierePolicy, Reconciler, RunDriver, RunOutcome, SourceConfig, VidnotifyConfig,
};
use vidnotify_feed_youtube::YoutubeFeedSource;
use vidnotify_notifier_telegram::TelegramNotifier;
use vidnotify_oracle_youtube::{DataApiOracle, WatchPageOracle};

/// Exit codes for the possible run endings
///
/// - 0: Run finished (including nothing to do and feed unavailable)
/// - 1: Configuration error; no side effects happened
/// - 2: Runtime error (local state I/O)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VidnotifyExitCode {
    /// Normal exit
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (state could not be loaded or saved)
    RuntimeError = 2,
}

impl From<VidnotifyExitCode> for ExitCode {
    fn from(code: VidnotifyExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    app: VidnotifyConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// Blank values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let channel_id = get("VIDNOTIFY_CHANNEL_ID").ok_or_else(|| {
            anyhow::anyhow!(
                "VIDNOTIFY_CHANNEL_ID is required. \
                Set it via: export VIDNOTIFY_CHANNEL_ID=UC..."
            )
        })?;
        let bot_token = get("VIDNOTIFY_BOT_TOKEN").ok_or_else(|| {
            anyhow::anyhow!(
                "VIDNOTIFY_BOT_TOKEN is required. \
                Set it via: export VIDNOTIFY_BOT_TOKEN=123456:ABC..."
            )
        })?;
        let chat_id = get("VIDNOTIFY_CHAT_ID").ok_or_else(|| {
            anyhow::anyhow!(
                "VIDNOTIFY_CHAT_ID is required. \
                Set it via: export VIDNOTIFY_CHAT_ID=-100..."
            )
        })?;

        let mut source = SourceConfig::new(channel_id);
        if let Some(url) = get("VIDNOTIFY_FEED_URL") {
            source = source.with_feed_url(url);
        }

        let mut notifier = NotifierConfig::new(bot_token, chat_id);
        if let Some(thread_id) = get("VIDNOTIFY_THREAD_ID") {
            notifier = notifier.with_thread_id(thread_id);
        }

        let mut app = VidnotifyConfig::new(source, notifier);

        app.oracle.api_key = get("VIDNOTIFY_YOUTUBE_API_KEY");
        if let Some(value) = get("VIDNOTIFY_PAGE_SCAN") {
            app.oracle.page_scan = parse_bool("VIDNOTIFY_PAGE_SCAN", &value)?;
        }

        if let Some(path) = get("VIDNOTIFY_STATE_PATH") {
            app.state_store.path = path;
        }

        app.mirror = MirrorConfig::from_parts(
            get("GITHUB_TOKEN").or_else(|| get("GITHUB_PUSH_TOKEN")),
            get("GITHUB_REPOSITORY"),
        );
        if let Some(mirror) = app.mirror.as_mut() {
            mirror.branch = get("VIDNOTIFY_MIRROR_BRANCH");
        }

        if let Some(mode) = get("VIDNOTIFY_MODE") {
            app.engine.mode = match mode.trim().to_lowercase().replace('-', "_").as_str() {
                "newest" => CandidateMode::Newest,
                "catch_up" => CandidateMode::CatchUp,
                other => anyhow::bail!(
                    "VIDNOTIFY_MODE '{}' is not valid. Valid modes: newest, catch_up",
                    other
                ),
            };
        }
        if let Some(limit) = get("VIDNOTIFY_CATCH_UP_LIMIT") {
            app.engine.catch_up_limit = parse_number("VIDNOTIFY_CATCH_UP_LIMIT", &limit)?;
        }
        if let Some(policy) = get("VIDNOTIFY_PREMIERE_POLICY") {
            app.engine.premiere_policy =
                match policy.trim().to_lowercase().replace('-', "_").as_str() {
                    "skip" => PremierePolicy::Skip,
                    "track_pending" => PremierePolicy::TrackPending,
                    other => anyhow::bail!(
                        "VIDNOTIFY_PREMIERE_POLICY '{}' is not valid. \
                        Valid policies: skip, track_pending",
                        other
                    ),
                };
        }
        if let Some(days) = get("VIDNOTIFY_PENDING_TTL_DAYS") {
            app.engine.pending_ttl_days = parse_number("VIDNOTIFY_PENDING_TTL_DAYS", &days)?;
        }
        if let Some(secs) = get("VIDNOTIFY_HTTP_TIMEOUT_SECS") {
            let secs: u64 = parse_number("VIDNOTIFY_HTTP_TIMEOUT_SECS", &secs)?;
            app.fetch_timeout_secs = secs;
            app.engine.check_timeout_secs = secs;
            app.engine.send_timeout_secs = secs;
        }
        if let Some(template) = lookup("VIDNOTIFY_MESSAGE_TEMPLATE") {
            app.engine.message_template = template.replace("\\n", "\n");
        }

        Ok(Self {
            app,
            log_level: get("VIDNOTIFY_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.app.validate()?;

        if self.app.fetch_timeout_secs > 300 {
            anyhow::bail!(
                "VIDNOTIFY_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.app.fetch_timeout_secs
            );
        }

        if let Some(parent) = std::path::Path::new(&self.app.state_store.path).parent()
            && !parent.as_os_str().is_empty()
            && parent.is_file()
        {
            anyhow::bail!(
                "VIDNOTIFY_STATE_PATH parent is a file, not a directory: {}",
                parent.display()
            );
        }

        self.level()?;
        Ok(())
    }

    /// Parsed log level
    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "VIDNOTIFY_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Time budget for each external HTTP call
    fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.app.fetch_timeout_secs)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer. Got: {}", key, value))
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return VidnotifyExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return VidnotifyExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return VidnotifyExitCode::ConfigError.into();
    }

    info!("Starting vidnotify run for channel {}", config.app.source.channel_id);

    // One run, one thread
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return VidnotifyExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let driver = match build_driver(&config).await {
            Ok(driver) => driver,
            Err(e @ vidnotify_core::Error::Config(_)) => {
                error!("Startup error: {}", e);
                return VidnotifyExitCode::ConfigError;
            }
            Err(e) => {
                error!("Startup error: {}", e);
                return VidnotifyExitCode::RuntimeError;
            }
        };

        match driver.run_once().await {
            Ok(outcome) => exit_code_for(&outcome),
            Err(e) => {
                error!("Run aborted: {}", e);
                VidnotifyExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Map a finished run to its exit code
fn exit_code_for(outcome: &RunOutcome) -> VidnotifyExitCode {
    match outcome {
        RunOutcome::FeedUnavailable { error } => {
            warn!("Feed unavailable, will retry on the next run: {}", error);
        }
        RunOutcome::NothingToDo => {
            info!("Nothing to do");
        }
        RunOutcome::Completed(report) => {
            for item in &report.notified {
                info!("Announced {} ({})", item.id, item.link);
            }
        }
    }
    VidnotifyExitCode::Success
}

/// Build the status oracle for the configured key and page scan setting
fn build_oracle(config: &Config) -> vidnotify_core::Result<Box<dyn StatusOracle>> {
    let timeout = config.http_timeout();

    match (&config.app.oracle.api_key, config.app.oracle.page_scan) {
        (Some(key), true) => {
            info!("Status oracle: Data API + watch page scan");
            Ok(Box::new(CombinedOracle::new(
                Box::new(DataApiOracle::with_timeout(key.clone(), timeout)?),
                Box::new(WatchPageOracle::with_timeout(timeout)?),
            )))
        }
        (Some(key), false) => {
            info!("Status oracle: Data API");
            Ok(Box::new(DataApiOracle::with_timeout(key.clone(), timeout)?))
        }
        (None, page_scan) => {
            if !page_scan {
                warn!("No YouTube API key configured; using the watch page scan regardless");
            }
            info!("Status oracle: watch page scan");
            Ok(Box::new(WatchPageOracle::with_timeout(timeout)?))
        }
    }
}

/// Wire every component into a run driver
async fn build_driver(config: &Config) -> vidnotify_core::Result<RunDriver> {
    let app = &config.app;
    let timeout = config.http_timeout();

    let feed = YoutubeFeedSource::with_timeout(&app.source, timeout)?;
    debug!("Feed URL: {}", feed.url());

    let notifier = TelegramNotifier::with_timeout(&app.notifier, timeout)?;
    let oracle = build_oracle(config)?;

    let mut store = FileStateStore::new(&app.state_store.path).await?;
    match &app.mirror {
        Some(mirror) => {
            info!("State mirror enabled for {}", mirror.repository);
            store = store.with_mirror(Box::new(GitMirror::new(mirror)));
        }
        None => debug!("State mirror disabled (no token or repository)"),
    }

    let reconciler = Reconciler::new(oracle, Box::new(notifier), app.engine.clone())?;

    Ok(RunDriver::new(Box::new(feed), Box::new(store), reconciler).with_timeouts(
        Duration::from_secs(app.fetch_timeout_secs),
        Duration::from_secs(app.state_store.io_timeout_secs),
    ))
}
