// # Telegram Notifier
//
// Delivers one rendered message per call through the Bot API.
//
// ## Trust Level: Untrusted (Notifier)
//
// **Allowed Capabilities**:
// - ✅ One HTTPS POST to `sendMessage` per `send`
// - ✅ Parse the Bot API response status
//
// **Forbidden Capabilities**:
// - ❌ Retry (the pending record drives the retry on the next run)
// - ❌ Access the state store
// - ❌ Spawn tasks
//
// ## Security Requirements
//
// - The bot token is part of the request path and NEVER appears in logs or
//   error messages (reqwest errors are stripped of their URL)
// - Construction fails if the token or chat id is empty
//
// ## API Reference
//
// ```http
// POST https://api.telegram.org/bot<token>/sendMessage
// Content-Type: application/json
//
// {"chat_id": "...", "text": "...", "message_thread_id": 42}
// ```

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use vidnotify_core::config::NotifierConfig;
use vidnotify_core::traits::Notifier;
use vidnotify_core::{Error, Result};

/// Bot API base URL
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Notifier posting to a Telegram chat (optionally a forum topic)
pub struct TelegramNotifier {
    /// Bot token
    /// ⚠️ NEVER log this value
    bot_token: String,

    /// Destination chat
    chat_id: String,

    /// Forum topic within the chat
    thread_id: Option<String>,

    /// API base URL (overridable for tests and proxies)
    api_base: String,

    /// HTTP client
    client: reqwest::Client,
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"<REDACTED>")
            .field("chat_id", &self.chat_id)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a notifier from configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token or chat id is empty.
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a notifier with a custom HTTP timeout
    pub fn with_timeout(config: &NotifierConfig, timeout: Duration) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(Error::config("Telegram bot token cannot be empty"));
        }
        if config.chat_id.trim().is_empty() {
            return Err(Error::config("Telegram chat id cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            thread_id: config
                .thread_id
                .clone()
                .filter(|thread| !thread.trim().is_empty()),
            api_base: TELEGRAM_API_BASE.to_string(),
            client,
        })
    }

    /// Point the notifier at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Request body for one message
    pub fn payload(&self, text: &str) -> Value {
        build_payload(&self.chat_id, self.thread_id.as_deref(), text)
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

/// Build the `sendMessage` body
///
/// `message_thread_id` is sent as a number when it parses as one, otherwise
/// as the raw string.
pub fn build_payload(chat_id: &str, thread_id: Option<&str>, text: &str) -> Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": text,
    });

    if let Some(thread_id) = thread_id {
        let thread = match thread_id.trim().parse::<i64>() {
            Ok(numeric) => json!(numeric),
            Err(_) => json!(thread_id),
        };
        payload["message_thread_id"] = thread;
    }

    payload
}

/// Map a non-success Bot API status to an error
fn status_error(status: reqwest::StatusCode, description: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::notifier(format!(
            "Authentication failed: invalid bot token or bot not allowed in chat. Status: {}",
            status
        )),
        400 => Error::notifier(format!(
            "Request rejected (check chat id / thread id): {} - {}",
            status, description
        )),
        429 => Error::notifier(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::notifier(format!("Telegram server error (transient): {}", status)),
        _ => Error::notifier(format!("Failed to send message: {} - {}", status, description)),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&self.payload(text))
            .send()
            .await
            .map_err(|e| Error::notifier(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let description = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("description").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "no description".to_string());
            return Err(status_error(status, &description));
        }

        tracing::info!("Message delivered to chat {}", self.chat_id);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "telegram"
    }
}
