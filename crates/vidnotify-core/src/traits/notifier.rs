// # Notifier Trait
//
// Defines the interface for delivering a rendered message to the single
// configured destination.
//
// ## Implementations
//
// - Telegram Bot API: `vidnotify-notifier-telegram` crate

use async_trait::async_trait;

/// Trait for notifier implementations
///
/// # Contract
///
/// - `Ok(())` means delivery was confirmed by the destination
/// - Any `Err` is a send failure; the reason is opaque to the engine
/// - Exactly one attempt per call: no internal retry or backoff
///
/// The engine only records an upload as notified after `Ok(())`, so a failed
/// send is retried on the next scheduled run.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`
    async fn send(&self, text: &str) -> Result<(), crate::Error>;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}
