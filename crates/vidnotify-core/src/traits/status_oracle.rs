// # Status Oracle Trait
//
// Defines the interface for checking the publication visibility of an upload.
//
// ## Implementations
//
// - Structured Data API query: `vidnotify-oracle-youtube::DataApiOracle`
// - Watch page heuristic scan: `vidnotify-oracle-youtube::WatchPageOracle`
// - Both combined: `vidnotify_core::CombinedOracle`

use async_trait::async_trait;

use crate::model::VisibilityStatus;

/// Trait for status oracle implementations
///
/// # Totality
///
/// `check` never fails. Non-2xx responses, transport errors and malformed
/// payloads map to `VisibilityStatus::Unknown`, which the engine routes to
/// "remains pending, retry next run". Exactly one lookup per call.
///
/// # Trust Level: Untrusted
///
/// Oracles perform read-only HTTP calls. They must not retry, cache, or
/// decide whether a message should be sent.
#[async_trait]
pub trait StatusOracle: Send + Sync {
    /// Report the current visibility of `item_id`
    async fn check(&self, item_id: &str) -> VisibilityStatus;

    /// Get the oracle name (for logging/debugging)
    fn oracle_name(&self) -> &'static str;
}
