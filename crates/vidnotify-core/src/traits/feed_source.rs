// # Feed Source Trait
//
// Defines the interface for acquiring a feed snapshot of the tracked channel.
//
// ## Implementations
//
// - YouTube channel Atom feed: `vidnotify-feed-youtube` crate
//
// ## Usage
//
// ```rust,ignore
// use vidnotify_core::FeedSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* FeedSource implementation */;
//
//     let items = source.fetch().await?;
//     if let Some(newest) = items.first() {
//         println!("newest upload: {}", newest.id);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::Item;

/// Trait for feed source implementations
///
/// # Contract
///
/// - Items are returned newest first
/// - An empty snapshot is a valid outcome ("nothing to do"), not an error
/// - Errors are transient: the run driver logs them and leaves state untouched
///
/// # Trust Level: Untrusted
///
/// Feed sources perform read-only HTTP calls to their endpoint and nothing
/// else. They must not retry, cache between runs, or look at state.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current snapshot, newest first
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Item>)`: The snapshot (possibly empty)
    /// - `Err(Error)`: Network, HTTP or parse failure
    async fn fetch(&self) -> Result<Vec<Item>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
