// # State Store Trait
//
// Defines the interface for persistent state management.
//
// ## Purpose
//
// The state store makes notification idempotent across runs by keeping:
// - The set of uploads whose delivery was confirmed
// - Pending records for uploads not yet public
//
// ## Implementations
//
// - File-based: JSON file with write-then-rename (`FileStateStore`)
// - In-memory: tests and embedders (`MemoryStateStore`)
//
// ## Usage
//
// ```rust,ignore
// use vidnotify_core::StateStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* StateStore implementation */;
//
//     let mut state = store.load().await?;
//     state.mark_notified("dQw4w9WgXcQ");
//     store.save(&state).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::path::Path;

use crate::model::PersistedState;

/// Trait for state store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Push a copy to a secondary mirror in `replicate`
///
/// ## Forbidden Capabilities
/// - ❌ Implement business logic (owned by `Reconciler`)
/// - ❌ Send notifications or query oracles
///
/// ## Implementation Guidelines
///
/// - **Lenient load**: missing or corrupt storage loads as an empty state and
///   is logged as a warning. Only unrecoverable I/O is an error.
/// - **Atomic save**: a crash mid-write leaves either the old or the new
///   content, never a truncated one.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state
    ///
    /// # Returns
    ///
    /// - `Ok(PersistedState)`: The stored state, or an empty one when
    ///   storage is missing or corrupt
    /// - `Err(Error)`: Unrecoverable storage error
    async fn load(&self) -> Result<PersistedState, crate::Error>;

    /// Atomically replace the persisted state
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The new state is durable
    /// - `Err(Error)`: The previous content is still intact
    async fn save(&self, state: &PersistedState) -> Result<(), crate::Error>;

    /// Copy the last saved state to a secondary location, if any
    ///
    /// Called after `save` succeeded and outside its time budget. The local
    /// state is already durable, so an error here is only worth a warning.
    async fn replicate(&self) -> Result<(), crate::Error> {
        Ok(())
    }
}

/// Secondary sink for the saved state file
///
/// Invoked best-effort from `StateStore::replicate`, after the primary atomic
/// write succeeded. Errors are logged by the caller and never roll back the
/// local write.
#[async_trait]
pub trait StateMirror: Send + Sync {
    /// Push the state file at `path` to the mirror
    async fn mirror(&self, path: &Path) -> Result<(), crate::Error>;

    /// Get the mirror name (for logging/debugging)
    fn mirror_name(&self) -> &'static str;
}
