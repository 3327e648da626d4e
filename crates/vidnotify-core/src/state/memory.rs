// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Keeps the persisted state for the lifetime of the process only. Useful for
// tests, dry runs and embedders that persist state through their own means.
//
// ## Crash Behavior
//
// - All state is lost on restart
// - A fresh process treats every upload as unseen (bounded by the engine's
//   candidate selection)

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::model::PersistedState;
use crate::traits::state_store::StateStore;

/// In-memory state store implementation
///
/// Clones share the same underlying state, so a test can hand one clone to
/// the engine and inspect the other afterwards.
///
/// # Example
///
/// ```rust,no_run
/// use vidnotify_core::state::MemoryStateStore;
/// use vidnotify_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     let mut state = store.load().await?;
///     state.mark_notified("dQw4w9WgXcQ");
///     store.save(&state).await?;
///
///     assert!(store.snapshot().await.is_notified("dQw4w9WgXcQ"));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<PersistedState>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::with_state(PersistedState::new())
    }

    /// Create a store pre-populated with `state`
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Copy of the currently stored state
    pub async fn snapshot(&self) -> PersistedState {
        self.inner.read().await.clone()
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<PersistedState, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), Error> {
        *self.inner.write().await = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
