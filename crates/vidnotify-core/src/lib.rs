// # vidnotify-core
//
// Core library for the vidnotify new-upload notifier.
//
// ## Architecture Overview
//
// One run polls a single channel feed and forwards a message for every newly
// published upload exactly once:
// - **FeedSource**: Trait for fetching the newest-first feed snapshot
// - **StatusOracle**: Trait for asking whether an upload is publicly visible
// - **Notifier**: Trait for delivering one rendered message
// - **StateStore**: Trait for loading and atomically saving the persisted state
// - **Reconciler**: Decides which uploads are new, pending or already notified
// - **RunDriver**: One scheduled tick: fetch, load, reconcile, save
//
// ## Preconditions
//
// No two runs may execute concurrently against the same persisted state.
// The scheduler (cron, CI schedule, lock file) owns that guarantee; concurrent
// runs would race on load/mutate/save and could duplicate or drop messages.

pub mod traits;
pub mod model;
pub mod engine;
pub mod oracle;
pub mod config;
pub mod error;
pub mod state;

// Re-export core types for convenience
pub use traits::{FeedSource, Notifier, StateMirror, StateStore, StatusOracle};
pub use model::{Item, PendingRecord, PersistedState, VisibilityStatus};
pub use engine::{ItemOutcome, ReconcileReport, Reconciler, RunDriver, RunOutcome};
pub use oracle::CombinedOracle;
pub use config::{
    CandidateMode, EngineConfig, MirrorConfig, NotifierConfig, OracleConfig, PremierePolicy,
    SourceConfig, StateStoreConfig, VidnotifyConfig,
};
pub use error::{Error, Result};
pub use state::{FileStateStore, GitMirror, MemoryStateStore};
