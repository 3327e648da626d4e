//! Core traits for vidnotify
//!
//! This module defines the collaborator interfaces the engine consumes.
//!
//! - [`FeedSource`]: Fetch the newest-first feed snapshot
//! - [`StatusOracle`]: Report the visibility of one upload
//! - [`Notifier`]: Deliver one rendered message
//! - [`StateStore`]: Load and atomically save the persisted state
//! - [`StateMirror`]: Best-effort secondary copy of the saved state

pub mod feed_source;
pub mod status_oracle;
pub mod notifier;
pub mod state_store;

pub use feed_source::FeedSource;
pub use status_oracle::StatusOracle;
pub use notifier::Notifier;
pub use state_store::{StateMirror, StateStore};
