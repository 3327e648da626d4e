//! Run driver
//!
//! One scheduled tick: fetch the feed, load the state, reconcile, save once.
//!
//! ## Failure Handling
//!
//! - Feed fetch error or timeout: logged, run ends with no state I/O
//! - Empty feed: run ends with no state I/O
//! - State load/save error or timeout: the run aborts with an error; the last
//!   completed save stays the durable checkpoint and the next tick redoes the
//!   work (the notified-set check makes that idempotent)
//! - State replication error: logged; the local save already succeeded and
//!   replication is not counted against the state I/O budget

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::{ReconcileReport, Reconciler};
use crate::error::{Error, Result};
use crate::traits::{FeedSource, StateStore};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The feed could not be fetched; state was not touched
    FeedUnavailable { error: String },

    /// The feed was empty; state was not touched
    NothingToDo,

    /// Reconciliation ran and the resulting state was saved
    Completed(ReconcileReport),
}

/// Drives one run against a feed source and a state store
pub struct RunDriver {
    /// Feed snapshot source
    feed: Box<dyn FeedSource>,

    /// Durable state
    store: Box<dyn StateStore>,

    /// Reconciliation engine
    reconciler: Reconciler,

    /// Time budget for the feed fetch
    fetch_timeout: Duration,

    /// Time budget for each state load/save
    io_timeout: Duration,
}

impl RunDriver {
    /// Create a new run driver
    pub fn new(
        feed: Box<dyn FeedSource>,
        store: Box<dyn StateStore>,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            feed,
            store,
            reconciler,
            fetch_timeout: Duration::from_secs(20),
            io_timeout: Duration::from_secs(30),
        }
    }

    /// Override the feed fetch and state I/O time budgets
    pub fn with_timeouts(mut self, fetch_timeout: Duration, io_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self.io_timeout = io_timeout;
        self
    }

    /// Execute one run
    ///
    /// # Returns
    ///
    /// - `Ok(RunOutcome)`: The run finished (including "nothing to do")
    /// - `Err(Error)`: Local state I/O failed; nothing after the last
    ///   successful save is durable
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let items = match tokio::time::timeout(self.fetch_timeout, self.feed.fetch()).await {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!("Feed {} unavailable: {}", self.feed.source_name(), e);
                return Ok(RunOutcome::FeedUnavailable {
                    error: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    "Feed {} timed out after {:?}",
                    self.feed.source_name(),
                    self.fetch_timeout
                );
                return Ok(RunOutcome::FeedUnavailable {
                    error: format!("timed out after {:?}", self.fetch_timeout),
                });
            }
        };

        if items.is_empty() {
            info!("No uploads found in the feed");
            return Ok(RunOutcome::NothingToDo);
        }
        debug!("Fetched {} feed item(s), newest {}", items.len(), items[0].id);

        let mut state = tokio::time::timeout(self.io_timeout, self.store.load())
            .await
            .map_err(|_| Error::timeout(format!("state load exceeded {:?}", self.io_timeout)))??;

        let dropped = state.normalize();
        if dropped > 0 {
            warn!(
                "Dropped {} pending record(s) that were already notified",
                dropped
            );
        }

        let report = self.reconciler.reconcile(&mut state, &items).await;

        tokio::time::timeout(self.io_timeout, self.store.save(&state))
            .await
            .map_err(|_| Error::timeout(format!("state save exceeded {:?}", self.io_timeout)))??;

        if let Err(e) = self.store.replicate().await {
            warn!("State replication failed, local state is saved: {}", e);
        }

        info!(
            "Run complete: {} sent, {} failed, {} pending, {} pruned",
            report.sent_count(),
            report.failed_count(),
            state.pending().len(),
            report.pruned.len()
        );

        Ok(RunOutcome::Completed(report))
    }
}
