//! Reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Pruning pending records past the retention threshold
//! - Selecting which feed items to evaluate
//! - Querying the StatusOracle for each candidate
//! - Sending a message for public uploads via the Notifier
//! - Recording confirmed deliveries and pending uploads in the state
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   feed snapshot   ┌──────────────┐   state    ┌─────────────┐
//! │ FeedSource  │──────────────────▶│  Reconciler  │◀──────────▶│ StateStore  │
//! └─────────────┘                   └──────────────┘            └─────────────┘
//!                                       │      │
//!                          ┌────────────┘      └────────────┐
//!                          ▼                                ▼
//!                  ┌──────────────┐                 ┌─────────────┐
//!                  │ StatusOracle │                 │  Notifier   │
//!                  │ (check)      │                 │  (send)     │
//!                  └──────────────┘                 └─────────────┘
//! ```
//!
//! ## Delivery Guarantee
//!
//! An id enters the notified set only after `Notifier::send` returned `Ok`.
//! A failed send leaves a `Public` pending record, so the next run retries
//! delivery; a notified id is skipped before the oracle is even queried.

pub mod candidates;
pub mod driver;

pub use candidates::select_candidates;
pub use driver::{RunDriver, RunOutcome};

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, PremierePolicy};
use crate::error::{Error, Result};
use crate::model::{Item, PersistedState, VisibilityStatus};
use crate::traits::{Notifier, StatusOracle};

/// What happened to one candidate during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Delivery was confirmed in an earlier run
    AlreadyNotified { id: String },

    /// Message delivered and id recorded as notified
    Notified { id: String },

    /// Upload is public but the send failed; kept pending for retry
    SendFailed { id: String, error: String },

    /// Upload is not public yet; pending record created or refreshed
    Pending { id: String, status: VisibilityStatus },

    /// Upcoming premiere, neither notified nor tracked
    PremiereSkipped { id: String },
}

impl ItemOutcome {
    /// Id of the item this outcome refers to
    pub fn id(&self) -> &str {
        match self {
            ItemOutcome::AlreadyNotified { id }
            | ItemOutcome::Notified { id }
            | ItemOutcome::SendFailed { id, .. }
            | ItemOutcome::Pending { id, .. }
            | ItemOutcome::PremiereSkipped { id } => id,
        }
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending ids dropped for exceeding the retention threshold
    pub pruned: Vec<String>,

    /// Per-candidate outcomes, in evaluation order
    pub outcomes: Vec<ItemOutcome>,

    /// Items whose message was delivered, in send order
    pub notified: Vec<Item>,
}

impl ReconcileReport {
    /// Number of messages delivered
    pub fn sent_count(&self) -> usize {
        self.notified.len()
    }

    /// Number of failed sends
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ItemOutcome::SendFailed { .. }))
            .count()
    }
}

/// Core reconciliation engine
///
/// Holds the two collaborators with side effects (oracle queries and sends)
/// and the engine settings. State is passed in by the caller so the same
/// engine can be driven by `RunDriver` or embedded directly.
///
/// Every collaborator call runs under a bounded timeout. A timed-out check
/// counts as `VisibilityStatus::Unknown`, a timed-out send as a send failure.
pub struct Reconciler {
    /// Status oracle for visibility checks
    oracle: Box<dyn StatusOracle>,

    /// Notifier for message delivery
    notifier: Box<dyn Notifier>,

    /// Engine settings
    config: EngineConfig,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(
        oracle: Box<dyn StatusOracle>,
        notifier: Box<dyn Notifier>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            oracle,
            notifier,
            config,
        })
    }

    /// Engine settings in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile `state` against `feed` using the current time
    pub async fn reconcile(&self, state: &mut PersistedState, feed: &[Item]) -> ReconcileReport {
        self.reconcile_at(state, feed, Utc::now()).await
    }

    /// Reconcile `state` against `feed` as of `now`
    ///
    /// An empty feed is a no-op: state is left untouched and nothing is sent.
    /// Otherwise expired pending records are pruned first, then each
    /// candidate is evaluated independently; a failure on one item never
    /// prevents the remaining ones from being attempted.
    pub async fn reconcile_at(
        &self,
        state: &mut PersistedState,
        feed: &[Item],
        now: DateTime<Utc>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if feed.is_empty() {
            debug!("Empty feed snapshot, nothing to reconcile");
            return report;
        }

        report.pruned = state.prune_expired(now, self.config.pending_ttl());
        for id in &report.pruned {
            info!(
                "Dropped pending record {} (older than {} days)",
                id, self.config.pending_ttl_days
            );
        }

        let candidates = select_candidates(
            feed,
            state,
            self.config.mode,
            self.config.catch_up_limit,
        );
        debug!(
            "Evaluating {} candidate(s) in {:?} mode",
            candidates.len(),
            self.config.mode
        );

        for item in candidates {
            let outcome = self.evaluate(state, item, now).await;
            if matches!(outcome, ItemOutcome::Notified { .. }) {
                report.notified.push(item.clone());
            }
            report.outcomes.push(outcome);
        }

        report
    }

    /// Evaluate a single candidate and apply its effect to the state
    async fn evaluate(
        &self,
        state: &mut PersistedState,
        item: &Item,
        now: DateTime<Utc>,
    ) -> ItemOutcome {
        let id = item.id.clone();

        if state.is_notified(&item.id) {
            debug!("Item {} already notified, skipping", item.id);
            return ItemOutcome::AlreadyNotified { id };
        }

        let status = self.check_status(&item.id).await;
        info!(item_id = %item.id, %status, "Checked visibility");

        match status {
            VisibilityStatus::PremiereUpcoming => match self.config.premiere_policy {
                PremierePolicy::Skip => {
                    if state.remove_pending(&item.id).is_some() {
                        debug!("Dropped earlier pending record for premiere {}", item.id);
                    }
                    ItemOutcome::PremiereSkipped { id }
                }
                PremierePolicy::TrackPending => {
                    state.upsert_pending(&item.id, status, now);
                    ItemOutcome::Pending { id, status }
                }
            },
            VisibilityStatus::Public => {
                let text = render_message(&self.config.message_template, item);
                match self.deliver(&text).await {
                    Ok(()) => {
                        state.mark_notified(&item.id);
                        info!("Notified {} ({})", item.id, item.title);
                        ItemOutcome::Notified { id }
                    }
                    Err(e) => {
                        warn!(
                            "Failed to notify {}: {}. Keeping it pending for the next run.",
                            item.id, e
                        );
                        state.upsert_pending(&item.id, status, now);
                        ItemOutcome::SendFailed {
                            id,
                            error: e.to_string(),
                        }
                    }
                }
            }
            VisibilityStatus::Private
            | VisibilityStatus::Unlisted
            | VisibilityStatus::NotFound
            | VisibilityStatus::Unknown => {
                state.upsert_pending(&item.id, status, now);
                debug!("Item {} pending (status={})", item.id, status);
                ItemOutcome::Pending { id, status }
            }
        }
    }

    /// Query the oracle under the check timeout
    async fn check_status(&self, item_id: &str) -> VisibilityStatus {
        let budget = Duration::from_secs(self.config.check_timeout_secs);
        match tokio::time::timeout(budget, self.oracle.check(item_id)).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    "Oracle {} timed out after {:?} checking {}",
                    self.oracle.oracle_name(),
                    budget,
                    item_id
                );
                VisibilityStatus::Unknown
            }
        }
    }

    /// Send one message under the send timeout
    async fn deliver(&self, text: &str) -> Result<()> {
        let budget = Duration::from_secs(self.config.send_timeout_secs);
        match tokio::time::timeout(budget, self.notifier.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "{} send exceeded {:?}",
                self.notifier.notifier_name(),
                budget
            ))),
        }
    }
}

/// Render the message text for `item`
///
/// Substitutes `{link}`, `{id}` and `{title}` in that order.
pub fn render_message(template: &str, item: &Item) -> String {
    template
        .replace("{link}", &item.link)
        .replace("{id}", &item.id)
        .replace("{title}", &item.title)
}
