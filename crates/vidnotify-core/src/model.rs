//! Data model shared by the engine, the collaborators and the state stores
//!
//! `PersistedState` is the sole durable artifact. It holds two disjoint
//! collections: the ids whose delivery was confirmed, and the ids still
//! waiting to become public.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single upload as observed in a feed snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque identifier, unique per channel
    pub id: String,
    /// Upload title
    pub title: String,
    /// Canonical link to the upload
    pub link: String,
}

impl Item {
    /// Create a new item
    pub fn new(id: impl Into<String>, title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            link: link.into(),
        }
    }
}

/// Publication visibility of an upload, as reported by a `StatusOracle`
///
/// Produced fresh for every check. The only place a status outlives one
/// reconciliation pass is `PendingRecord::last_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityStatus {
    /// Generally viewable
    Public,
    /// Private upload
    Private,
    /// Reachable by link only
    Unlisted,
    /// The upload does not exist (or is not visible to the oracle)
    NotFound,
    /// Scheduled premiere or upcoming live stream
    PremiereUpcoming,
    /// The oracle could not tell (network error, bad payload, timeout)
    #[serde(alias = "error")]
    Unknown,
}

impl VisibilityStatus {
    /// Map the structured API `privacyStatus` vocabulary
    pub fn from_privacy_status(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Self::Public,
            "private" => Self::Private,
            "unlisted" => Self::Unlisted,
            _ => Self::Unknown,
        }
    }

    /// Stable lowercase name, matching the on-disk spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
            Self::NotFound => "not_found",
            Self::PremiereUpcoming => "premiere_upcoming",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VisibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping for an upload that has been seen but not yet notified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRecord {
    /// When the upload was first observed as pending
    pub first_seen: DateTime<Utc>,
    /// When the upload was last checked
    pub last_seen: DateTime<Utc>,
    /// Status reported by the last check
    pub last_status: VisibilityStatus,
}

impl PendingRecord {
    /// Create a record first observed at `now`
    pub fn new(status: VisibilityStatus, now: DateTime<Utc>) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            last_status: status,
        }
    }

    /// Whether the record was first seen more than `ttl` before `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.first_seen) > ttl
    }
}

/// The durable record of notified and pending uploads
///
/// Invariant: an id is never in `sent` and `pending` at the same time. All
/// mutators below preserve it; `normalize` restores it for state read from
/// disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    sent: BTreeSet<String>,
    #[serde(default, deserialize_with = "lenient_pending")]
    pending: BTreeMap<String, PendingRecord>,
}

/// Read pending records one at a time, dropping the ones that do not parse
///
/// A record with a missing or malformed timestamp is lost on its own; the
/// notified set and the other records still load.
fn lenient_pending<'de, D>(deserializer: D) -> Result<BTreeMap<String, PendingRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    let mut pending = BTreeMap::new();
    for (id, value) in raw {
        match serde_json::from_value::<PendingRecord>(value) {
            Ok(record) => {
                pending.insert(id, record);
            }
            Err(e) => tracing::warn!("Dropping unreadable pending record {}: {}", id, e),
        }
    }
    Ok(pending)
}

impl PersistedState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids whose delivery was confirmed
    pub fn notified(&self) -> &BTreeSet<String> {
        &self.sent
    }

    /// Uploads still waiting to become public
    pub fn pending(&self) -> &BTreeMap<String, PendingRecord> {
        &self.pending
    }

    /// Pending record for `id`, if any
    pub fn pending_record(&self, id: &str) -> Option<&PendingRecord> {
        self.pending.get(id)
    }

    /// Whether delivery for `id` was already confirmed
    pub fn is_notified(&self, id: &str) -> bool {
        self.sent.contains(id)
    }

    /// True when nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.pending.is_empty()
    }

    /// Record a confirmed delivery, dropping any pending record for `id`
    pub fn mark_notified(&mut self, id: &str) {
        self.pending.remove(id);
        self.sent.insert(id.to_string());
    }

    /// Create or refresh the pending record for `id`
    ///
    /// `first_seen` of an existing record is preserved. Ids that are already
    /// notified are left alone.
    pub fn upsert_pending(&mut self, id: &str, status: VisibilityStatus, now: DateTime<Utc>) {
        if self.sent.contains(id) {
            return;
        }

        self.pending
            .entry(id.to_string())
            .and_modify(|record| {
                record.last_seen = now;
                record.last_status = status;
            })
            .or_insert_with(|| PendingRecord::new(status, now));
    }

    /// Drop the pending record for `id`, returning it
    pub fn remove_pending(&mut self, id: &str) -> Option<PendingRecord> {
        self.pending.remove(id)
    }

    /// Remove every pending record first seen more than `ttl` ago
    ///
    /// Returns the removed ids.
    pub fn prune_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, record)| record.is_expired(now, ttl))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.pending.remove(id);
        }

        expired
    }

    /// Drop pending records whose id is also notified
    ///
    /// Returns how many records were dropped.
    pub fn normalize(&mut self) -> usize {
        let before = self.pending.len();
        let sent = &self.sent;
        self.pending.retain(|id, _| !sent.contains(id));
        before - self.pending.len()
    }
}
