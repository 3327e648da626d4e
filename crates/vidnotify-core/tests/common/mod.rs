//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles record every call so tests can assert on exactly which
//! side effects a run performed.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vidnotify_core::error::{Error, Result};
use vidnotify_core::traits::{FeedSource, Notifier, StateStore, StatusOracle};
use vidnotify_core::{EngineConfig, Item, PersistedState, Reconciler, VisibilityStatus};

/// Build a feed item with a predictable title and link
pub fn item(id: &str) -> Item {
    Item::new(id, format!("Upload {}", id), format!("https://www.youtube.com/watch?v={}", id))
}

/// Build a newest-first feed from ids
pub fn feed(ids: &[&str]) -> Vec<Item> {
    ids.iter().map(|id| item(id)).collect()
}

/// Fixed instant used as "now" in tests
pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap() + chrono::Duration::days(n)
}

/// An oracle answering from a per-id script, `Public` by default
pub struct ScriptedOracle {
    statuses: Arc<Mutex<HashMap<String, VisibilityStatus>>>,
    default: VisibilityStatus,
    delay: Option<Duration>,
    checked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::with_default(VisibilityStatus::Public)
    }

    pub fn with_default(default: VisibilityStatus) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(HashMap::new())),
            default,
            delay: None,
            checked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every check take `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script the status for `id`
    pub fn set(&self, id: &str, status: VisibilityStatus) {
        self.statuses.lock().unwrap().insert(id.to_string(), status);
    }

    /// Ids checked so far, in order
    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }

    /// A second handle sharing script and call log
    pub fn sharing_with(other: &Self) -> Self {
        Self {
            statuses: Arc::clone(&other.statuses),
            default: other.default,
            delay: other.delay,
            checked: Arc::clone(&other.checked),
        }
    }
}

#[async_trait]
impl StatusOracle for ScriptedOracle {
    async fn check(&self, item_id: &str) -> VisibilityStatus {
        self.checked.lock().unwrap().push(item_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.statuses
            .lock()
            .unwrap()
            .get(item_id)
            .copied()
            .unwrap_or(self.default)
    }

    fn oracle_name(&self) -> &'static str {
        "scripted"
    }
}

/// A notifier recording every attempt, failing for scripted texts
pub struct RecordingNotifier {
    attempts: Arc<AtomicUsize>,
    delivered: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    fail_all: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(AtomicUsize::new(0)),
            delivered: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            fail_all: Arc::new(Mutex::new(false)),
        }
    }

    /// Fail every send until reset
    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.lock().unwrap() = fail;
    }

    /// Fail sends whose text ends with the watch link of `id`
    pub fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    /// Stop failing scripted ids
    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Number of send attempts, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Texts of successful sends, in order
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// Ids (by link suffix) of successful sends, in order
    pub fn delivered_ids(&self) -> Vec<String> {
        self.delivered()
            .iter()
            .filter_map(|text| text.rsplit("watch?v=").next().map(str::to_string))
            .collect()
    }

    /// A second handle sharing counters and failure script
    pub fn sharing_with(other: &Self) -> Self {
        Self {
            attempts: Arc::clone(&other.attempts),
            delivered: Arc::clone(&other.delivered),
            failing: Arc::clone(&other.failing),
            fail_all: Arc::clone(&other.fail_all),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if *self.fail_all.lock().unwrap() {
            return Err(Error::notifier("destination unreachable"));
        }
        let scripted_failure = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|id| text.ends_with(&format!("watch?v={}", id)));
        if scripted_failure {
            return Err(Error::notifier("rejected by destination"));
        }

        self.delivered.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A feed source returning a fixed snapshot, or an error
pub struct StaticFeed {
    items: Vec<Item>,
    fail: bool,
    fetches: Arc<AtomicUsize>,
}

impl StaticFeed {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            fail: false,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail: true,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<Vec<Item>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::feed("HTTP 503"))
        } else {
            Ok(self.items.clone())
        }
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// A state store that counts calls and can refuse to save
pub struct FlakyStore {
    state: Arc<Mutex<PersistedState>>,
    loads: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
    fail_save: bool,
}

impl FlakyStore {
    pub fn new(state: PersistedState, fail_save: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            loads: Arc::new(AtomicUsize::new(0)),
            saves: Arc::new(AtomicUsize::new(0)),
            fail_save,
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> PersistedState {
        self.state.lock().unwrap().clone()
    }

    pub fn sharing_with(other: &Self) -> Self {
        Self {
            state: Arc::clone(&other.state),
            loads: Arc::clone(&other.loads),
            saves: Arc::clone(&other.saves),
            fail_save: other.fail_save,
        }
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn load(&self) -> Result<PersistedState> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(Error::state_store("disk full"));
        }
        *self.state.lock().unwrap() = state.clone();
        Ok(())
    }
}

/// Message template that ends with the link, so ids can be recovered
pub fn link_template() -> String {
    "{title}\n{link}".to_string()
}

/// Engine settings used by the contract tests
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        message_template: link_template(),
        ..EngineConfig::default()
    }
}

/// Build a reconciler sharing call logs with the given doubles
pub fn reconciler(
    oracle: &ScriptedOracle,
    notifier: &RecordingNotifier,
    config: EngineConfig,
) -> Reconciler {
    Reconciler::new(
        Box::new(ScriptedOracle::sharing_with(oracle)),
        Box::new(RecordingNotifier::sharing_with(notifier)),
        config,
    )
    .expect("valid engine config")
}
