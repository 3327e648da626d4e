// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Purpose
//
// Persists the notified set and the pending records between scheduled runs,
// so an upload is announced once no matter how often the feed is polled.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<name>.tmp`, fsync, then rename over the target
// - Automatic backup: keeps `<name>.backup` of the previously saved state
// - Corruption detection: JSON validation on load
// - Recovery: corrupt file → backup → empty state, each step logged
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "sent": ["dQw4w9WgXcQ"],
//   "pending": {
//     "9bZkp7q19f0": {
//       "first_seen": "2026-01-09T12:00:00Z",
//       "last_seen": "2026-01-10T12:00:00Z",
//       "last_status": "private"
//     }
//   }
// }
// ```
//
// Files written by earlier deployments lack `version` and load unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::model::PersistedState;
use crate::traits::state_store::{StateMirror, StateStore};

/// State file format version
/// Used for future migration if format changes
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use vidnotify_core::state::FileStateStore;
/// use vidnotify_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/vidnotify/state.json").await?;
///
///     let mut state = store.load().await?;
///     state.mark_notified("dQw4w9WgXcQ");
///     store.save(&state).await?;
///
///     Ok(())
/// }
/// ```
pub struct FileStateStore {
    path: PathBuf,
    mirror: Option<Box<dyn StateMirror>>,
}

impl std::fmt::Debug for FileStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStateStore")
            .field("path", &self.path)
            .field("mirror", &self.mirror.as_ref().map(|m| m.mirror_name()))
            .finish()
    }
}

/// Serializable state file format (read side)
#[derive(Debug, Deserialize)]
struct StateFileFormat {
    #[serde(default = "default_version")]
    version: String,
    #[serde(flatten)]
    state: PersistedState,
}

/// Serializable state file format (write side)
#[derive(Serialize)]
struct StateFileRef<'a> {
    version: &'a str,
    #[serde(flatten)]
    state: &'a PersistedState,
}

fn default_version() -> String {
    STATE_FILE_VERSION.to_string()
}

/// Why a state file could not be used
enum LoadFailure {
    /// The bytes are there but are not a valid state document
    Corrupt(String),
    /// The file could not be read at all
    Unreadable(Error),
}

impl FileStateStore {
    /// Create a file state store
    ///
    /// Creates parent directories if needed. Nothing is read until `load`.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self { path, mirror: None })
    }

    /// Attach a secondary mirror, pushed to by `replicate`
    pub fn with_mirror(mut self, mirror: Box<dyn StateMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used for atomic writes
    pub fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Path of the backup file
    pub fn backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone();
        backup.set_extension("backup");
        backup
    }

    /// Load state from file with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Missing main file → empty state
    /// 2. Corrupt main file → backup, if present and valid
    /// 3. Otherwise → empty state
    async fn load_state_with_recovery(&self) -> Result<PersistedState, Error> {
        match Self::load_state(&self.path).await {
            Ok(Some(state)) => {
                tracing::debug!(
                    "Loaded state from {}: {} notified, {} pending",
                    self.path.display(),
                    state.notified().len(),
                    state.pending().len()
                );
                Ok(state)
            }
            Ok(None) => {
                tracing::warn!(
                    "State file {} does not exist. Starting with empty state.",
                    self.path.display()
                );
                Ok(PersistedState::new())
            }
            Err(LoadFailure::Unreadable(e)) => Err(e),
            Err(LoadFailure::Corrupt(reason)) => {
                tracing::warn!(
                    "State file appears corrupted: {}. Attempting recovery from backup.",
                    reason
                );

                let backup_path = self.backup_path();
                match Self::load_state(&backup_path).await {
                    Ok(Some(state)) => {
                        tracing::info!(
                            "Recovered state from backup: {} notified, {} pending",
                            state.notified().len(),
                            state.pending().len()
                        );
                        Ok(state)
                    }
                    Ok(None) => {
                        tracing::warn!("No backup file found. Starting with empty state.");
                        Ok(PersistedState::new())
                    }
                    Err(LoadFailure::Corrupt(backup_reason)) => {
                        tracing::warn!(
                            "Backup also corrupted: {}. Starting with empty state.",
                            backup_reason
                        );
                        Ok(PersistedState::new())
                    }
                    Err(LoadFailure::Unreadable(e)) => {
                        tracing::warn!(
                            "Backup unreadable: {}. Starting with empty state.",
                            e
                        );
                        Ok(PersistedState::new())
                    }
                }
            }
        }
    }

    /// Load state from one file; `Ok(None)` when it does not exist
    async fn load_state(path: &Path) -> Result<Option<PersistedState>, LoadFailure> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LoadFailure::Unreadable(Error::state_store(format!(
                    "Failed to read state file {}: {}",
                    path.display(),
                    e
                ))));
            }
        };

        let state_file: StateFileFormat = serde_json::from_slice(&bytes).map_err(|e| {
            LoadFailure::Corrupt(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(Some(state_file.state))
    }

    /// Write state to file atomically
    async fn write_state(&self, state: &PersistedState) -> Result<(), Error> {
        let state_file = StateFileRef {
            version: STATE_FILE_VERSION,
            state,
        };

        let json = serde_json::to_string_pretty(&state_file)?;

        let temp_path = self.temp_path();
        if let Err(e) = Self::write_temp(&temp_path, json.as_bytes()).await {
            if let Err(cleanup_err) = fs::remove_file(&temp_path).await {
                tracing::debug!("Could not remove temp file: {}", cleanup_err);
            }
            return Err(e);
        }

        // Keep the previous state as backup (if it exists)
        if self.path.exists() {
            let backup_path = self.backup_path();
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        // Atomic rename (temp -> actual)
        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::info!("State saved to {}", self.path.display());
        Ok(())
    }

    /// Write and fsync the temporary file
    async fn write_temp(temp_path: &Path, bytes: &[u8]) -> Result<(), Error> {
        let mut file = fs::File::create(temp_path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(bytes).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::state_store(format!(
                "Failed to flush temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            Error::state_store(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<PersistedState, Error> {
        self.load_state_with_recovery().await
    }

    async fn save(&self, state: &PersistedState) -> Result<(), Error> {
        self.write_state(state).await
    }

    async fn replicate(&self) -> Result<(), Error> {
        let Some(mirror) = &self.mirror else {
            return Ok(());
        };
        mirror.mirror(&self.path).await?;
        tracing::debug!("State mirrored via {}", mirror.mirror_name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VisibilityStatus;
    use chrono::Utc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn sample_state(id: &str) -> PersistedState {
        let mut state = PersistedState::new();
        state.mark_notified(id);
        state.upsert_pending("waiting", VisibilityStatus::Private, Utc::now());
        state
    }

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::new(&path).await.unwrap();

        // Initially empty
        let state = store.load().await.unwrap();
        assert!(state.is_empty());

        let state = sample_state("abc");
        store.save(&state).await.unwrap();
        assert!(path.exists());
        assert!(!store.temp_path().exists());

        // Load new instance and verify persistence
        let store2 = FileStateStore::new(&path).await.unwrap();
        assert_eq!(store2.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.json");

        let store = FileStateStore::new(&path).await.unwrap();
        store.save(&sample_state("abc")).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::new(&path).await.unwrap();
        let first = sample_state("first");
        store.save(&first).await.unwrap();

        // Second write moves the first state into the backup
        store.save(&sample_state("second")).await.unwrap();
        assert!(store.backup_path().exists(), "Backup file should exist after write");

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = store.load().await.unwrap();
        assert_eq!(recovered, first, "Backup should contain previous state, not latest");
    }

    #[tokio::test]
    async fn test_file_store_corrupt_without_backup_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{\"sent\": [1, 2").await.unwrap();

        let store = FileStateStore::new(&path).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_reads_legacy_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_video.json");
        fs::write(
            &path,
            r#"{"sent": ["abc"], "pending": {"def": {"first_seen": "2026-01-01T00:00:00Z", "last_seen": "2026-01-02T00:00:00Z", "last_status": "error"}}}"#,
        )
        .await
        .unwrap();

        let store = FileStateStore::new(&path).await.unwrap();
        let state = store.load().await.unwrap();
        assert!(state.is_notified("abc"));
        assert_eq!(
            state.pending_record("def").unwrap().last_status,
            VisibilityStatus::Unknown
        );
    }

    #[tokio::test]
    async fn test_file_store_keeps_sent_when_a_pending_entry_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_video.json");
        fs::write(
            &path,
            r#"{"sent": ["abc", "xyz"], "pending": {"def": {"first_seen": "2026-01-01T00:00:00Z", "last_seen": "2026-01-02T00:00:00Z", "last_status": "private"}, "ghi": {"last_seen": "2026-01-02T00:00:00Z", "last_status": "private"}}}"#,
        )
        .await
        .unwrap();

        let store = FileStateStore::new(&path).await.unwrap();
        let state = store.load().await.unwrap();
        assert!(state.is_notified("abc"));
        assert!(state.is_notified("xyz"));
        assert!(state.pending_record("def").is_some());
        assert!(state.pending_record("ghi").is_none());
    }

    struct CountingMirror {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl StateMirror for CountingMirror {
        async fn mirror(&self, path: &Path) -> Result<(), Error> {
            assert!(path.exists(), "mirror must run after the local write");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::mirror("remote rejected push"))
            } else {
                Ok(())
            }
        }

        fn mirror_name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_save_does_not_touch_mirror() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let calls = Arc::new(AtomicUsize::new(0));

        let store = FileStateStore::new(&path)
            .await
            .unwrap()
            .with_mirror(Box::new(CountingMirror {
                calls: Arc::clone(&calls),
                fail: false,
            }));

        store.save(&sample_state("abc")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.replicate().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mirror_failure_leaves_local_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let calls = Arc::new(AtomicUsize::new(0));

        let store = FileStateStore::new(&path)
            .await
            .unwrap()
            .with_mirror(Box::new(CountingMirror {
                calls: Arc::clone(&calls),
                fail: true,
            }));

        let state = sample_state("abc");
        store.save(&state).await.unwrap();
        assert!(store.replicate().await.is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_replicate_without_mirror_is_noop() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json")).await.unwrap();
        assert!(store.replicate().await.is_ok());
    }
}
