//! Persisted set of already-relayed links.
//!
//! The file is a small JSON object, `{"seen": [...]}`, rewritten in full at the
//! end of every successful run. Order in the list is insertion order and is
//! only used to decide which identifiers to drop when the cap is exceeded.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State file not found: {0}")]
    NotFound(PathBuf),
    #[error("State file I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed state file '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// On-disk shape. Unknown fields are ignored so older or hand-edited files
/// still load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    seen: Vec<String>,
}

/// Identifiers already relayed, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SeenState {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Records `id` as the most recent identifier. Returns `false` if it was
    /// already present (its position is left unchanged).
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.order.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The `max` most recently inserted identifiers, oldest first.
    pub fn most_recent(&self, max: usize) -> &[String] {
        let start = self.order.len().saturating_sub(max);
        &self.order[start..]
    }
}

impl<S: Into<String>> FromIterator<S> for SeenState {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut state = SeenState::new();
        for id in iter {
            state.insert(id);
        }
        state
    }
}

/// Reads and writes [`SeenState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    max_seen: usize,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>, max_seen: usize) -> Self {
        Self {
            path: path.into(),
            max_seen,
        }
    }

    /// `state.json` in the directory containing the running executable.
    pub fn default_path() -> std::io::Result<PathBuf> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_seen(&self) -> usize {
        self.max_seen
    }

    pub fn load(&self) -> Result<SeenState, StateError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let file: StateFile =
            serde_json::from_str(&content).map_err(|source| StateError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        Ok(file.seen.into_iter().collect())
    }

    /// Like [`load`](Self::load), but any failure yields an empty state.
    pub fn load_or_default(&self) -> SeenState {
        match self.load() {
            Ok(state) => {
                tracing::debug!(path = %self.path.display(), seen = state.len(), "Loaded state");
                state
            }
            Err(StateError::NotFound(_)) => {
                tracing::debug!(path = %self.path.display(), "No state file, starting empty");
                SeenState::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable state file, starting empty");
                SeenState::new()
            }
        }
    }

    /// Writes at most `max_seen` of the most recent identifiers.
    ///
    /// The file is replaced via write-to-temp-then-rename so a failed write
    /// never leaves a truncated state file behind.
    pub fn save(&self, state: &SeenState) -> Result<(), StateError> {
        let kept = state.most_recent(self.max_seen);
        let file = StateFile {
            seen: kept.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(StateError::Serialize)?;

        self.write_atomic(json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), kept = kept.len(), "Saved state");
        Ok(())
    }

    fn write_atomic(&self, content: &[u8]) -> Result<(), StateError> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };

        // Unpredictable temp name so nothing can be planted there in advance
        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self.path.with_extension(format!(
            "tmp.{}.{:016x}",
            std::process::id(),
            random_suffix
        ));

        let result = (|| -> std::io::Result<()> {
            write_new_file(&temp_path, content)?;

            // On Windows, rename fails if destination exists
            #[cfg(windows)]
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }

            std::fs::rename(&temp_path, &self.path)
        })();

        // Leave a pre-existing temp path alone; it was not ours
        if matches!(&result, Err(e) if e.kind() != std::io::ErrorKind::AlreadyExists) {
            let _ = std::fs::remove_file(&temp_path);
        }
        result.map_err(io_err)
    }
}

/// Writes `content` to a file that must not exist yet.
///
/// `create_new` fails on an existing path, including a symlink, instead of
/// following and truncating it.
fn write_new_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn store_in(dir: &tempfile::TempDir, max_seen: usize) -> StateStore {
        StateStore::new(dir.path().join(STATE_FILE_NAME), max_seen)
    }

    #[test]
    fn test_insert_ignores_duplicates() {
        let mut state = SeenState::new();
        assert!(state.insert("https://x/1"));
        assert!(state.insert("https://x/2"));
        assert!(!state.insert("https://x/1"));
        assert_eq!(state.len(), 2);
        assert_eq!(state.iter().collect::<Vec<_>>(), vec!["https://x/1", "https://x/2"]);
    }

    #[test]
    fn test_most_recent_keeps_tail() {
        let state: SeenState = (0..5).map(|i| format!("id{}", i)).collect();
        assert_eq!(state.most_recent(2), &["id3".to_string(), "id4".to_string()]);
        assert_eq!(state.most_recent(10).len(), 5);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        assert!(matches!(store.load(), Err(StateError::NotFound(_))));
        assert!(store.load_or_default().is_empty());
    }

    #[test]
    fn test_load_malformed_file_recovers_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load(), Err(StateError::Malformed { .. })));
        assert!(store.load_or_default().is_empty());
    }

    #[test]
    fn test_load_wrong_shape_recovers_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        std::fs::write(store.path(), r#"{"seen": "not-a-list"}"#).unwrap();
        assert!(store.load_or_default().is_empty());
    }

    #[test]
    fn test_load_object_without_seen_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        std::fs::write(store.path(), r#"{"other": 1}"#).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        let state: SeenState = ["https://x/1", "https://x/2"].into_iter().collect();

        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.contains("https://x/1"));
        assert!(loaded.contains("https://x/2"));
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_save_writes_seen_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        let state: SeenState = ["https://x/1"].into_iter().collect();
        store.save(&state).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "seen": ["https://x/1"] }));
    }

    #[test]
    fn test_save_empty_state_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        store.save(&SeenState::new()).unwrap();
        assert!(store.path().exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_truncates_to_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        let state: SeenState = (0..2500).map(|i| format!("https://x/{}", i)).collect();

        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2000);
        assert!(!loaded.contains("https://x/499"));
        assert!(loaded.contains("https://x/500"));
        assert!(loaded.contains("https://x/2499"));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        store.save(&SeenState::new()).unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(STATE_FILE_NAME)]);
    }

    #[test]
    fn test_write_new_file_refuses_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planted");
        std::fs::write(&path, "keep me").unwrap();

        let err = write_new_file(&path, b"overwrite").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_new_file_does_not_follow_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        std::fs::write(&target, "original").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(write_new_file(&link, b"clobbered").is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
    }

    #[test]
    fn test_save_replaces_existing_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 2000);
        std::fs::write(store.path(), r#"{"seen": ["https://x/old"]}"#).unwrap();

        let state: SeenState = ["https://x/new"].into_iter().collect();
        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.iter().collect::<Vec<_>>(), vec!["https://x/new"]);
    }

    #[test]
    fn test_serialize_error_is_not_reported_as_malformed_file() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = StateError::Serialize(source);
        assert!(err.to_string().starts_with("Failed to serialize state"));
        assert!(!err.to_string().contains("Malformed"));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nope").join(STATE_FILE_NAME), 10);
        assert!(matches!(
            store.save(&SeenState::new()),
            Err(StateError::Io { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_saved_state_is_bounded_and_keeps_newest(
            prior in 0usize..300,
            fresh in 0usize..20,
            cap in 1usize..200,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let store = store_in(&dir, cap);

            let mut state: SeenState = (0..prior).map(|i| format!("old{}", i)).collect();
            for i in 0..fresh {
                state.insert(format!("new{}", i));
            }
            store.save(&state).unwrap();

            let loaded = store.load().unwrap();
            prop_assert!(loaded.len() <= cap);
            prop_assert_eq!(loaded.len(), (prior + fresh).min(cap));
            if prior + fresh <= cap {
                for i in 0..fresh {
                    let id = format!("new{}", i);
                    prop_assert!(loaded.contains(&id));
                }
            }
        }
    }
}
