use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::model::{Category, Tag, Task};

pub const STORAGE_KEY: &str = "protodo-storage";
pub const VERSION_KEY: &str = "protodo-version";
pub const THEME_KEY: &str = "protodo-theme";
pub const STORAGE_VERSION: &str = "v2";

/// The persisted subset of store state. Filter and search are transient and
/// never written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub todos: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// File-per-key slot directory. Each slot is one whole value, rewritten
/// atomically on every save.
#[derive(Debug)]
pub struct SlotStore {
    pub data_dir: PathBuf,
}

impl SlotStore {
    /// Opens the slot directory and runs the version check: on mismatch the
    /// storage and theme slots are wiped before anything is read, then the
    /// version slot is rewritten to the current tag.
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let store = Self {
            data_dir: data_dir.to_path_buf(),
        };

        let found = store.read_slot(VERSION_KEY)?;
        if found.as_deref() != Some(STORAGE_VERSION) {
            info!(
                found = found.as_deref().unwrap_or("none"),
                expected = STORAGE_VERSION,
                "storage version mismatch, clearing persisted slots"
            );
            store.remove_slot(STORAGE_KEY)?;
            store.remove_slot(THEME_KEY)?;
            store.write_slot(VERSION_KEY, STORAGE_VERSION)?;
        }

        info!(data_dir = %store.data_dir.display(), "opened slot store");
        Ok(store)
    }

    /// Absent slot loads as `None`; a malformed slot is logged and also
    /// treated as absent rather than aborting startup.
    #[tracing::instrument(skip(self))]
    pub fn load_state(&self) -> anyhow::Result<Option<PersistedState>> {
        let Some(raw) = self.read_slot(STORAGE_KEY)? else {
            debug!("no persisted state slot");
            return Ok(None);
        };

        match serde_json::from_str::<PersistedState>(&raw) {
            Ok(state) => {
                debug!(
                    todos = state.todos.len(),
                    categories = state.categories.len(),
                    tags = state.tags.len(),
                    "loaded persisted state"
                );
                Ok(Some(state))
            }
            Err(err) => {
                warn!(error = %err, "persisted state slot is malformed, starting fresh");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self, state))]
    pub fn save_state(&self, state: &PersistedState) -> anyhow::Result<()> {
        let serialized =
            serde_json::to_string_pretty(state).context("failed serializing persisted state")?;
        self.write_slot(STORAGE_KEY, &serialized)
    }

    pub fn read_slot(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.slot_path(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed reading slot {}", path.display()))
            }
        }
    }

    pub fn write_slot(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.slot_path(key);
        debug!(slot = key, bytes = value.len(), "writing slot atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    pub fn remove_slot(&self, key: &str) -> anyhow::Result<()> {
        let path = self.slot_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed removing slot {}", path.display()))
            }
        }
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(key)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use tempfile::tempdir;

    use super::{
        PersistedState, STORAGE_KEY, STORAGE_VERSION, SlotStore, THEME_KEY, VERSION_KEY,
    };
    use crate::model::{NewTask, Task, default_categories, default_tags};

    #[test]
    fn state_round_trips_across_reopen() {
        let temp = tempdir().expect("tempdir");
        let store = SlotStore::open(temp.path()).expect("open slots");

        let state = PersistedState {
            todos: vec![Task::new(NewTask::new("persist me"), 0, Utc::now())],
            categories: default_categories(),
            tags: default_tags(),
        };
        store.save_state(&state).expect("save state");

        let reopened = SlotStore::open(temp.path()).expect("reopen slots");
        let loaded = reopened
            .load_state()
            .expect("load state")
            .expect("state present");
        assert_eq!(loaded.todos, state.todos);
        assert_eq!(loaded.categories, state.categories);
        assert_eq!(loaded.tags, state.tags);
    }

    #[test]
    fn version_mismatch_wipes_storage_and_theme() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join(STORAGE_KEY), "{\"todos\": []}").expect("seed storage");
        fs::write(temp.path().join(THEME_KEY), "dark").expect("seed theme");
        fs::write(temp.path().join(VERSION_KEY), "v1").expect("seed version");

        let store = SlotStore::open(temp.path()).expect("open slots");

        assert!(store.load_state().expect("load state").is_none());
        assert!(!temp.path().join(THEME_KEY).exists());
        assert_eq!(
            store
                .read_slot(VERSION_KEY)
                .expect("read version")
                .as_deref(),
            Some(STORAGE_VERSION)
        );
    }

    #[test]
    fn matching_version_leaves_slots_alone() {
        let temp = tempdir().expect("tempdir");
        let store = SlotStore::open(temp.path()).expect("open slots");
        store
            .save_state(&PersistedState::default())
            .expect("save state");
        store.write_slot(THEME_KEY, "dark").expect("write theme");

        let reopened = SlotStore::open(temp.path()).expect("reopen slots");
        assert!(reopened.load_state().expect("load state").is_some());
        assert_eq!(
            reopened.read_slot(THEME_KEY).expect("read theme").as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn malformed_state_slot_loads_as_fresh() {
        let temp = tempdir().expect("tempdir");
        let store = SlotStore::open(temp.path()).expect("open slots");
        store
            .write_slot(STORAGE_KEY, "{definitely not json")
            .expect("write slot");

        assert!(store.load_state().expect("load state").is_none());
    }
}
