//! Completion locks persisted to a single JSON object file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

use cogbattery_core::lock::LockStore;

/// Lock store backed by a JSON file of `{ key: value }` entries.
///
/// A missing file reads as empty. Writes go through a temporary file and a
/// rename.
#[derive(Debug)]
pub struct JsonFileLockStore {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonFileLockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read lock file: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse lock file: {}", self.path.display()))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(entries).context("failed to serialize locks")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write lock file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace lock file: {}", self.path.display()))?;
        Ok(())
    }
}

impl LockStore for JsonFileLockStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| anyhow::anyhow!("lock file guard poisoned"))?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogbattery_core::lock::{advance_lock, read_lock, LockState};

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLockStore::new(dir.path().join("locks.json"));
        assert_eq!(store.get("testlock_1_week_1").unwrap(), None);
    }

    #[test]
    fn entries_survive_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("locks.json");

        let store = JsonFileLockStore::new(&path);
        advance_lock(&store, "1001", 2, LockState::Started).unwrap();
        advance_lock(&store, "1001", 2, LockState::Completed).unwrap();
        advance_lock(&store, "1002", 2, LockState::Started).unwrap();

        let reopened = JsonFileLockStore::new(&path);
        assert_eq!(
            read_lock(&reopened, "1001", 2).unwrap(),
            Some(LockState::Completed)
        );
        assert_eq!(
            read_lock(&reopened, "1002", 2).unwrap(),
            Some(LockState::Started)
        );

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["testlock_1001_week_2"], "completed");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locks.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonFileLockStore::new(&path);
        let err = store.get("anything").unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse lock file"));
    }
}
