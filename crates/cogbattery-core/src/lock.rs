//! Completion lock.
//!
//! One marker per (participant, week): absent, then `started`, then
//! `completed`. The marker only ever moves forward.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use anyhow::Result;

/// Key/value persistence for completion markers.
pub trait LockStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockState {
    Started,
    Completed,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Started => "started",
            LockState::Completed => "completed",
        }
    }

    /// Parse a stored marker. Unknown values read as `Started`.
    pub fn parse(value: &str) -> LockState {
        match value {
            "completed" => LockState::Completed,
            "started" => LockState::Started,
            other => {
                tracing::warn!(value = other, "unknown completion lock value");
                LockState::Started
            }
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn lock_key(participant_id: &str, week: u32) -> String {
    format!("testlock_{participant_id}_week_{week}")
}

/// Current marker of (`participant_id`, `week`).
pub fn read_lock(
    store: &dyn LockStore,
    participant_id: &str,
    week: u32,
) -> Result<Option<LockState>> {
    let value = store.get(&lock_key(participant_id, week))?;
    Ok(value.as_deref().map(LockState::parse))
}

/// Move the marker forward to `state`. A request to go backwards is a no-op.
pub fn advance_lock(
    store: &dyn LockStore,
    participant_id: &str,
    week: u32,
    state: LockState,
) -> Result<()> {
    if let Some(current) = read_lock(store, participant_id, week)? {
        if current >= state {
            return Ok(());
        }
    }
    tracing::debug!(participant_id, week, %state, "advancing completion lock");
    store.set(&lock_key(participant_id, week), state.as_str())
}

/// In-process lock store.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().unwrap().clone()
    }
}

impl LockStore for MemoryLockStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        assert_eq!(lock_key("1001", 4), "testlock_1001_week_4");
    }

    #[test]
    fn lock_only_moves_forward() {
        let store = MemoryLockStore::new();
        assert_eq!(read_lock(&store, "7", 1).unwrap(), None);

        advance_lock(&store, "7", 1, LockState::Started).unwrap();
        assert_eq!(read_lock(&store, "7", 1).unwrap(), Some(LockState::Started));

        advance_lock(&store, "7", 1, LockState::Completed).unwrap();
        advance_lock(&store, "7", 1, LockState::Started).unwrap();
        assert_eq!(
            read_lock(&store, "7", 1).unwrap(),
            Some(LockState::Completed)
        );
        assert_eq!(
            store.snapshot().get("testlock_7_week_1").map(String::as_str),
            Some("completed")
        );
    }

    #[test]
    fn weeks_are_independent() {
        let store = MemoryLockStore::new();
        advance_lock(&store, "7", 1, LockState::Completed).unwrap();
        assert_eq!(read_lock(&store, "7", 2).unwrap(), None);
    }

    #[test]
    fn unknown_value_reads_as_started() {
        let store = MemoryLockStore::new();
        store.set("testlock_7_week_1", "garbage").unwrap();
        assert_eq!(read_lock(&store, "7", 1).unwrap(), Some(LockState::Started));
    }
}
