//! Session-scoped key/value storage and the typed handoff store built on it.
//!
//! Entries live for the lifetime of the process ("browser session") only.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use shared::domain::{HandoffRecord, ProjectId};
use thiserror::Error;
use tracing::{debug, warn};

pub const HANDOFF_KEY_PREFIX: &str = "visualizer:";

pub fn handoff_key(id: &ProjectId) -> String {
    format!("{HANDOFF_KEY_PREFIX}{id}")
}

/// Text key/value store with whole-value writes.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
    fn remove_item(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn remove_item(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("failed to serialize handoff record for '{id}': {source}")]
    Serialize {
        id: String,
        source: serde_json::Error,
    },
}

/// Typed view over [`SessionStorage`] keyed by `visualizer:<id>`.
///
/// Records are serialized to JSON and written in one `set_item` call, so a
/// reader sees either the previous record or the new one. Last write wins.
#[derive(Clone)]
pub struct SessionHandoff {
    storage: Arc<dyn SessionStorage>,
}

impl SessionHandoff {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    pub fn write(&self, id: &ProjectId, record: &HandoffRecord) -> Result<(), HandoffError> {
        let text = serde_json::to_string(record).map_err(|source| HandoffError::Serialize {
            id: id.to_string(),
            source,
        })?;
        self.storage.set_item(&handoff_key(id), text);
        debug!(project_id = %id, "wrote handoff record");
        Ok(())
    }

    /// Missing, blank-keyed and unparseable entries all read as `None`.
    pub fn read(&self, id: &ProjectId) -> Option<HandoffRecord> {
        if id.is_empty() {
            return None;
        }

        let raw = self.storage.get_item(&handoff_key(id))?;
        match serde_json::from_str::<HandoffRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(project_id = %id, error = %err, "discarding malformed handoff record");
                None
            }
        }
    }

    pub fn remove(&self, id: &ProjectId) {
        self.storage.remove_item(&handoff_key(id));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
