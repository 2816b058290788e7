// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-known state keyed by entity unique id.
//!
//! The state lives in one document whose fields are `unique_id → value`,
//! the same shape the backing document collection holds. The store assigns
//! an `_id` field on write and strips it on read so callers only ever see
//! entity keys.

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// `unique_id → value`
pub type StateMap = IndexMap<String, Value>;

/// Document identifier field, assigned by the store and never surfaced.
const DOC_ID_FIELD: &str = "_id";
const DOC_ID: &str = "state";

const STATE_FILE: &str = "state.json";
const LOGS_FILE: &str = "logs.jsonl";

/// Errors from state persistence
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("state io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key-value persistence for last-known entity state.
///
/// Opaque to the rest of the core; failures are reported, never fatal.
/// The controller continues with in-memory state.
pub trait StateStore: Send + Sync + 'static {
    fn load_all(&self) -> Result<StateMap, StorageError>;
    fn replace_all(&self, state: &StateMap) -> Result<(), StorageError>;

    /// Archive one bus-wide log message. Optional; defaults to a no-op.
    fn append_log(&self, _entry: &Value) -> Result<(), StorageError> {
        Ok(())
    }
}

/// File-backed store: one JSON state document plus a JSON-lines log archive.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    state_path: PathBuf,
    logs_path: PathBuf,
}

impl DocumentStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;
        Ok(Self { state_path: dir.join(STATE_FILE), logs_path: dir.join(LOGS_FILE) })
    }
}

impl StateStore for DocumentStore {
    fn load_all(&self) -> Result<StateMap, StorageError> {
        let text = match fs::read_to_string(&self.state_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StateMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut doc: IndexMap<String, Value> = serde_json::from_str(&text)?;
        doc.shift_remove(DOC_ID_FIELD);
        Ok(doc)
    }

    fn replace_all(&self, state: &StateMap) -> Result<(), StorageError> {
        let mut doc = state.clone();
        doc.insert(DOC_ID_FIELD.to_string(), Value::String(DOC_ID.to_string()));

        // write-then-rename so a crash never leaves a torn document
        let tmp = self.state_path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&doc)?)?;
        fs::rename(&tmp, &self.state_path)?;
        tracing::trace!(entries = state.len(), "state document replaced");
        Ok(())
    }

    fn append_log(&self, entry: &Value) -> Result<(), StorageError> {
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&self.logs_path)?;
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{StateMap, StateStore, StorageError};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    /// In-memory state store for tests.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryStateStore {
        state: Arc<Mutex<StateMap>>,
        logs: Arc<Mutex<Vec<Value>>>,
    }

    impl MemoryStateStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed the store with pre-existing state.
        pub fn seeded(state: StateMap) -> Self {
            let store = Self::default();
            *store.state.lock() = state;
            store
        }

        /// Archived log entries, in order.
        pub fn logs(&self) -> Vec<Value> {
            self.logs.lock().clone()
        }
    }

    impl StateStore for MemoryStateStore {
        fn load_all(&self) -> Result<StateMap, StorageError> {
            Ok(self.state.lock().clone())
        }

        fn replace_all(&self, state: &StateMap) -> Result<(), StorageError> {
            *self.state.lock() = state.clone();
            Ok(())
        }

        fn append_log(&self, entry: &Value) -> Result<(), StorageError> {
            self.logs.lock().push(entry.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::MemoryStateStore;

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
