//! Editor snapshot persistence.
//!
//! A single flat record is kept under one fixed key of a host key-value store
//! (`window.localStorage` in the browser):
//!
//! ```json
//! { "schema": "lsdemo-editor-v1", "viewState": { ... }, "content": "..." }
//! ```
//!
//! `viewState` is opaque editor state and is stored as-is.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Unavailable` | store disabled or missing | Returns error, nothing written |
//! | `StorageError::Backend` | store rejected the operation (quota) | Returns error |
//! | Corrupt or foreign record | hand edits, other app | `load` yields `None`, logged |
//! | Schema mismatch | older harness version | `load` yields `None`, logged |

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema tag written into every snapshot.
pub const SNAPSHOT_SCHEMA: &str = "lsdemo-editor-v1";

/// Errors that can occur during snapshot storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The store cannot be used at all.
    Unavailable(String),
    /// Snapshot encoding failed.
    Serialization(String),
    /// The store rejected a read or write.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A string key-value store shaped like `localStorage`.
pub trait SnapshotStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// In-memory store for tests and hosts without storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        "MemoryStore"
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Saved editor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub schema: String,
    #[serde(rename = "viewState", default)]
    pub view_state: Value,
    pub content: String,
}

impl EditorSnapshot {
    /// Snapshot of `content` with the current schema tag.
    #[must_use]
    pub fn new(content: impl Into<String>, view_state: Value) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA.to_string(),
            view_state,
            content: content.into(),
        }
    }

    /// Write the snapshot under `key`, replacing any previous one.
    pub fn save(&self, store: &dyn SnapshotStore, key: &str) -> StorageResult<()> {
        let encoded =
            serde_json::to_string(self).map_err(|e| StorageError::Serialization(e.to_string()))?;
        store.set_item(key, &encoded)?;
        tracing::debug!(store = store.name(), key, bytes = encoded.len(), "saved editor snapshot");
        Ok(())
    }

    /// Read the snapshot under `key`.
    ///
    /// Missing, unreadable or foreign-schema records all yield `Ok(None)`;
    /// only store failures are errors.
    pub fn load(store: &dyn SnapshotStore, key: &str) -> StorageResult<Option<Self>> {
        let Some(raw) = store.get_item(key)? else {
            return Ok(None);
        };
        let snapshot: Self = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable editor snapshot");
                return Ok(None);
            }
        };
        if snapshot.schema != SNAPSHOT_SCHEMA {
            tracing::warn!(
                key,
                stored = %snapshot.schema,
                expected = SNAPSHOT_SCHEMA,
                "editor snapshot schema mismatch, ignoring stored state"
            );
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Forget the snapshot under `key`.
    pub fn clear(store: &dyn SnapshotStore, key: &str) -> StorageResult<()> {
        store.remove_item(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const KEY: &str = "shader-editor";

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let snapshot = EditorSnapshot::new("void main() {}", json!({"cursor": [3, 4]}));
        snapshot.save(&store, KEY).unwrap();
        assert_eq!(EditorSnapshot::load(&store, KEY).unwrap(), Some(snapshot));
        EditorSnapshot::clear(&store, KEY).unwrap();
        assert_eq!(EditorSnapshot::load(&store, KEY).unwrap(), None);
    }

    #[test]
    fn stored_layout_uses_view_state_camel_case() {
        let store = MemoryStore::new();
        EditorSnapshot::new("x", Value::Null).save(&store, KEY).unwrap();
        let raw: Value = serde_json::from_str(&store.get_item(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(
            raw,
            json!({"schema": SNAPSHOT_SCHEMA, "viewState": null, "content": "x"})
        );
    }

    #[test]
    fn missing_record_is_none() {
        assert_eq!(EditorSnapshot::load(&MemoryStore::new(), KEY).unwrap(), None);
    }

    #[test]
    fn foreign_schema_is_ignored() {
        let store = MemoryStore::new();
        store
            .set_item(KEY, r#"{"schema": "7", "viewState": {}, "content": "old"}"#)
            .unwrap();
        assert_eq!(EditorSnapshot::load(&store, KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_record_is_ignored() {
        let store = MemoryStore::new();
        store.set_item(KEY, "{not json").unwrap();
        assert_eq!(EditorSnapshot::load(&store, KEY).unwrap(), None);
    }

    #[test]
    fn store_failure_propagates() {
        struct Broken;
        impl SnapshotStore for Broken {
            fn name(&self) -> &str {
                "Broken"
            }
            fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
                Err(StorageError::Unavailable("disabled".into()))
            }
            fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
                Err(StorageError::Backend("quota".into()))
            }
            fn remove_item(&self, _key: &str) -> StorageResult<()> {
                Ok(())
            }
        }
        assert!(EditorSnapshot::load(&Broken, KEY).is_err());
        assert_eq!(
            EditorSnapshot::new("x", Value::Null).save(&Broken, KEY),
            Err(StorageError::Backend("quota".into()))
        );
    }
}
