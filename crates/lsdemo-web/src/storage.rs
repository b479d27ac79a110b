#![forbid(unsafe_code)]

//! [`SnapshotStore`] over `window.localStorage`.

use lsdemo_core::persistence::StorageResult;
use lsdemo_core::{SnapshotStore, StorageError};
use wasm_bindgen::JsValue;
use web_sys::Storage;

pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    /// Open the page's local storage. Private browsing modes and sandboxed
    /// iframes may refuse it.
    pub fn open() -> StorageResult<Self> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(describe(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".into()))?;
        Ok(Self { storage })
    }
}

impl SnapshotStore for LocalStore {
    fn name(&self) -> &str {
        "localStorage"
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Backend(describe(&e)))
    }
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
