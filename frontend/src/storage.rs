//! Key/value persistence for the credential and the chat session identifier.

use shared::protocol::{ACCESS_TOKEN_KEY, CHAT_SESSION_ID_KEY};
use std::cell::RefCell;
use std::collections::HashMap;

/// String storage the chat client reads and writes.
pub trait TabStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Browser storage.
///
/// The credential is shared with the login page through `localStorage`; the
/// chat session identifier lives in `sessionStorage` so it survives a reload
/// of this tab but is not shared with other tabs.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    fn backend(key: &str) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        let storage = if key == CHAT_SESSION_ID_KEY {
            window.session_storage()
        } else {
            window.local_storage()
        };
        storage.ok().flatten()
    }
}

impl TabStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::backend(key).and_then(|storage| storage.get_item(key).ok().flatten())
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = Self::backend(key) {
            if storage.set_item(key, value).is_err() {
                log::warn!("Failed to persist {}", key);
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::backend(key) {
            let _ = storage.remove_item(key);
        }
    }
}

/// In-memory storage, used by tests and when the browser denies storage access.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let storage = Self::new();
        storage.set(ACCESS_TOKEN_KEY, token);
        storage
    }
}

impl TabStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

/// Read the bearer credential. An empty string counts as absent.
pub fn load_token(storage: &dyn TabStorage) -> Option<String> {
    storage
        .get(ACCESS_TOKEN_KEY)
        .filter(|token| !token.trim().is_empty())
}

pub fn clear_token(storage: &dyn TabStorage) {
    storage.remove(ACCESS_TOKEN_KEY);
}
