//! Fixtures shared by unit and HTTP tests

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;

use crate::modules::datastore::{Db, Document, Fields, MemoryStore, Pointer};
use crate::shared::constants::CATEGORY_CLASS;

pub fn test_db(store: Arc<MemoryStore>) -> Db {
    Db::new(store)
}

/// Insert a category under a fixed id
pub async fn seed_category(
    store: &MemoryStore,
    id: &str,
    name: &str,
    parent: Option<&str>,
    order: Option<i64>,
) -> Document {
    let mut fields = Fields::new();
    fields.insert("name".into(), json!(name));
    if let Some(parent) = parent {
        fields.insert(
            "parent".into(),
            Pointer::new(CATEGORY_CLASS, parent).to_value(),
        );
    }
    if let Some(order) = order {
        fields.insert("order".into(), json!(order));
    }
    store.insert_with_id(CATEGORY_CLASS, id, fields).await
}

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that touch process environment variables
///
/// Every variable changed through the guard is restored when it drops.
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    pub fn lock() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Self {
            saved: Vec::new(),
            _lock: lock,
        }
    }

    fn remember(&mut self, key: &str) {
        if !self.saved.iter().any(|(k, _)| k == key) {
            self.saved.push((key.to_string(), std::env::var(key).ok()));
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.remember(key);
        std::env::set_var(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.remember(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}
