//! Injected key-value persistence. The browser build writes through to
//! LocalStorage; tests and native builds use an in-memory map.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

#[cfg(target_arch = "wasm32")]
pub struct LocalStore;

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    fn raw() -> web_sys::Storage {
        use gloo_storage::Storage as _;
        gloo_storage::LocalStorage::raw()
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if Self::raw().set_item(key, value).is_err() {
            tracing::warn!("local storage write failed for {key} (quota?)");
        }
    }

    fn remove(&self, key: &str) {
        let _ = Self::raw().remove_item(key);
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let raw = Self::raw();
        let len = raw.length().unwrap_or(0);
        let mut keys = Vec::new();
        for idx in 0..len {
            if let Ok(Some(key)) = raw.key(idx) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .borrow()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }
}

pub fn default_store() -> Rc<dyn KeyValueStore> {
    #[cfg(target_arch = "wasm32")]
    {
        Rc::new(LocalStore)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Rc::new(MemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        store.set("a", "1");
        assert_eq!(store.get("a"), Some("1".to_string()));
        store.remove("a");
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn prefix_listing_only_matches_prefix() {
        let store = MemoryStore::new();
        store.set("dash.cache.c1.x", "1");
        store.set("dash.cache.c1.y", "2");
        store.set("dash.cache.c2.x", "3");
        store.set("atrio.company", "c1");

        let keys = store.keys_with_prefix("dash.cache.c1.");
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.starts_with("dash.cache.c1.")));
    }
}
