use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// In-page key-value store used when no native host is present.
///
/// Lives as long as the process; it makes no durability promise beyond that.
/// Clones share the same entries.
#[derive(Clone, Default)]
pub struct PageStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl PageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, key: &str, value: &str) -> bool {
        self.lock().insert(key.to_string(), value.to_string());
        true
    }

    #[must_use]
    pub fn load(&self, key: &str) -> String {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn load_all(&self) -> HashMap<String, String> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
