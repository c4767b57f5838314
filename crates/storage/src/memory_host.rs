use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::bridge::{BridgeMessage, BridgeRequest, CallbackRegistry, NativeHost};
use crate::repository::BridgeError;

/// In-process native host, answering immediately from a shared map.
///
/// Tests can take it offline (`set_available(false)`) or make it swallow
/// messages without replying (`set_responsive(false)`).
#[derive(Clone)]
pub struct MemoryHost {
    entries: Arc<Mutex<HashMap<String, String>>>,
    available: Arc<AtomicBool>,
    responsive: Arc<AtomicBool>,
    received: Arc<AtomicUsize>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            responsive: Arc::new(AtomicBool::new(true)),
            received: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_responsive(&self, responsive: bool) {
        self.responsive.store(responsive, Ordering::SeqCst);
    }

    /// Messages posted so far.
    #[must_use]
    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, request: BridgeRequest) -> Value {
        let mut entries = self.lock();
        match request {
            BridgeRequest::Save { key, value } => {
                entries.insert(key, value);
                Value::Bool(true)
            }
            BridgeRequest::Load { key } => {
                Value::String(entries.get(&key).cloned().unwrap_or_default())
            }
            BridgeRequest::LoadAll => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<String, Value>>(),
            ),
            BridgeRequest::Clear => {
                entries.clear();
                Value::Bool(true)
            }
        }
    }
}

impl NativeHost for MemoryHost {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn post_message(
        &self,
        message: BridgeMessage,
        replies: CallbackRegistry,
    ) -> Result<(), BridgeError> {
        if !self.is_available() {
            return Err(BridgeError::Unavailable);
        }
        self.received.fetch_add(1, Ordering::SeqCst);
        if !self.responsive.load(Ordering::SeqCst) {
            return Ok(());
        }

        let reply = self.apply(message.request);
        if let Some(callback) = message.callback {
            replies.invoke(&callback, reply);
        }
        Ok(())
    }
}
