//! Request/response plumbing to a native key-value host.
//!
//! Every call registers a single-use callback id, posts a message tagged with
//! it, and waits for the host to answer through the [`CallbackRegistry`] or
//! for the bridge timeout, whichever comes first. The registration is removed
//! on every exit path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repository::BridgeError;

/// Correlation id for one bridge round trip.
pub type CallbackId = String;

/// The operation carried by a bridge message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BridgeRequest {
    Save { key: String, value: String },
    Load { key: String },
    LoadAll,
    Clear,
}

impl BridgeRequest {
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            BridgeRequest::Save { .. } => "save",
            BridgeRequest::Load { .. } => "load",
            BridgeRequest::LoadAll => "loadAll",
            BridgeRequest::Clear => "clear",
        }
    }
}

/// Wire shape posted to the host: `{action, key?, value?, callback?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    #[serde(flatten)]
    pub request: BridgeRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<CallbackId>,
}

//
// ─── CALLBACK REGISTRY ─────────────────────────────────────────────────────────
//

/// Pending callbacks keyed by correlation id.
///
/// Hosts answer a message by calling [`CallbackRegistry::invoke`] with the
/// id it carried. Unknown or already-resolved ids are ignored.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    pending: Arc<Mutex<HashMap<CallbackId, oneshot::Sender<Value>>>>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, action: &str) -> (CallbackId, oneshot::Receiver<Value>) {
        let id = format!("native_{}_{}", action.to_lowercase(), Uuid::new_v4().simple());
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id.clone(), tx);
        (id, rx)
    }

    /// Deliver a host reply. Returns `false` if the id is no longer pending.
    pub fn invoke(&self, id: &str, value: Value) -> bool {
        let Some(tx) = self.lock().remove(id) else {
            debug!(callback = id, "reply for unknown or expired callback");
            return false;
        };
        tx.send(value).is_ok()
    }

    fn remove(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Number of registrations still waiting for a reply.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CallbackId, oneshot::Sender<Value>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a registration when the waiting call finishes, however it finishes.
struct PendingCallback<'a> {
    registry: &'a CallbackRegistry,
    id: CallbackId,
}

impl Drop for PendingCallback<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}

//
// ─── HOST ──────────────────────────────────────────────────────────────────────
//

/// The native side of the bridge.
///
/// `post_message` must not block; the host answers later (or never) through
/// `replies`.
pub trait NativeHost: Send + Sync {
    fn is_available(&self) -> bool;

    /// # Errors
    ///
    /// Returns `BridgeError` if the message could not be handed to the host.
    fn post_message(
        &self,
        message: BridgeMessage,
        replies: CallbackRegistry,
    ) -> Result<(), BridgeError>;
}

//
// ─── BRIDGE ────────────────────────────────────────────────────────────────────
//

/// Future-returning client over a [`NativeHost`].
///
/// Every operation resolves within `timeout` to the host's answer or to a
/// safe default (`false`, `""`, empty map).
#[derive(Clone)]
pub struct NativeBridge {
    host: Arc<dyn NativeHost>,
    callbacks: CallbackRegistry,
    timeout: Duration,
}

impl NativeBridge {
    #[must_use]
    pub fn new(host: Arc<dyn NativeHost>, timeout: Duration) -> Self {
        Self {
            host,
            callbacks: CallbackRegistry::new(),
            timeout,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.host.is_available()
    }

    /// Registrations still waiting on the host.
    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.pending()
    }

    pub async fn save(&self, key: &str, value: &str) -> bool {
        let request = BridgeRequest::Save {
            key: key.to_string(),
            value: value.to_string(),
        };
        matches!(self.call(request).await, Some(Value::Bool(true)))
    }

    pub async fn load(&self, key: &str) -> String {
        let request = BridgeRequest::Load {
            key: key.to_string(),
        };
        match self.call(request).await {
            Some(Value::String(text)) => text,
            _ => String::new(),
        }
    }

    pub async fn load_all(&self) -> HashMap<String, String> {
        let Some(Value::Object(entries)) = self.call(BridgeRequest::LoadAll).await else {
            return HashMap::new();
        };
        entries
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(text) => Some((key, text)),
                Value::Null => None,
                other => Some((key, other.to_string())),
            })
            .collect()
    }

    /// Returns whether the host acknowledged the clear.
    pub async fn clear(&self) -> bool {
        matches!(self.call(BridgeRequest::Clear).await, Some(Value::Bool(true)))
    }

    async fn call(&self, request: BridgeRequest) -> Option<Value> {
        let action = request.action();
        let (id, reply) = self.callbacks.register(action);
        let _pending = PendingCallback {
            registry: &self.callbacks,
            id: id.clone(),
        };

        let message = BridgeMessage {
            request,
            callback: Some(id),
        };
        if let Err(err) = self.host.post_message(message, self.callbacks.clone()) {
            warn!(action, error = %err, "posting to native host failed");
            return None;
        }

        match tokio::time::timeout(self.timeout, reply).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) => {
                debug!(action, "native host dropped the callback");
                None
            }
            Err(_) => {
                warn!(action, timeout_ms = self.timeout.as_millis(), "native host did not answer in time");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_serializes_to_flat_wire_shape() {
        let message = BridgeMessage {
            request: BridgeRequest::Save {
                key: "yds_quiz_streak".into(),
                value: "3".into(),
            },
            callback: Some("native_save_1".into()),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "action": "save",
                "key": "yds_quiz_streak",
                "value": "3",
                "callback": "native_save_1"
            })
        );

        let clear = BridgeMessage {
            request: BridgeRequest::Clear,
            callback: None,
        };
        assert_eq!(serde_json::to_value(&clear).unwrap(), json!({"action": "clear"}));

        let parsed: BridgeMessage =
            serde_json::from_value(json!({"action": "loadAll", "callback": "cb"})).unwrap();
        assert_eq!(parsed.request, BridgeRequest::LoadAll);
    }

    #[test]
    fn invoke_is_single_use() {
        let registry = CallbackRegistry::new();
        let (id, mut rx) = registry.register("load");
        assert!(id.starts_with("native_load_"));
        assert_eq!(registry.pending(), 1);

        assert!(registry.invoke(&id, json!("value")));
        assert!(!registry.invoke(&id, json!("again")));
        assert_eq!(registry.pending(), 0);
        assert_eq!(rx.try_recv().unwrap(), json!("value"));
    }
}
