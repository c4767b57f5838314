use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::bridge::NativeBridge;
use crate::fallback::PageStore;

/// Errors surfaced by storage hosts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors handing a message to the native host.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("native host is not available")]
    Unavailable,

    #[error("native host rejected the message: {0}")]
    Rejected(String),
}

/// Uniform async key-value persistence.
///
/// Operations never fail and never hang: on any problem they resolve to
/// `false`, `""`, an empty map, or nothing.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Persist `value` under `key`; returns whether the write was confirmed.
    async fn save(&self, key: &str, value: &str) -> bool;

    /// Value for `key`, or the empty string when absent.
    async fn load(&self, key: &str) -> String;

    async fn load_all(&self) -> HashMap<String, String>;

    async fn clear(&self);
}

/// Routes each call to the native bridge when the host is available and to
/// the in-page store otherwise.
///
/// The choice is made per call, so a host that appears or disappears at
/// runtime is picked up without rebuilding the adapter.
#[derive(Clone)]
pub struct StorageAdapter {
    native: Option<NativeBridge>,
    fallback: PageStore,
}

impl StorageAdapter {
    #[must_use]
    pub fn new(native: Option<NativeBridge>, fallback: PageStore) -> Self {
        Self { native, fallback }
    }

    /// Adapter with no native host at all (browser/desktop testing).
    #[must_use]
    pub fn in_page() -> Self {
        Self::new(None, PageStore::new())
    }

    #[must_use]
    pub fn with_bridge(bridge: NativeBridge) -> Self {
        Self::new(Some(bridge), PageStore::new())
    }

    #[must_use]
    pub fn fallback(&self) -> &PageStore {
        &self.fallback
    }

    fn bridge(&self) -> Option<&NativeBridge> {
        self.native.as_ref().filter(|bridge| bridge.is_available())
    }
}

#[async_trait]
impl KeyValueStore for StorageAdapter {
    async fn save(&self, key: &str, value: &str) -> bool {
        match self.bridge() {
            Some(bridge) => bridge.save(key, value).await,
            None => self.fallback.save(key, value),
        }
    }

    async fn load(&self, key: &str) -> String {
        match self.bridge() {
            Some(bridge) => bridge.load(key).await,
            None => self.fallback.load(key),
        }
    }

    async fn load_all(&self) -> HashMap<String, String> {
        match self.bridge() {
            Some(bridge) => bridge.load_all().await,
            None => self.fallback.load_all(),
        }
    }

    async fn clear(&self) {
        if let Some(bridge) = self.bridge() {
            if !bridge.clear().await {
                debug!("native clear was not acknowledged");
            }
        }
        self.fallback.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_page_adapter_round_trips() {
        let adapter = StorageAdapter::in_page();
        assert!(adapter.save("yds_quiz_streak", "4").await);
        assert_eq!(adapter.load("yds_quiz_streak").await, "4");
        assert_eq!(adapter.load("missing").await, "");

        let all = adapter.load_all().await;
        assert_eq!(all.len(), 1);

        adapter.clear().await;
        assert!(adapter.load_all().await.is_empty());
    }

    #[test]
    fn adapter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StorageAdapter>();
    }
}
