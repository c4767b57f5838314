use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::warn;

use crate::bridge::{BridgeMessage, BridgeRequest, CallbackRegistry, NativeHost};
use crate::repository::{BridgeError, StorageError};

mod kv_store;
mod migrate;

/// Durable native host keeping the key space in a single `SQLite` table.
#[derive(Clone)]
pub struct SqliteHost {
    pool: SqlitePool,
    available: Arc<AtomicBool>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteHost {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or the
    /// connection pragmas fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self {
            pool,
            available: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Connect and create the schema in one step.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let host = Self::connect(database_url).await?;
        host.migrate().await?;
        Ok(host)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Take the host offline, e.g. while the app is shutting down.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    async fn handle(&self, request: BridgeRequest) -> Result<Value, StorageError> {
        match request {
            BridgeRequest::Save { key, value } => {
                self.put(&key, &value).await?;
                Ok(Value::Bool(true))
            }
            BridgeRequest::Load { key } => {
                Ok(Value::String(self.get(&key).await?.unwrap_or_default()))
            }
            BridgeRequest::LoadAll => {
                let entries = self
                    .entries()
                    .await?
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                Ok(Value::Object(entries))
            }
            BridgeRequest::Clear => {
                self.clear_all().await?;
                Ok(Value::Bool(true))
            }
        }
    }
}

impl NativeHost for SqliteHost {
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
        let runtime = Handle::try_current().map_err(|err| BridgeError::Rejected(err.to_string()))?;
        let host = self.clone();
        runtime.spawn(async move {
            let action = message.request.action();
            let reply = match host.handle(message.request).await {
                Ok(value) => value,
                Err(err) => {
                    warn!(action, error = %err, "sqlite host failed to serve request");
                    failure_reply(action)
                }
            };
            if let Some(callback) = message.callback {
                replies.invoke(&callback, reply);
            }
        });
        Ok(())
    }
}

/// The reply a failed request resolves to on the page side.
fn failure_reply(action: &str) -> Value {
    match action {
        "load" => Value::String(String::new()),
        "loadAll" => Value::Object(serde_json::Map::new()),
        _ => Value::Bool(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteHost>();
    }

    #[test]
    fn failure_replies_match_safe_defaults() {
        assert_eq!(failure_reply("save"), Value::Bool(false));
        assert_eq!(failure_reply("load"), Value::String(String::new()));
        assert!(failure_reply("loadAll").as_object().unwrap().is_empty());
    }
}
