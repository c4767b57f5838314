#![forbid(unsafe_code)]

pub mod bridge;
pub mod fallback;
pub mod memory_host;
pub mod repository;
pub mod sqlite;

pub use bridge::{BridgeMessage, BridgeRequest, CallbackRegistry, NativeBridge, NativeHost};
pub use fallback::PageStore;
pub use memory_host::MemoryHost;
pub use repository::{BridgeError, KeyValueStore, StorageAdapter, StorageError};
pub use sqlite::{SqliteHost, SqliteInitError};
