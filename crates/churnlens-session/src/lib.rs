use thiserror::Error;

mod backend;
mod file;
mod journal;
mod memory;
mod store;

pub use backend::{ContextId, KeyValueStore, StorageEvent, StorageListener, WatchId};
pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use store::{SessionListener, SessionStore, Subscription};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage watcher error: {0}")]
    Watch(#[from] notify::Error),
    #[error("failed to lock shared resource: {0}")]
    LockPoisoned(String),
}
