use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::SessionError;

/// Identifies one execution context (a view, a tab, a process) attached to a
/// shared store. Events raised by a context carry its id so the context can
/// tell its own writes from everybody else's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Origin of changes noticed at the storage level, e.g. another process.
    pub const EXTERNAL: ContextId = ContextId(0);

    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: ContextId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

pub type StorageListener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Persistent key-value primitive shared by every context.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Atomic read-modify-write of one key. `apply` sees the current value and
    /// returns the replacement; `None` removes the key. Returns what was
    /// written.
    fn modify(
        &self,
        key: &str,
        origin: ContextId,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<Option<String>, SessionError>;

    fn watch(&self, listener: StorageListener) -> Result<WatchId, SessionError>;

    fn unwatch(&self, id: WatchId);
}

#[derive(Default)]
pub(crate) struct WatcherRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(WatchId, StorageListener)>>,
}

impl WatcherRegistry {
    pub(crate) fn register(&self, listener: StorageListener) -> Result<WatchId, SessionError> {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .map_err(|err| SessionError::LockPoisoned(err.to_string()))?
            .push((id, listener));
        Ok(id)
    }

    pub(crate) fn remove(&self, id: WatchId) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners
            .lock()
            .map(|listeners| listeners.is_empty())
            .unwrap_or(true)
    }

    /// Listeners run outside the registry lock so they may watch or unwatch.
    pub(crate) fn emit(&self, event: &StorageEvent) {
        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect::<Vec<_>>(),
            Err(err) => {
                tracing::warn!(error = %err, key = %event.key, "storage watcher registry poisoned");
                return;
            }
        };

        for listener in listeners {
            listener(event);
        }
    }
}
