use std::collections::HashMap;
use std::sync::Mutex;

use crate::SessionError;
use crate::backend::{
    ContextId, KeyValueStore, StorageEvent, StorageListener, WatchId, WatcherRegistry,
};

/// Process-local store. Every `SessionStore` attached to the same instance
/// sees the others' writes as storage events, the way tabs share one browser
/// storage area.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    watchers: WatcherRegistry,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        let entries = self
            .entries
            .lock()
            .map_err(|err| SessionError::LockPoisoned(err.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn modify(
        &self,
        key: &str,
        origin: ContextId,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<Option<String>, SessionError> {
        let written = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|err| SessionError::LockPoisoned(err.to_string()))?;
            let next = apply(entries.get(key).cloned());
            match &next {
                Some(value) => {
                    entries.insert(key.to_owned(), value.clone());
                }
                None => {
                    entries.remove(key);
                }
            }
            next
        };

        self.watchers.emit(&StorageEvent {
            key: key.to_owned(),
            origin,
        });
        Ok(written)
    }

    fn watch(&self, listener: StorageListener) -> Result<WatchId, SessionError> {
        self.watchers.register(listener)
    }

    fn unwatch(&self, id: WatchId) {
        self.watchers.remove(id);
    }
}
