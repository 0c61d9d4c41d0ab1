use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use churnlens_core::{AnalysisSession, SessionPatch};

use crate::SessionError;
use crate::backend::{ContextId, KeyValueStore, StorageEvent, WatchId};

pub type SessionListener = Arc<dyn Fn(&AnalysisSession) + Send + Sync>;

/// The analysis session of one execution context, persisted in a shared
/// key-value slot.
///
/// Writes from this context notify its own listeners directly; writes from
/// other contexts arrive through the backend's storage events. Both paths end
/// in the same listener list, so every change reaches each listener once.
pub struct SessionStore {
    inner: Arc<SessionInner>,
    watch_id: WatchId,
}

struct SessionInner {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    context: ContextId,
    next_listener_id: AtomicU64,
    listeners: Mutex<Vec<(u64, SessionListener)>>,
}

/// Handle returned by [`SessionStore::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    inner: Weak<SessionInner>,
    id: u64,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let inner = Arc::new(SessionInner {
            backend: Arc::clone(&backend),
            key: key.into(),
            context: ContextId::next(),
            next_listener_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        });

        let weak = Arc::downgrade(&inner);
        let watch_id = backend.watch(Arc::new(move |event: &StorageEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if event.key != inner.key || event.origin == inner.context {
                return;
            }
            let session = inner.load();
            inner.notify(&session);
        }))?;

        Ok(Self { inner, watch_id })
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn context(&self) -> ContextId {
        self.inner.context
    }

    /// Current persisted session. A missing, unreadable or malformed slot
    /// yields the default session.
    pub fn load(&self) -> AnalysisSession {
        self.inner.load()
    }

    /// Merges `patch` into the latest persisted session and writes it back in
    /// one atomic step, then notifies every subscriber.
    pub fn update(&self, patch: &SessionPatch) -> Result<AnalysisSession, SessionError> {
        let mut merged = AnalysisSession::default();
        let mut encode_error = None;

        self.inner
            .backend
            .modify(&self.inner.key, self.inner.context, &mut |current| {
                merged = parse_session(&self.inner.key, current.as_deref()).merged(patch);
                match serde_json::to_string(&merged) {
                    Ok(encoded) => Some(encoded),
                    Err(err) => {
                        encode_error = Some(err);
                        current
                    }
                }
            })?;

        if let Some(err) = encode_error {
            return Err(err.into());
        }

        tracing::debug!(
            key = %self.inner.key,
            repository_id = ?merged.repository_id,
            run_id = ?merged.run_id,
            "analysis session updated"
        );
        self.inner.notify(&merged);
        Ok(merged)
    }

    /// Resets the slot to the default session and notifies every subscriber.
    pub fn clear(&self) -> Result<(), SessionError> {
        let cleared = AnalysisSession::default();
        let encoded = serde_json::to_string(&cleared)?;
        self.inner
            .backend
            .modify(&self.inner.key, self.inner.context, &mut |_| {
                Some(encoded.clone())
            })?;

        tracing::debug!(key = %self.inner.key, "analysis session cleared");
        self.inner.notify(&cleared);
        Ok(())
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&AnalysisSession) + Send + Sync + 'static,
    ) -> Result<Subscription, SessionError> {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .map_err(|err| SessionError::LockPoisoned(err.to_string()))?
            .push((id, Arc::new(listener)));

        Ok(Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        })
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.inner.backend.unwatch(self.watch_id);
    }
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut listeners = inner
                .listeners
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl SessionInner {
    fn load(&self) -> AnalysisSession {
        match self.backend.read(&self.key) {
            Ok(raw) => parse_session(&self.key, raw.as_deref()),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to read analysis session");
                AnalysisSession::default()
            }
        }
    }

    fn notify(&self, session: &AnalysisSession) {
        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect::<Vec<_>>(),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "session listeners poisoned");
                return;
            }
        };

        for listener in listeners {
            listener(session);
        }
    }
}

fn parse_session(key: &str, raw: Option<&str>) -> AnalysisSession {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return AnalysisSession::default();
    };

    match serde_json::from_str(raw) {
        Ok(session) => session,
        Err(err) => {
            tracing::debug!(key = %key, error = %err, "ignoring malformed analysis session");
            AnalysisSession::default()
        }
    }
}
