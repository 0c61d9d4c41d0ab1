use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fs2::FileExt;
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};

use crate::SessionError;
use crate::backend::{
    ContextId, KeyValueStore, StorageEvent, StorageListener, WatchId, WatcherRegistry,
};
use crate::journal;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const VALUE_EXTENSION: &str = "json";
const LOCK_EXTENSION: &str = "lock";
const JOURNAL_EXTENSION: &str = "journal";

/// Directory-backed store shared between processes: one `<key>.json` file per
/// key, writes serialized through an exclusive `<key>.lock`. Every write also
/// appends a revision tagged with this store's writer id to `<key>.journal`.
/// A poll watcher raises one [`ContextId::EXTERNAL`] event per revision
/// written by any other store.
pub struct FileKeyValueStore {
    shared: Arc<FileShared>,
    poll_interval: Duration,
    watcher: Mutex<Option<PollWatcher>>,
}

struct FileShared {
    dir: PathBuf,
    writer: String,
    watchers: WatcherRegistry,
    /// Highest journal revision already handled per file stem.
    seen: Mutex<HashMap<String, u64>>,
}

impl FileKeyValueStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SessionError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            shared: Arc::new(FileShared {
                dir,
                writer: journal::writer_id(),
                watchers: WatcherRegistry::default(),
                seen: Mutex::new(HashMap::new()),
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
            watcher: Mutex::new(None),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.shared.dir
    }

    fn ensure_watcher(&self) -> Result<(), SessionError> {
        let mut slot = self
            .watcher
            .lock()
            .map_err(|err| SessionError::LockPoisoned(err.to_string()))?;
        if slot.is_some() {
            return Ok(());
        }
        self.shared.mark_existing_revisions_seen()?;

        let shared = Arc::clone(&self.shared);
        let mut watcher = PollWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => shared.handle_fs_event(&event),
                Err(err) => tracing::warn!(error = %err, "session store watch error"),
            },
            Config::default()
                .with_poll_interval(self.poll_interval)
                .with_compare_contents(true),
        )?;
        watcher.watch(&self.shared.dir, RecursiveMode::NonRecursive)?;

        *slot = Some(watcher);
        Ok(())
    }
}

impl FileShared {
    fn value_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{VALUE_EXTENSION}"))
    }

    fn lock_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{LOCK_EXTENSION}"))
    }

    fn journal_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{JOURNAL_EXTENSION}"))
    }

    fn temp_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.dir.join(format!(".{stem}.{extension}.tmp"))
    }

    /// History written before watching starts is not replayed.
    fn mark_existing_revisions_seen(&self) -> Result<(), SessionError> {
        let mut heads = HashMap::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(stem) = journal_stem(&path) {
                heads.insert(stem.to_owned(), journal::head_revision(&path)?);
            }
        }

        let mut seen = self
            .seen
            .lock()
            .map_err(|err| SessionError::LockPoisoned(err.to_string()))?;
        for (stem, head) in heads {
            let last = seen.entry(stem).or_insert(0);
            *last = (*last).max(head);
        }
        Ok(())
    }

    fn read_stem(&self, stem: &str) -> Result<Option<String>, SessionError> {
        match fs::read_to_string(self.value_path(stem)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_stem(&self, stem: &str, value: Option<&str>) -> Result<(), SessionError> {
        match value {
            Some(value) => {
                let temp = self.temp_path(stem, VALUE_EXTENSION);
                fs::write(&temp, value)?;
                fs::rename(&temp, self.value_path(stem))?;
            }
            None => match fs::remove_file(self.value_path(stem)) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            },
        }
        Ok(())
    }

    fn handle_fs_event(&self, event: &Event) {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }

        for path in &event.paths {
            let Some(stem) = journal_stem(path) else {
                continue;
            };

            let entries = match journal::read_entries(path) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to read session journal");
                    continue;
                }
            };

            let fresh = {
                let Ok(mut seen) = self.seen.lock() else {
                    tracing::warn!("session journal state poisoned");
                    return;
                };
                let last = seen.get(stem).copied().unwrap_or(0);
                let fresh = entries
                    .into_iter()
                    .filter(|entry| entry.revision > last)
                    .collect::<Vec<_>>();
                if let Some(newest) = fresh.last() {
                    seen.insert(stem.to_owned(), newest.revision);
                }
                fresh
            };

            for entry in fresh.into_iter().filter(|entry| entry.writer != self.writer) {
                tracing::debug!(
                    key = %entry.key,
                    revision = entry.revision,
                    writer = %entry.writer,
                    "session slot changed by another store"
                );
                self.watchers.emit(&StorageEvent {
                    key: entry.key,
                    origin: ContextId::EXTERNAL,
                });
            }
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.shared.read_stem(&file_stem_for_key(key))
    }

    fn modify(
        &self,
        key: &str,
        origin: ContextId,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<Option<String>, SessionError> {
        let stem = file_stem_for_key(key);
        let lock_file = open_lock_file(&self.shared.lock_path(&stem))?;
        lock_file.lock_exclusive()?;

        let outcome = (|| {
            let next = apply(self.shared.read_stem(&stem)?);
            self.shared.write_stem(&stem, next.as_deref())?;
            journal::record(
                &self.shared.journal_path(&stem),
                &self.shared.temp_path(&stem, JOURNAL_EXTENSION),
                key,
                &self.shared.writer,
            )?;
            Ok::<_, SessionError>(next)
        })();

        if let Err(err) = FileExt::unlock(&lock_file) {
            tracing::warn!(key = %key, error = %err, "failed to release session lock");
        }
        let written = outcome?;

        self.shared.watchers.emit(&StorageEvent {
            key: key.to_owned(),
            origin,
        });
        Ok(written)
    }

    fn watch(&self, listener: StorageListener) -> Result<WatchId, SessionError> {
        let id = self.shared.watchers.register(listener)?;
        if let Err(err) = self.ensure_watcher() {
            self.shared.watchers.remove(id);
            return Err(err);
        }
        Ok(id)
    }

    fn unwatch(&self, id: WatchId) {
        self.shared.watchers.remove(id);
        if self.shared.watchers.is_empty() {
            if let Ok(mut slot) = self.watcher.lock() {
                slot.take();
            }
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File, SessionError> {
    Ok(OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?)
}

fn file_stem_for_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn journal_stem(path: &Path) -> Option<&str> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(JOURNAL_EXTENSION) {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.starts_with('.'))
}
