use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Entries kept once a journal is compacted.
const JOURNAL_KEEP: usize = 64;
/// Journals longer than this are compacted on the next write.
const JOURNAL_LIMIT: usize = 256;

/// One committed write to a slot. Revisions increase by one per write and
/// are assigned while the slot's exclusive lock is held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct JournalEntry {
    pub revision: u64,
    pub writer: String,
    pub key: String,
}

/// Identity of one open store, unique across processes sharing a directory.
pub(crate) fn writer_id() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    format!(
        "{}-{}-{nanos:x}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

/// Reads every well-formed entry. A torn trailing line is skipped and picked
/// up on the next read once the append completes.
pub(crate) fn read_entries(path: &Path) -> Result<Vec<JournalEntry>, SessionError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<JournalEntry>(line) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping journal line");
                None
            }
        })
        .collect())
}

pub(crate) fn head_revision(path: &Path) -> Result<u64, SessionError> {
    Ok(read_entries(path)?
        .last()
        .map(|entry| entry.revision)
        .unwrap_or(0))
}

/// Records the next revision for `key`. Callers must hold the slot lock.
pub(crate) fn record(
    path: &Path,
    temp: &Path,
    key: &str,
    writer: &str,
) -> Result<JournalEntry, SessionError> {
    let mut entries = read_entries(path)?;
    let entry = JournalEntry {
        revision: entries.last().map(|last| last.revision).unwrap_or(0) + 1,
        writer: writer.to_owned(),
        key: key.to_owned(),
    };

    if entries.len() < JOURNAL_LIMIT {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        return Ok(entry);
    }

    entries.drain(..entries.len() + 1 - JOURNAL_KEEP);
    entries.push(entry.clone());
    let mut encoded = String::new();
    for kept in &entries {
        encoded.push_str(&serde_json::to_string(kept)?);
        encoded.push('\n');
    }
    fs::write(temp, encoded)?;
    fs::rename(temp, path)?;
    tracing::debug!(path = %path.display(), kept = entries.len(), "compacted session journal");
    Ok(entry)
}
