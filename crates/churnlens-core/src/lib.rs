use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod rows;
mod timestamp;

pub use rows::{
    CommitRow, ComplexityRow, DatasetKind, DatasetRow, FragilityRow, HotspotRow, OwnershipRow,
    QualityFinding, Severity, TimelineBucket,
};

pub const FAILED_RUN_FALLBACK_MESSAGE: &str = "Analysis failed without an error message.";

/// Opaque server-issued identifier. The service sends ids either as JSON
/// strings or as integers; both normalize to the textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId")]
pub struct Id(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawId> for Id {
    fn from(value: RawId) -> Self {
        match value {
            RawId::Text(text) => Self(text.trim().to_owned()),
            RawId::Signed(number) => Self(number.to_string()),
            RawId::Unsigned(number) => Self(number.to_string()),
        }
    }
}

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSession {
    #[serde(default, alias = "repository_id")]
    pub repository_id: Option<Id>,
    #[serde(default, alias = "run_id")]
    pub run_id: Option<Id>,
    #[serde(default, alias = "repository_url")]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl AnalysisSession {
    /// The run id only counts when a repository is selected.
    pub fn active_run_id(&self) -> Option<&Id> {
        self.repository_id.as_ref().and(self.run_id.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn merged(mut self, patch: &SessionPatch) -> Self {
        if let Some(value) = &patch.repository_id {
            self.repository_id = value.clone();
        }
        if let Some(value) = &patch.run_id {
            self.run_id = value.clone();
        }
        if let Some(value) = &patch.repository_url {
            self.repository_url = value.clone();
        }
        if let Some(value) = &patch.branch {
            self.branch = value.clone();
        }
        self
    }
}

/// Partial session update. The outer `Option` says whether the field is
/// touched at all, the inner one whether it is set or cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionPatch {
    pub repository_id: Option<Option<Id>>,
    pub run_id: Option<Option<Id>>,
    pub repository_url: Option<Option<String>>,
    pub branch: Option<Option<String>>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository_id(mut self, value: Option<Id>) -> Self {
        self.repository_id = Some(value);
        self
    }

    pub fn run_id(mut self, value: Option<Id>) -> Self {
        self.run_id = Some(value);
        self
    }

    pub fn repository_url(mut self, value: Option<String>) -> Self {
        self.repository_url = Some(value);
        self
    }

    pub fn branch(mut self, value: Option<String>) -> Self {
        self.branch = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" => Ok(Self::Queued),
            "running" | "in_progress" | "started" => Ok(Self::Running),
            "succeeded" | "success" | "completed" | "done" => Ok(Self::Succeeded),
            "failed" | "failure" | "error" => Ok(Self::Failed),
            other => Err(format!(
                "invalid run status '{other}', expected one of: queued, running, succeeded, failed"
            )),
        }
    }
}

impl TryFrom<String> for RunStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRun {
    pub id: Id,
    pub status: RunStatus,
    #[serde(default, alias = "created_at", with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "started_at", with = "timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "completed_at", with = "timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "error_message")]
    pub error_message: Option<String>,
}

impl AnalysisRun {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// User-facing failure text for a failed run, `None` otherwise.
    pub fn failure_message(&self) -> Option<String> {
        if self.status != RunStatus::Failed {
            return None;
        }

        Some(
            self.error_message
                .as_deref()
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .unwrap_or(FAILED_RUN_FALLBACK_MESSAGE)
                .to_owned(),
        )
    }
}

/// Presentation category for run state. Every status, including an absent or
/// unrecognized one, maps to exactly one tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    #[default]
    Idle,
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl StatusTone {
    pub fn from_status(status: Option<RunStatus>) -> Self {
        match status {
            None => Self::Idle,
            Some(RunStatus::Queued) => Self::Queued,
            Some(RunStatus::Running) => Self::Running,
            Some(RunStatus::Succeeded) => Self::Succeeded,
            Some(RunStatus::Failed) => Self::Failed,
        }
    }

    pub fn from_status_str(status: Option<&str>) -> Self {
        Self::from_status(status.and_then(|value| value.parse().ok()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub repository_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_commits: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTicket {
    #[serde(alias = "run_id")]
    pub run_id: Id,
    #[serde(alias = "repository_id")]
    pub repository_id: Id,
}

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}
