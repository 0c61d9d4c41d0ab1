use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Hotspots,
    Fragility,
    Complexity,
    Ownership,
    Quality,
    Commits,
    Timeline,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 7] = [
        Self::Hotspots,
        Self::Fragility,
        Self::Complexity,
        Self::Ownership,
        Self::Quality,
        Self::Commits,
        Self::Timeline,
    ];

    /// Path segment on the service and primary envelope key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hotspots => "hotspots",
            Self::Fragility => "fragility",
            Self::Complexity => "complexity",
            Self::Ownership => "ownership",
            Self::Quality => "quality",
            Self::Commits => "commits",
            Self::Timeline => "timeline",
        }
    }

    /// Secondary envelope keys seen in service responses.
    pub fn envelope_aliases(self) -> &'static [&'static str] {
        match self {
            Self::Hotspots => &["files", "items"],
            Self::Fragility => &["files", "items"],
            Self::Complexity => &["files", "items"],
            Self::Ownership => &["owners", "contributors", "items"],
            Self::Quality => &["findings", "issues", "items"],
            Self::Commits => &["items"],
            Self::Timeline => &["buckets", "series", "items"],
        }
    }
}

impl std::str::FromStr for DatasetKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                format!(
                    "invalid dataset kind '{value}', expected one of: hotspots, fragility, complexity, ownership, quality, commits, timeline"
                )
            })
    }
}

/// A metric row type delivered by one dataset endpoint.
pub trait DatasetRow: DeserializeOwned + Send + 'static {
    const KIND: DatasetKind;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotRow {
    #[serde(alias = "file", alias = "file_path")]
    pub path: String,
    #[serde(default, alias = "commits")]
    pub touches: u64,
    #[serde(default, alias = "lines_changed", alias = "linesChanged")]
    pub churn: u64,
    #[serde(default)]
    pub score: Option<f64>,
}

impl DatasetRow for HotspotRow {
    const KIND: DatasetKind = DatasetKind::Hotspots;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragilityRow {
    #[serde(alias = "file", alias = "file_path")]
    pub path: String,
    #[serde(default, alias = "fragility_index", alias = "fragilityIndex")]
    pub fragility: f64,
    #[serde(default, alias = "recent_commits")]
    pub recent_commits: u64,
    #[serde(default, alias = "bugfix_ratio", alias = "bugFixRatio")]
    pub bugfix_ratio: f64,
}

impl DatasetRow for FragilityRow {
    const KIND: DatasetKind = DatasetKind::Fragility;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityRow {
    #[serde(alias = "file", alias = "file_path")]
    pub path: String,
    #[serde(
        default,
        alias = "max_nesting_depth",
        alias = "nestingDepth",
        alias = "nesting_depth"
    )]
    pub max_nesting_depth: u32,
    #[serde(default, alias = "loc")]
    pub lines: u64,
    #[serde(default, alias = "function_count", alias = "functionCount")]
    pub functions: u64,
}

impl DatasetRow for ComplexityRow {
    const KIND: DatasetKind = DatasetKind::Complexity;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRow {
    #[serde(alias = "file", alias = "file_path")]
    pub path: String,
    #[serde(alias = "author")]
    pub contributor: String,
    #[serde(default, alias = "contribution_share", alias = "contributionShare")]
    pub share: f64,
    #[serde(default)]
    pub commits: u64,
}

impl DatasetRow for OwnershipRow {
    const KIND: DatasetKind = DatasetKind::Ownership;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd, Default,
)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Info,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            Self::Info => 0.0,
            Self::Low => 1.0,
            Self::Medium => 2.0,
            Self::High => 3.0,
            Self::Critical => 4.0,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" | "blocker" => Self::Critical,
            "high" | "error" | "major" => Self::High,
            "medium" | "warning" | "warn" => Self::Medium,
            "low" | "minor" => Self::Low,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityFinding {
    #[serde(alias = "file", alias = "file_path")]
    pub path: String,
    #[serde(default, alias = "rule_id", alias = "ruleId")]
    pub rule: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub line: Option<u32>,
}

impl DatasetRow for QualityFinding {
    const KIND: DatasetKind = DatasetKind::Quality;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRow {
    #[serde(alias = "hash")]
    pub sha: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub message: String,
    #[serde(
        default,
        alias = "commit_type",
        alias = "commitType",
        alias = "classification"
    )]
    pub category: Option<String>,
    #[serde(default, alias = "committed_at", alias = "date")]
    pub committed_at: Option<String>,
    #[serde(default, alias = "files_changed")]
    pub files_changed: u64,
    #[serde(default)]
    pub insertions: u64,
    #[serde(default)]
    pub deletions: u64,
}

impl DatasetRow for CommitRow {
    const KIND: DatasetKind = DatasetKind::Commits;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBucket {
    #[serde(alias = "period", alias = "date")]
    pub bucket: String,
    #[serde(default)]
    pub commits: u64,
    #[serde(default, alias = "lines_changed", alias = "linesChanged")]
    pub churn: u64,
    #[serde(default, alias = "authors")]
    pub contributors: u64,
}

impl DatasetRow for TimelineBucket {
    const KIND: DatasetKind = DatasetKind::Timeline;
}
