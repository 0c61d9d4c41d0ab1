use churnlens_core::CommitRow;
use serde::{Deserialize, Serialize};

use crate::bands::percent;

/// Commit classification shared by every commit view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitCategory {
    Feat,
    Fix,
    Refactor,
    Perf,
    Docs,
    Test,
    Style,
    Build,
    Ci,
    Chore,
    Revert,
    Unknown,
}

impl CommitCategory {
    pub const ALL: [CommitCategory; 12] = [
        Self::Feat,
        Self::Fix,
        Self::Refactor,
        Self::Perf,
        Self::Docs,
        Self::Test,
        Self::Style,
        Self::Build,
        Self::Ci,
        Self::Chore,
        Self::Revert,
        Self::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Refactor => "refactor",
            Self::Perf => "perf",
            Self::Docs => "docs",
            Self::Test => "test",
            Self::Style => "style",
            Self::Build => "build",
            Self::Ci => "ci",
            Self::Chore => "chore",
            Self::Revert => "revert",
            Self::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Feat => "Features",
            Self::Fix => "Bug fixes",
            Self::Refactor => "Refactoring",
            Self::Perf => "Performance",
            Self::Docs => "Documentation",
            Self::Test => "Tests",
            Self::Style => "Style",
            Self::Build => "Build & dependencies",
            Self::Ci => "CI",
            Self::Chore => "Chores",
            Self::Revert => "Reverts",
            Self::Unknown => "Unclassified",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Feat => "#22c55e",
            Self::Fix => "#ef4444",
            Self::Refactor => "#8b5cf6",
            Self::Perf => "#f97316",
            Self::Docs => "#3b82f6",
            Self::Test => "#eab308",
            Self::Style => "#ec4899",
            Self::Build => "#14b8a6",
            Self::Ci => "#06b6d4",
            Self::Chore => "#64748b",
            Self::Revert => "#a855f7",
            Self::Unknown => "#9ca3af",
        }
    }

    /// Canonical names plus the synonyms seen in stored classifications and
    /// commit prefixes. `unknown` matches nothing.
    pub fn from_name(name: &str) -> Option<Self> {
        let category = match name.trim().to_ascii_lowercase().as_str() {
            "feat" | "feature" | "features" => Self::Feat,
            "fix" | "fixes" | "bugfix" | "bug" | "hotfix" => Self::Fix,
            "refactor" | "refactoring" => Self::Refactor,
            "perf" | "performance" => Self::Perf,
            "docs" | "doc" | "documentation" => Self::Docs,
            "test" | "tests" | "testing" => Self::Test,
            "style" | "format" => Self::Style,
            "build" | "deps" => Self::Build,
            "ci" => Self::Ci,
            "chore" => Self::Chore,
            "revert" => Self::Revert,
            _ => return None,
        };
        Some(category)
    }
}

/// Resolves a commit's category: a recognized stored category wins, then a
/// conventional-commit prefix (`type(scope)!: subject`), then `Unknown`.
pub fn resolve_category(stored: Option<&str>, message: &str) -> CommitCategory {
    stored
        .and_then(CommitCategory::from_name)
        .or_else(|| category_from_message(message))
        .unwrap_or(CommitCategory::Unknown)
}

pub fn classify_commit(commit: &CommitRow) -> CommitCategory {
    resolve_category(commit.category.as_deref(), &commit.message)
}

fn category_from_message(message: &str) -> Option<CommitCategory> {
    let subject = message.lines().next().unwrap_or_default().trim();
    if subject.starts_with("Revert \"") {
        return Some(CommitCategory::Revert);
    }

    let (head, _) = subject.split_once(':')?;
    let head = head.strip_suffix('!').unwrap_or(head);
    let kind = match head.split_once('(') {
        Some((kind, scope)) if scope.ends_with(')') => kind,
        Some(_) => return None,
        None => head,
    };
    if kind.is_empty() || !kind.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }

    CommitCategory::from_name(kind)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: CommitCategory,
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
    pub percent: f64,
}

/// Commit counts per category, largest first. Ties follow
/// [`CommitCategory::ALL`]; empty categories are omitted.
pub fn category_distribution<'a>(
    commits: impl IntoIterator<Item = &'a CommitRow>,
) -> Vec<CategoryShare> {
    let mut counts = [0usize; CommitCategory::ALL.len()];
    let mut total = 0usize;
    for commit in commits {
        let category = classify_commit(commit);
        if let Some(index) = CommitCategory::ALL.iter().position(|entry| *entry == category) {
            counts[index] += 1;
        }
        total += 1;
    }

    let shares = CommitCategory::ALL
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(category, count)| CategoryShare {
            category: *category,
            label: category.label(),
            color: category.color(),
            count,
            percent: percent(count, total),
        });
    crate::rank_by(shares, |share| share.count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(message: &str, category: Option<&str>) -> CommitRow {
        CommitRow {
            sha: "abc".to_owned(),
            author: "dev".to_owned(),
            message: message.to_owned(),
            category: category.map(str::to_owned),
            committed_at: None,
            files_changed: 1,
            insertions: 1,
            deletions: 0,
        }
    }

    #[test]
    fn conventional_prefix_resolves_without_stored_category() {
        assert_eq!(
            resolve_category(None, "fix(api): handle null"),
            CommitCategory::Fix
        );
        assert_eq!(
            resolve_category(None, "feat!: drop legacy endpoint"),
            CommitCategory::Feat
        );
        assert_eq!(
            resolve_category(None, "Docs(readme)!: typo\n\nbody"),
            CommitCategory::Docs
        );
    }

    #[test]
    fn stored_category_wins_and_synonyms_normalize() {
        assert_eq!(
            resolve_category(Some("bugfix"), "feat: looks like a feature"),
            CommitCategory::Fix
        );
        assert_eq!(
            resolve_category(Some(" Feature "), "whatever"),
            CommitCategory::Feat
        );
        assert_eq!(
            resolve_category(Some("unknown"), "perf: faster diff"),
            CommitCategory::Perf
        );
        assert_eq!(
            resolve_category(Some("misc"), "chore: bump"),
            CommitCategory::Chore
        );
    }

    #[test]
    fn anything_else_is_unknown() {
        for message in [
            "",
            "update stuff",
            "wip: trying things",
            "fix(api: unbalanced",
            "12: numeric type",
            "fix (api): spaced",
        ] {
            assert_eq!(resolve_category(None, message), CommitCategory::Unknown);
        }
        assert_eq!(
            resolve_category(None, "Revert \"feat: add cache\""),
            CommitCategory::Revert
        );
    }

    #[test]
    fn distribution_orders_by_count_then_category_order() {
        let commits = vec![
            commit("docs: one", None),
            commit("fix: one", None),
            commit("tidy", None),
            commit("docs: two", None),
            commit("anything", Some("hotfix")),
            commit("feat: one", None),
        ];

        let distribution = category_distribution(&commits);

        let order = distribution
            .iter()
            .map(|share| (share.category, share.count))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                (CommitCategory::Fix, 2),
                (CommitCategory::Docs, 2),
                (CommitCategory::Feat, 1),
                (CommitCategory::Unknown, 1),
            ]
        );
        assert_eq!(distribution[0].label, "Bug fixes");
        let total = distribution.iter().map(|share| share.percent).sum::<f64>();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
