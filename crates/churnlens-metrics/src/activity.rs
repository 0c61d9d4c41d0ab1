use churnlens_core::{QualityFinding, Severity, TimelineBucket, normalize_path};
use serde::Serialize;

use crate::bands::percent;
use crate::grouping::aggregate_by;
use crate::ranking::rank_with;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityCount {
    pub severity: Severity,
    pub count: usize,
    pub percent: f64,
}

/// One entry per severity, most severe first, including empty ones.
pub fn severity_counts(findings: &[QualityFinding]) -> Vec<SeverityCount> {
    Severity::ALL
        .into_iter()
        .map(|severity| {
            let count = findings
                .iter()
                .filter(|finding| finding.severity == severity)
                .count();
            SeverityCount {
                severity,
                count,
                percent: percent(count, findings.len()),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileFindings {
    pub path: String,
    pub findings: usize,
    pub worst: Severity,
    /// Sum of severity weights.
    pub weight: f64,
}

/// Findings grouped per file, heaviest first.
pub fn findings_by_file(findings: &[QualityFinding], limit: Option<usize>) -> Vec<FileFindings> {
    let grouped = aggregate_by(
        findings,
        |finding| normalize_path(&finding.path),
        |file: &mut FileFindings, finding| {
            file.findings += 1;
            file.worst = file.worst.max(finding.severity);
            file.weight += finding.severity.weight();
        },
    );

    let files = grouped
        .into_iter()
        .map(|(path, file)| FileFindings { path, ..file });
    rank_with(files, |file| file.weight, |_| true, limit)
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTotals {
    pub buckets: usize,
    pub commits: u64,
    pub churn: u64,
    pub peak_contributors: u64,
    /// Bucket with the most commits; the earliest one wins ties.
    pub busiest_bucket: Option<String>,
}

pub fn timeline_totals(buckets: &[TimelineBucket]) -> TimelineTotals {
    let busiest = rank_with(buckets.iter(), |bucket| bucket.commits as f64, |_| true, Some(1));

    TimelineTotals {
        buckets: buckets.len(),
        commits: buckets.iter().map(|bucket| bucket.commits).sum(),
        churn: buckets.iter().map(|bucket| bucket.churn).sum(),
        peak_contributors: buckets
            .iter()
            .map(|bucket| bucket.contributors)
            .max()
            .unwrap_or(0),
        busiest_bucket: busiest.first().map(|bucket| bucket.bucket.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(path: &str, severity: Severity) -> QualityFinding {
        QualityFinding {
            path: path.to_owned(),
            rule: "rule".to_owned(),
            severity,
            message: String::new(),
            line: None,
        }
    }

    fn bucket(name: &str, commits: u64, churn: u64, contributors: u64) -> TimelineBucket {
        TimelineBucket {
            bucket: name.to_owned(),
            commits,
            churn,
            contributors,
        }
    }

    #[test]
    fn severity_counts_cover_every_level() {
        let findings = vec![
            finding("a", Severity::High),
            finding("b", Severity::High),
            finding("a", Severity::Info),
            finding("c", Severity::Critical),
        ];

        let counts = severity_counts(&findings);

        assert_eq!(
            counts
                .iter()
                .map(|entry| (entry.severity, entry.count))
                .collect::<Vec<_>>(),
            vec![
                (Severity::Critical, 1),
                (Severity::High, 2),
                (Severity::Medium, 0),
                (Severity::Low, 0),
                (Severity::Info, 1),
            ]
        );
        assert_eq!(counts[1].percent, 50.0);
        assert!(severity_counts(&[]).iter().all(|entry| entry.percent == 0.0));
    }

    #[test]
    fn findings_group_per_file_by_weight() {
        let findings = vec![
            finding("src\\a.rs", Severity::Low),
            finding("src/b.rs", Severity::Critical),
            finding("src/a.rs", Severity::High),
        ];

        let files = findings_by_file(&findings, None);

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/a.rs");
        assert_eq!(files[0].findings, 2);
        assert_eq!(files[0].worst, Severity::High);
        assert_eq!(files[1].path, "src/b.rs");
    }

    #[test]
    fn timeline_totals_sum_buckets() {
        let buckets = vec![
            bucket("2024-W01", 5, 100, 2),
            bucket("2024-W02", 9, 40, 4),
            bucket("2024-W03", 9, 10, 1),
        ];

        let totals = timeline_totals(&buckets);

        assert_eq!(totals.buckets, 3);
        assert_eq!(totals.commits, 23);
        assert_eq!(totals.churn, 150);
        assert_eq!(totals.peak_contributors, 4);
        assert_eq!(totals.busiest_bucket.as_deref(), Some("2024-W02"));
        assert_eq!(timeline_totals(&[]), TimelineTotals::default());
    }
}
