use churnlens_core::{OwnershipRow, normalize_path};
use serde::Serialize;

use crate::bands::{BandCount, band_counts, contribution_share_bins};
use crate::grouping::aggregate_by;
use crate::ranking::{rank_by, rank_with};

pub const DEFAULT_BUS_FACTOR_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOwnership {
    pub path: String,
    pub dominant_contributor: String,
    pub dominant_share: f64,
    pub contributors: usize,
    pub at_risk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusFactorReport {
    pub threshold: f64,
    pub files: Vec<FileOwnership>,
    pub at_risk: usize,
    pub share_bands: Vec<BandCount>,
}

#[derive(Debug, Clone, Default)]
struct FileAccumulator {
    dominant: Option<(String, f64)>,
    contributors: usize,
}

/// Per file, the contributor with the largest share. A file is at risk when
/// that share reaches `threshold`. Files are ranked by dominant share, ties in
/// first-seen order.
pub fn bus_factor(rows: &[OwnershipRow], threshold: f64) -> BusFactorReport {
    let grouped = aggregate_by(
        rows,
        |row| normalize_path(&row.path),
        |file: &mut FileAccumulator, row| {
            file.contributors += 1;
            let share = if row.share.is_finite() { row.share } else { 0.0 };
            let replaces = file
                .dominant
                .as_ref()
                .is_none_or(|(_, current)| share > *current);
            if replaces {
                file.dominant = Some((row.contributor.clone(), share));
            }
        },
    );

    let files = grouped.into_iter().filter_map(|(path, file)| {
        let (contributor, share) = file.dominant?;
        Some(FileOwnership {
            path,
            dominant_contributor: contributor,
            dominant_share: share,
            contributors: file.contributors,
            at_risk: share >= threshold,
        })
    });
    let files = rank_by(files, |file| file.dominant_share);

    BusFactorReport {
        threshold,
        at_risk: files.iter().filter(|file| file.at_risk).count(),
        share_bands: band_counts(
            files.iter().map(|file| file.dominant_share),
            &contribution_share_bins(),
        ),
        files,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContributorCoverage {
    pub contributor: String,
    pub files: usize,
    pub total_share: f64,
    pub commits: u64,
}

/// Files touched, summed share and commits per contributor, most commits
/// first.
pub fn contributor_coverage(
    rows: &[OwnershipRow],
    limit: Option<usize>,
) -> Vec<ContributorCoverage> {
    let grouped = aggregate_by(
        rows,
        |row| row.contributor.trim().to_owned(),
        |coverage: &mut ContributorCoverage, row| {
            coverage.files += 1;
            if row.share.is_finite() {
                coverage.total_share += row.share;
            }
            coverage.commits += row.commits;
        },
    );

    let coverage = grouped
        .into_iter()
        .map(|(contributor, coverage)| ContributorCoverage {
            contributor,
            ..coverage
        });
    rank_with(coverage, |entry| entry.commits as f64, |_| true, limit)
}
