//! Pure derivations over metric rows. Every function here is deterministic
//! and total: empty input yields empty or `NoData` results.

mod activity;
mod bands;
mod complexity;
mod fragility;
mod grouping;
mod hotspots;
mod ownership;
mod ranking;
mod stats;
mod taxonomy;

pub use activity::{
    FileFindings, SeverityCount, TimelineTotals, findings_by_file, severity_counts,
    timeline_totals,
};
pub use bands::{
    BandCount, Bin, band_counts, bins_cover, contribution_share_bins, fragility_bins,
    nesting_depth_bins,
};
pub use complexity::{ComplexityReport, complexity_report};
pub use fragility::{FragilityReport, fragility_report};
pub use grouping::aggregate_by;
pub use hotspots::{ScoredHotspot, composite_score, score_hotspots};
pub use ownership::{
    BusFactorReport, ContributorCoverage, DEFAULT_BUS_FACTOR_THRESHOLD, FileOwnership,
    bus_factor, contributor_coverage,
};
pub use ranking::{rank_by, rank_with};
pub use stats::{PercentileSummary, Percentiles, nearest_rank, percentile_summary};
pub use taxonomy::{
    CategoryShare, CommitCategory, category_distribution, classify_commit, resolve_category,
};
