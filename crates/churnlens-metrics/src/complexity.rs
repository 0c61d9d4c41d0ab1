use churnlens_core::ComplexityRow;
use serde::Serialize;

use crate::bands::{BandCount, band_counts, nesting_depth_bins};
use crate::ranking::rank_with;
use crate::stats::{PercentileSummary, percentile_summary};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub depth_summary: PercentileSummary,
    pub depth_bands: Vec<BandCount>,
    pub deepest: Vec<ComplexityRow>,
}

pub fn complexity_report(rows: &[ComplexityRow], limit: Option<usize>) -> ComplexityReport {
    let depths = rows.iter().map(|row| f64::from(row.max_nesting_depth));

    ComplexityReport {
        depth_summary: percentile_summary(depths.clone()),
        depth_bands: band_counts(depths, &nesting_depth_bins()),
        deepest: rank_with(
            rows.iter().cloned(),
            |row| f64::from(row.max_nesting_depth),
            |_| true,
            limit,
        ),
    }
}
