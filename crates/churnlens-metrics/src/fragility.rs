use churnlens_core::FragilityRow;
use serde::Serialize;

use crate::bands::{BandCount, band_counts, fragility_bins};
use crate::ranking::rank_with;
use crate::stats::{PercentileSummary, percentile_summary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragilityReport {
    pub summary: PercentileSummary,
    pub bands: Vec<BandCount>,
    pub most_fragile: Vec<FragilityRow>,
}

pub fn fragility_report(rows: &[FragilityRow], limit: Option<usize>) -> FragilityReport {
    let values = rows.iter().map(|row| row.fragility);

    FragilityReport {
        summary: percentile_summary(values.clone()),
        bands: band_counts(values, &fragility_bins()),
        most_fragile: rank_with(rows.iter().cloned(), |row| row.fragility, |_| true, limit),
    }
}
