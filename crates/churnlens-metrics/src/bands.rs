use serde::Serialize;

/// Half-open bin `[low, high)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub label: String,
    pub low: f64,
    pub high: f64,
}

impl Bin {
    pub fn new(label: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            label: label.into(),
            low,
            high,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value < self.high
    }

    fn is_valid(&self) -> bool {
        !self.low.is_nan() && !self.high.is_nan() && self.low < self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCount {
    pub label: String,
    pub low: f64,
    pub high: f64,
    pub count: usize,
    pub percent: f64,
}

/// Counts `values` per bin. Every bin is evaluated on its own, and percents
/// are taken against the whole sample, so values outside every bin show up as
/// a shortfall rather than being redistributed.
pub fn band_counts(values: impl IntoIterator<Item = f64>, bins: &[Bin]) -> Vec<BandCount> {
    let values = values.into_iter().collect::<Vec<_>>();
    let total = values.len();

    bins.iter()
        .map(|bin| {
            let count = values.iter().filter(|value| bin.contains(**value)).count();
            BandCount {
                label: bin.label.clone(),
                low: bin.low,
                high: bin.high,
                count,
                percent: percent(count, total),
            }
        })
        .collect()
}

/// Whether every value in `[low, high]` lands in at least one bin.
pub fn bins_cover(bins: &[Bin], low: f64, high: f64) -> bool {
    if low.is_nan() || high.is_nan() || low > high {
        return false;
    }

    let mut ordered = bins.iter().filter(|bin| bin.is_valid()).collect::<Vec<_>>();
    ordered.sort_by(|left, right| left.low.total_cmp(&right.low));

    let mut covered_to = low;
    for bin in ordered {
        if bin.high <= covered_to {
            continue;
        }
        if bin.low > covered_to {
            return false;
        }
        covered_to = bin.high;
        if covered_to > high {
            return true;
        }
    }
    false
}

pub(crate) fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * count as f64 / total as f64
}

/// Fragility index bands over `[0, 1]`.
pub fn fragility_bins() -> Vec<Bin> {
    vec![
        Bin::new("low", 0.0, 0.25),
        Bin::new("moderate", 0.25, 0.5),
        Bin::new("high", 0.5, 0.75),
        Bin::new("critical", 0.75, f64::INFINITY),
    ]
}

/// Maximum nesting depth bands.
pub fn nesting_depth_bins() -> Vec<Bin> {
    vec![
        Bin::new("0-2", 0.0, 3.0),
        Bin::new("3-4", 3.0, 5.0),
        Bin::new("5-6", 5.0, 7.0),
        Bin::new("7+", 7.0, f64::INFINITY),
    ]
}

/// Contribution share bands over `[0, 1]`.
pub fn contribution_share_bins() -> Vec<Bin> {
    vec![
        Bin::new("<25%", 0.0, 0.25),
        Bin::new("25-50%", 0.25, 0.5),
        Bin::new("50-75%", 0.5, 0.75),
        Bin::new(">=75%", 0.75, f64::INFINITY),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitioning_bins_account_for_every_value() {
        let values = [0.0, 0.1, 0.25, 0.49, 0.5, 0.74, 0.75, 1.0];
        let bins = fragility_bins();
        assert!(bins_cover(&bins, 0.0, 1.0));

        let counts = band_counts(values, &bins);

        assert_eq!(
            counts.iter().map(|band| band.count).collect::<Vec<_>>(),
            vec![2, 2, 2, 2]
        );
        assert_eq!(counts.iter().map(|band| band.count).sum::<usize>(), values.len());
        assert!((counts.iter().map(|band| band.percent).sum::<f64>() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn values_outside_every_bin_are_not_redistributed() {
        let bins = vec![Bin::new("a", 0.0, 1.0), Bin::new("b", 2.0, 3.0)];
        assert!(!bins_cover(&bins, 0.0, 3.0));

        let counts = band_counts([0.5, 1.5, 2.5, 3.0], &bins);

        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].count, 1);
        assert_eq!(counts[0].percent, 25.0);
    }

    #[test]
    fn empty_sample_has_zero_percent() {
        let counts = band_counts(Vec::new(), &nesting_depth_bins());

        assert_eq!(counts.len(), 4);
        assert!(counts.iter().all(|band| band.count == 0 && band.percent == 0.0));
    }

    #[test]
    fn cover_requires_reaching_past_the_upper_bound() {
        let closed_at_one = vec![Bin::new("all", 0.0, 1.0)];
        assert!(!bins_cover(&closed_at_one, 0.0, 1.0));
        assert!(bins_cover(&closed_at_one, 0.0, 0.99));
        assert!(!bins_cover(&closed_at_one, -0.1, 0.5));

        assert!(bins_cover(&nesting_depth_bins(), 0.0, 64.0));
        assert!(bins_cover(&contribution_share_bins(), 0.0, 1.0));
    }
}
