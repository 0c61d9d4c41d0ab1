use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentiles {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p90: f64,
}

/// Summary of a numeric sample. `NoData` stands in for an empty sample so
/// every view has something to render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PercentileSummary {
    #[default]
    NoData,
    Values(Percentiles),
}

impl PercentileSummary {
    pub fn values(&self) -> Option<&Percentiles> {
        match self {
            Self::NoData => None,
            Self::Values(values) => Some(values),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Nearest-rank selection on an ascending sample: `floor((n - 1) * ratio)`.
pub fn nearest_rank(sorted: &[f64], ratio: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let index = ((sorted.len() - 1) as f64 * ratio).floor() as usize;
    sorted.get(index.min(sorted.len() - 1)).copied()
}

/// Non-finite values are ignored.
pub fn percentile_summary(values: impl IntoIterator<Item = f64>) -> PercentileSummary {
    let mut sorted = values
        .into_iter()
        .filter(|value| value.is_finite())
        .collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);

    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return PercentileSummary::NoData;
    };

    PercentileSummary::Values(Percentiles {
        count: sorted.len(),
        min,
        max,
        median: nearest_rank(&sorted, 0.5).unwrap_or(min),
        p90: nearest_rank(&sorted, 0.9).unwrap_or(max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_uses_floor_index() {
        let sorted = [1.0, 2.0, 3.0, 4.0];

        assert_eq!(nearest_rank(&sorted, 0.5), Some(2.0));
        assert_eq!(nearest_rank(&sorted, 0.9), Some(3.0));
        assert_eq!(nearest_rank(&sorted, 1.0), Some(4.0));
        assert_eq!(nearest_rank(&sorted, -3.0), Some(1.0));
        assert_eq!(nearest_rank(&[], 0.5), None);
    }

    #[test]
    fn summary_is_ordered_for_any_sample() {
        let samples: [&[f64]; 4] = [
            &[5.0],
            &[3.0, 1.0, 2.0],
            &[0.9, 0.1, 0.5, 0.7, 0.3, 0.2, 0.8, 0.6, 0.4, 1.0, 0.0],
            &[-4.0, 10.0, 10.0, 2.5],
        ];

        for sample in samples {
            let summary = percentile_summary(sample.iter().copied());
            let values = summary.values().expect("non-empty sample");
            assert!(values.min <= values.median);
            assert!(values.median <= values.p90);
            assert!(values.p90 <= values.max);
            assert_eq!(values.count, sample.len());
        }
    }

    #[test]
    fn empty_or_non_finite_sample_is_no_data() {
        assert_eq!(percentile_summary(Vec::new()), PercentileSummary::NoData);
        assert!(percentile_summary([f64::NAN, f64::INFINITY]).is_empty());

        let mixed = percentile_summary([f64::NAN, 4.0]);
        assert_eq!(mixed.values().map(|values| values.count), Some(1));
    }

    #[test]
    fn no_data_serializes_as_tagged_state() {
        assert_eq!(
            serde_json::to_value(PercentileSummary::NoData).expect("serialize"),
            serde_json::json!({"state": "no_data"})
        );
    }
}
