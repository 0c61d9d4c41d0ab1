use churnlens_core::{HotspotRow, normalize_path};
use serde::Serialize;

use crate::ranking::rank_with;

const TOUCH_WEIGHT: f64 = 0.5;
const CHURN_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredHotspot {
    pub path: String,
    pub touches: u64,
    pub churn: u64,
    pub score: f64,
    /// True when the service supplied the score.
    pub reported: bool,
}

/// Equal blend of touches and churn, each normalized by the batch maximum.
pub fn composite_score(touches: u64, churn: u64, max_touches: u64, max_churn: u64) -> f64 {
    TOUCH_WEIGHT * ratio(touches, max_touches) + CHURN_WEIGHT * ratio(churn, max_churn)
}

/// Scores every row, keeping a finite service score when present, and ranks
/// highest first with ties in input order.
pub fn score_hotspots(rows: &[HotspotRow], limit: Option<usize>) -> Vec<ScoredHotspot> {
    let max_touches = rows.iter().map(|row| row.touches).max().unwrap_or(0);
    let max_churn = rows.iter().map(|row| row.churn).max().unwrap_or(0);

    let scored = rows.iter().map(|row| {
        let reported = row.score.filter(|score| score.is_finite());
        ScoredHotspot {
            path: normalize_path(&row.path),
            touches: row.touches,
            churn: row.churn,
            score: reported
                .unwrap_or_else(|| composite_score(row.touches, row.churn, max_touches, max_churn)),
            reported: reported.is_some(),
        }
    });

    rank_with(scored, |hotspot| hotspot.score, |_| true, limit)
}

fn ratio(value: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    (value as f64 / max as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, touches: u64, churn: u64, score: Option<f64>) -> HotspotRow {
        HotspotRow {
            path: path.to_owned(),
            touches,
            churn,
            score,
        }
    }

    #[test]
    fn composite_blends_normalized_measures() {
        assert_eq!(composite_score(10, 50, 10, 100), 0.75);
        assert_eq!(composite_score(0, 0, 0, 0), 0.0);
    }

    #[test]
    fn reported_scores_win_and_ties_keep_order() {
        let rows = vec![
            row("src\\a.rs", 5, 100, None),
            row("src/b.rs", 10, 50, None),
            row("src/c.rs", 1, 1, Some(0.99)),
            row("src/d.rs", 1, 1, Some(f64::NAN)),
        ];

        let ranked = score_hotspots(&rows, None);

        let order = ranked
            .iter()
            .map(|hotspot| hotspot.path.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["src/c.rs", "src/a.rs", "src/b.rs", "src/d.rs"]);
        assert!(ranked[0].reported);
        assert!(!ranked[3].reported);
        assert_eq!(ranked[1].score, 0.75);
        assert_eq!(ranked[2].score, 0.75);
    }

    #[test]
    fn limit_truncates_after_ranking() {
        let rows = vec![row("a", 1, 1, None), row("b", 2, 2, None)];

        let top = score_hotspots(&rows, Some(1));

        assert_eq!(top.len(), 1);
        assert_eq!(top[0].path, "b");
        assert!(score_hotspots(&[], Some(3)).is_empty());
    }
}
