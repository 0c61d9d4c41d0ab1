use std::cmp::Ordering;

/// Sorts rows by `key`, highest first. Equal keys keep input order; NaN keys
/// sort after every number.
pub fn rank_by<T>(rows: impl IntoIterator<Item = T>, key: impl Fn(&T) -> f64) -> Vec<T> {
    rank_with(rows, key, |_| true, None)
}

/// [`rank_by`] restricted to rows accepted by `filter`, truncated to `limit`.
pub fn rank_with<T>(
    rows: impl IntoIterator<Item = T>,
    key: impl Fn(&T) -> f64,
    filter: impl Fn(&T) -> bool,
    limit: Option<usize>,
) -> Vec<T> {
    let mut keyed = rows
        .into_iter()
        .filter(|row| filter(row))
        .map(|row| (key(&row), row))
        .collect::<Vec<_>>();

    keyed.sort_by(|left, right| descending(left.0, right.0));
    if let Some(limit) = limit {
        keyed.truncate(limit);
    }

    keyed.into_iter().map(|(_, row)| row).collect()
}

pub(crate) fn descending(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_keep_input_order() {
        let rows = vec![("a", 1.0), ("b", 3.0), ("c", 1.0), ("d", 3.0)];

        let ranked = rank_by(rows.iter(), |row| row.1);

        let names = ranked.iter().map(|row| row.0).collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn nan_sorts_last_and_limit_applies_after_filter() {
        let rows = vec![("nan", f64::NAN), ("low", 1.0), ("skip", 9.0), ("high", 5.0)];

        let ranked = rank_with(rows, |row| row.1, |row| row.0 != "skip", Some(2));

        let names = ranked.iter().map(|row| row.0).collect::<Vec<_>>();
        assert_eq!(names, vec!["high", "low"]);

        let all = rank_by(vec![f64::NAN, 2.0, f64::NEG_INFINITY], |value| *value);
        assert_eq!(all[0], 2.0);
        assert_eq!(all[1], f64::NEG_INFINITY);
        assert!(all[2].is_nan());
    }

    #[test]
    fn empty_input_ranks_to_empty() {
        let ranked = rank_by(Vec::<f64>::new(), |value| *value);
        assert!(ranked.is_empty());
    }
}
