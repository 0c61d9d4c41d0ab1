use std::collections::HashMap;
use std::hash::Hash;

/// Folds rows into one aggregate per distinct key. Keys come out in the order
/// they were first seen.
pub fn aggregate_by<T, K, A>(
    rows: impl IntoIterator<Item = T>,
    key: impl Fn(&T) -> K,
    mut fold: impl FnMut(&mut A, &T),
) -> Vec<(K, A)>
where
    K: Eq + Hash + Clone,
    A: Default,
{
    let mut index_by_key = HashMap::<K, usize>::new();
    let mut groups = Vec::<(K, A)>::new();

    for row in rows {
        let group_key = key(&row);
        let index = *index_by_key.entry(group_key.clone()).or_insert_with(|| {
            groups.push((group_key, A::default()));
            groups.len() - 1
        });
        fold(&mut groups[index].1, &row);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_keep_first_seen_order_and_sum() {
        let rows = [("b", 2), ("a", 1), ("b", 5), ("c", 0), ("a", 4)];

        let totals = aggregate_by(rows, |row| row.0, |total: &mut i32, row| *total += row.1);

        assert_eq!(totals, vec![("b", 7), ("a", 5), ("c", 0)]);
    }

    #[test]
    fn empty_input_has_no_groups() {
        let totals = aggregate_by(Vec::<(&str, i32)>::new(), |row| row.0, |_: &mut i32, _| {});
        assert!(totals.is_empty());
    }
}
