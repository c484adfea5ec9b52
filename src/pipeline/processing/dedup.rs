use std::collections::HashSet;
use std::hash::Hash;

/// Drop exact duplicates, keeping the first occurrence and input order.
pub fn dedup_stable<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_in_order() {
        let out = dedup_stable(vec![3, 1, 3, 2, 1]);
        assert_eq!(out, vec![3, 1, 2]);
    }

    #[test]
    fn is_idempotent() {
        let once = dedup_stable(vec!["b", "a", "b", "c", "a"]);
        let twice = dedup_stable(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn distinct_rows_with_same_key_both_survive() {
        // exact-row equality, not key equality
        let rows = vec![(1, "US"), (1, "EU"), (1, "US")];
        assert_eq!(dedup_stable(rows), vec![(1, "US"), (1, "EU")]);
    }
}
