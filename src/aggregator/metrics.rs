//! Top-N ranking with percentage annotation.
//!
//! Every ranked list in an analysis goes through here, so they all share the
//! same rules: bounded length, descending order, and percentages of the
//! ranked total that sum to about 100 (or are all zero when that total is 0).

use log::debug;

/// An item with its share of the ranked total
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub percentage: f64,
}

/// Sort by `metric` descending, keep the first `top_n`, annotate percentages
///
/// **Public** - used by every template parser
///
/// Ties keep their input order. Items are never merged, so repeated names
/// stay separate entries.
pub fn rank_top_n<T, F>(mut items: Vec<T>, metric: F, top_n: usize) -> Vec<Ranked<T>>
where
    F: Fn(&T) -> f64,
{
    debug!("Ranking top {} of {} items", top_n, items.len());

    items.sort_by(|a, b| metric(b).total_cmp(&metric(a)));
    items.truncate(top_n);

    let total: f64 = items.iter().map(&metric).sum();
    items
        .into_iter()
        .map(|item| {
            let percentage = percentage_of(metric(&item), total);
            Ranked { item, percentage }
        })
        .collect()
}

/// `value` as a percentage of `total`, 0 when the total is not positive
pub fn percentage_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        (value / total) * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_top_n_sorts_and_bounds() {
        let items: Vec<(String, f64)> = (0..15)
            .map(|i| (format!("sym{}", i), i as f64))
            .collect();

        let ranked = rank_top_n(items, |(_, v)| *v, 10);

        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].item.0, "sym14");
        assert!(ranked.windows(2).all(|w| w[0].item.1 >= w[1].item.1));

        let sum: f64 = ranked.iter().map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_rank_percentages() {
        let items = vec![("a", 5000.0), ("b", 3000.0), ("c", 2000.0)];
        let ranked = rank_top_n(items, |(_, v)| *v, 10);

        assert_eq!(ranked[0].percentage, 50.0);
        assert_eq!(ranked[1].percentage, 30.0);
        assert_eq!(ranked[2].percentage, 20.0);
    }

    #[test]
    fn test_rank_zero_total() {
        let items = vec![("a", 0.0), ("b", 0.0)];
        let ranked = rank_top_n(items, |(_, v)| *v, 10);
        assert!(ranked.iter().all(|r| r.percentage == 0.0));
    }

    #[test]
    fn test_rank_keeps_duplicates() {
        let items = vec![("main", 1.0), ("main", 2.0)];
        let ranked = rank_top_n(items, |(_, v)| *v, 10);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_rank_empty() {
        let ranked = rank_top_n(Vec::<f64>::new(), |v| *v, 10);
        assert!(ranked.is_empty());
    }
}
