// 📈 Cross-Month Reducer - Series and rankings

use crate::aggregate::{CategoryResult, Perk};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// MONTH SERIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPoint {
    pub month: u32,
    pub count: u64,
    pub total: u64,
}

/// One category's values ordered by month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub category: Perk,
    pub points: Vec<MonthPoint>,
}

impl CategorySeries {
    pub fn counts(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.count).collect()
    }

    pub fn total(&self) -> u64 {
        self.points.iter().map(|p| p.count).sum()
    }
}

/// Group results into one month-ordered series per category.
///
/// Categories come out in visa, remote, lunch order; categories with no
/// rows still get an (empty) series. A repeated (category, month) row
/// replaces the earlier one.
pub fn series(results: &[CategoryResult]) -> Vec<CategorySeries> {
    let mut grouped: BTreeMap<Perk, BTreeMap<u32, MonthPoint>> = BTreeMap::new();

    for result in results {
        grouped.entry(result.category).or_default().insert(
            result.month,
            MonthPoint {
                month: result.month,
                count: result.count,
                total: result.comments_count,
            },
        );
    }

    let mut ordered: Vec<Perk> = Perk::CHARTED.to_vec();
    ordered.extend(grouped.keys().filter(|p| !Perk::CHARTED.contains(*p)).copied());

    ordered
        .into_iter()
        .map(|category| CategorySeries {
            category,
            points: grouped
                .remove(&category)
                .map(|months| months.into_values().collect())
                .unwrap_or_default(),
        })
        .collect()
}

// ============================================================================
// RANKING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub pattern: String,
    pub count: u64,
}

/// Rank (pattern, count) pairs by count, highest first.
///
/// Every entry appears exactly once. Equal counts are ordered by
/// pattern so the output never depends on input order.
pub fn rank<I, S>(entries: I) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = (S, u64)>,
    S: Into<String>,
{
    let mut ranked: Vec<RankedEntry> = entries
        .into_iter()
        .map(|(pattern, count)| RankedEntry {
            pattern: pattern.into(),
            count,
        })
        .collect();

    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));
    ranked
}

/// Index-aligned key and value arrays for chart libraries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartArrays {
    pub keys: Vec<String>,
    pub values: Vec<u64>,
}

pub fn chart_arrays(ranked: &[RankedEntry]) -> ChartArrays {
    ChartArrays {
        keys: ranked.iter().map(|e| e.pattern.clone()).collect(),
        values: ranked.iter().map(|e| e.count).collect(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: Perk, month: u32, count: u64, total: u64) -> CategoryResult {
        CategoryResult {
            category,
            count,
            month,
            comments_count: total,
        }
    }

    #[test]
    fn test_series_grouped_and_month_ordered() {
        let results = vec![
            row(Perk::Remote, 3, 30, 300),
            row(Perk::Visa, 1, 5, 100),
            row(Perk::Remote, 1, 10, 100),
            row(Perk::Lunch, 2, 2, 200),
        ];

        let all = series(&results);

        assert_eq!(all.len(), 3);
        assert_eq!(all[0].category, Perk::Visa);
        assert_eq!(all[1].category, Perk::Remote);
        assert_eq!(all[1].counts(), vec![10, 30]);
        assert_eq!(all[1].points[1], MonthPoint { month: 3, count: 30, total: 300 });
        assert_eq!(all[1].total(), 40);
        assert_eq!(all[2].counts(), vec![2]);
    }

    #[test]
    fn test_series_without_rows() {
        let all = series(&[]);
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|s| s.points.is_empty()));
    }

    #[test]
    fn test_rank_descending_with_lexical_ties() {
        let ranked = rank(vec![
            ("rust", 3u64),
            ("go", 7),
            ("c", 3),
            ("zig", 0),
            ("ada", 3),
        ]);

        let order: Vec<_> = ranked.iter().map(|e| e.pattern.as_str()).collect();
        assert_eq!(order, vec!["go", "ada", "c", "rust", "zig"]);
    }

    #[test]
    fn test_rank_is_total_and_order_independent() {
        let input = vec![
            ("python".to_string(), 4u64),
            ("java".to_string(), 4),
            ("rust".to_string(), 9),
        ];
        let mut reversed = input.clone();
        reversed.reverse();

        let a = rank(input.clone());
        let b = rank(reversed);

        assert_eq!(a, b);
        assert_eq!(a.len(), input.len());
        for (pattern, count) in &input {
            assert_eq!(a.iter().filter(|e| &e.pattern == pattern && e.count == *count).count(), 1);
        }
        assert!(a.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_chart_arrays_index_aligned() {
        let ranked = rank(vec![("a", 1u64), ("b", 2)]);
        let arrays = chart_arrays(&ranked);

        assert_eq!(arrays.keys, vec!["b", "a"]);
        assert_eq!(arrays.values, vec![2, 1]);
    }
}
