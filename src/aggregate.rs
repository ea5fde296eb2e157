// 📊 Aggregator - Per-month signal extraction
// Walks a month's comments, counts perks per month and feeds the run tally

use crate::comments::{collect_bodies, TextItem, Traversal};
use crate::matcher::Matcher;
use crate::registry::{PatternRegistry, RegistryKind};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// PERK CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perk {
    Visa,
    Remote,
    Lunch,
    FullTime,
    Contractor,
}

impl Perk {
    pub const ALL: [Perk; 5] = [
        Perk::Visa,
        Perk::Remote,
        Perk::Lunch,
        Perk::FullTime,
        Perk::Contractor,
    ];

    /// Perks exported as per-month chart series
    pub const CHARTED: [Perk; 3] = [Perk::Visa, Perk::Remote, Perk::Lunch];

    /// Parameter name used in exported results
    pub fn as_str(&self) -> &'static str {
        match self {
            Perk::Visa => "visa",
            Perk::Remote => "remote",
            Perk::Lunch => "lunch",
            Perk::FullTime => "full_time",
            Perk::Contractor => "contractor",
        }
    }

    /// Pattern searched in comment bodies
    pub fn pattern(&self) -> &'static str {
        match self {
            Perk::Visa => "visa",
            Perk::Remote => "remote",
            Perk::Lunch => "lunch",
            Perk::FullTime => "Full Time",
            Perk::Contractor => "Contractor",
        }
    }

    pub fn from_name(name: &str) -> Option<Perk> {
        Perk::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// One (category, month) row. `count <= comments_count` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResult {
    #[serde(rename = "parameter")]
    pub category: Perk,
    pub count: u64,
    pub month: u32,
    /// Items processed this month
    pub comments_count: u64,
}

/// Counts for every perk in one month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerkCounts {
    pub visa: u64,
    pub remote: u64,
    pub lunch: u64,
    pub full_time: u64,
    pub contractor: u64,
}

impl PerkCounts {
    pub fn get(&self, perk: Perk) -> u64 {
        match perk {
            Perk::Visa => self.visa,
            Perk::Remote => self.remote,
            Perk::Lunch => self.lunch,
            Perk::FullTime => self.full_time,
            Perk::Contractor => self.contractor,
        }
    }

    fn add(&mut self, perk: Perk, n: u64) {
        match perk {
            Perk::Visa => self.visa += n,
            Perk::Remote => self.remote += n,
            Perk::Lunch => self.lunch += n,
            Perk::FullTime => self.full_time += n,
            Perk::Contractor => self.contractor += n,
        }
    }
}

/// Output of one monthly pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthAnalysis {
    pub month: u32,
    pub items_processed: u64,
    pub perks: PerkCounts,
}

impl MonthAnalysis {
    /// Visa, remote and lunch rows for this month
    pub fn category_results(&self) -> Vec<CategoryResult> {
        Perk::CHARTED
            .iter()
            .map(|&perk| CategoryResult {
                category: perk,
                count: self.perks.get(perk),
                month: self.month,
                comments_count: self.items_processed,
            })
            .collect()
    }
}

// ============================================================================
// RUN TALLY
// ============================================================================

/// RunTally - registry counts for a whole run
///
/// Threaded explicitly through every monthly pass. Counts start at zero
/// when the tally is built and are never reset between months.
#[derive(Debug, Clone)]
pub struct RunTally {
    pub titles: PatternRegistry,
    pub skills: PatternRegistry,
    pub locations: PatternRegistry,
}

impl RunTally {
    pub fn new(
        titles: PatternRegistry,
        skills: PatternRegistry,
        locations: PatternRegistry,
    ) -> Self {
        RunTally {
            titles,
            skills,
            locations,
        }
    }

    /// Tally over the built-in curated pattern lists
    pub fn with_defaults() -> Result<Self> {
        Ok(RunTally::new(
            PatternRegistry::with_defaults(RegistryKind::Titles)?,
            PatternRegistry::with_defaults(RegistryKind::Skills)?,
            PatternRegistry::with_defaults(RegistryKind::Locations)?,
        ))
    }

    /// Same patterns, all counts zero. Used for isolated partial passes.
    pub fn fresh(&self) -> Self {
        RunTally {
            titles: self.titles.fresh(),
            skills: self.skills.fresh(),
            locations: self.locations.fresh(),
        }
    }

    /// Sum a partial tally into this one
    pub fn merge(&mut self, other: &RunTally) -> Result<()> {
        self.titles.merge(&other.titles)?;
        self.skills.merge(&other.skills)?;
        self.locations.merge(&other.locations)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.titles.reset();
        self.skills.reset();
        self.locations.reset();
    }

    fn record(&mut self, body: &str) {
        self.titles.record(body);
        self.skills.record(body);
        self.locations.record(body);
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct Aggregator {
    traversal: Traversal,
    perks: Vec<(Perk, Matcher)>,
}

impl Aggregator {
    pub fn new(traversal: Traversal) -> Result<Self> {
        let perks = Perk::ALL
            .iter()
            .map(|&perk| Ok((perk, Matcher::new(perk.pattern())?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Aggregator { traversal, perks })
    }

    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    /// Analyze one month of comments.
    ///
    /// Every body contributes at most 1 to each perk and each registry
    /// pattern, however often the pattern appears in it.
    pub fn aggregate(&self, items: &[TextItem], month: u32, tally: &mut RunTally) -> MonthAnalysis {
        let bodies = collect_bodies(items, self.traversal);
        let mut perks = PerkCounts::default();

        for body in &bodies {
            for (perk, matcher) in &self.perks {
                perks.add(*perk, matcher.presence(body));
            }
            tally.record(body);
        }

        let analysis = MonthAnalysis {
            month,
            items_processed: bodies.len() as u64,
            perks,
        };

        debug!(month, traversal = self.traversal.as_str(), "aggregated month");
        info!(
            month,
            comments = analysis.items_processed,
            remote = perks.remote,
            lunch = perks.lunch,
            visa = perks.visa,
            full_time = perks.full_time,
            contractor = perks.contractor,
            "month analyzed"
        );

        analysis
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_month() -> Vec<TextItem> {
        vec![
            TextItem::new("we hire contractors, remote ok"),
            TextItem::new("no remote, visa sponsorship available"),
            TextItem::new("lunch provided, full time only"),
        ]
    }

    fn small_tally() -> RunTally {
        RunTally::new(
            PatternRegistry::from_patterns(RegistryKind::Titles, &["Software Engineer", "QA"])
                .unwrap(),
            PatternRegistry::from_patterns(RegistryKind::Skills, &["python", "c", "c++", "scala"])
                .unwrap(),
            PatternRegistry::from_patterns(RegistryKind::Locations, &["Boston", "NYC"]).unwrap(),
        )
    }

    fn result_for(results: &[CategoryResult], perk: Perk) -> &CategoryResult {
        results.iter().find(|r| r.category == perk).unwrap()
    }

    #[test]
    fn test_three_comment_month() {
        let aggregator = Aggregator::new(Traversal::TopLevel).unwrap();
        let mut tally = small_tally();

        let analysis = aggregator.aggregate(&sample_month(), 4, &mut tally);
        let results = analysis.category_results();

        assert_eq!(results.len(), 3);
        assert_eq!(result_for(&results, Perk::Remote).count, 2);
        assert_eq!(result_for(&results, Perk::Visa).count, 1);
        assert_eq!(result_for(&results, Perk::Lunch).count, 1);
        assert!(results.iter().all(|r| r.comments_count == 3 && r.month == 4));
        assert!(results.iter().all(|r| r.count <= r.comments_count));

        // Case-sensitive: "contractors" and "full time" miss the capitalized patterns
        assert_eq!(analysis.perks.contractor, 0);
        assert_eq!(analysis.perks.full_time, 0);
    }

    #[test]
    fn test_empty_month_is_all_zero() {
        let aggregator = Aggregator::new(Traversal::TopLevel).unwrap();
        let mut tally = small_tally();

        let results = aggregator.aggregate(&[], 7, &mut tally).category_results();

        assert_eq!(results.len(), 3);
        for r in &results {
            assert_eq!(r.count, 0);
            assert_eq!(r.comments_count, 0);
            assert_eq!(r.month, 7);
        }
    }

    #[test]
    fn test_idempotent_with_fresh_tally() {
        let aggregator = Aggregator::new(Traversal::TopLevel).unwrap();
        let items = sample_month();

        let mut first_tally = small_tally();
        let mut second_tally = small_tally();
        let first = aggregator.aggregate(&items, 1, &mut first_tally);
        let second = aggregator.aggregate(&items, 1, &mut second_tally);

        assert_eq!(first.category_results(), second.category_results());
        assert_eq!(first_tally.skills.tally(), second_tally.skills.tally());
    }

    #[test]
    fn test_presence_not_frequency() {
        let aggregator = Aggregator::new(Traversal::TopLevel).unwrap();
        let mut tally = small_tally();
        let items = vec![TextItem::new("remote remote remote, python python")];

        let analysis = aggregator.aggregate(&items, 1, &mut tally);

        assert_eq!(analysis.perks.remote, 1);
        assert_eq!(tally.skills.count("python"), Some(1));
    }

    #[test]
    fn test_registry_counts_accumulate_across_months() {
        let aggregator = Aggregator::new(Traversal::TopLevel).unwrap();
        let mut tally = small_tally();

        aggregator.aggregate(
            &[TextItem::new("Software Engineer | Boston | python")],
            1,
            &mut tally,
        );
        aggregator.aggregate(
            &[
                TextItem::new("Senior Software Engineer, NYC, I love scala"),
                TextItem::new("QA in Boston"),
            ],
            2,
            &mut tally,
        );

        assert_eq!(tally.titles.count("Software Engineer"), Some(2));
        assert_eq!(tally.titles.count("QA"), Some(1));
        assert_eq!(tally.locations.count("Boston"), Some(2));
        assert_eq!(tally.locations.count("NYC"), Some(1));
        assert_eq!(tally.skills.count("python"), Some(1));
        assert_eq!(tally.skills.count("scala"), Some(1));
        assert_eq!(tally.skills.count("c"), Some(0));
    }

    #[test]
    fn test_no_words_body_counts_nothing() {
        let aggregator = Aggregator::new(Traversal::TopLevel).unwrap();
        let mut tally = small_tally();

        let analysis = aggregator.aggregate(&[TextItem::new("--- !!! ...")], 3, &mut tally);

        assert_eq!(analysis.perks, PerkCounts::default());
        assert_eq!(analysis.items_processed, 1);
        assert!(tally.skills.tally().iter().all(|(_, c)| *c == 0));
    }

    #[test]
    fn test_traversal_controls_replies() {
        let items = vec![TextItem::new("Acme | onsite").with_reply(TextItem::new("is remote ok?"))];

        let top = Aggregator::new(Traversal::TopLevel).unwrap();
        let full = Aggregator::new(Traversal::FullTree).unwrap();

        let top_analysis = top.aggregate(&items, 1, &mut small_tally());
        let full_analysis = full.aggregate(&items, 1, &mut small_tally());

        assert_eq!(top_analysis.items_processed, 1);
        assert_eq!(top_analysis.perks.remote, 0);
        assert_eq!(full_analysis.items_processed, 2);
        assert_eq!(full_analysis.perks.remote, 1);
    }

    #[test]
    fn test_partial_tallies_merge_to_sequential_total() {
        let aggregator = Aggregator::new(Traversal::TopLevel).unwrap();
        let month_a = vec![TextItem::new("python and c++")];
        let month_b = vec![TextItem::new("python, QA")];

        let mut sequential = small_tally();
        aggregator.aggregate(&month_a, 1, &mut sequential);
        aggregator.aggregate(&month_b, 2, &mut sequential);

        let mut merged = small_tally();
        let mut part_a = merged.fresh();
        let mut part_b = merged.fresh();
        aggregator.aggregate(&month_a, 1, &mut part_a);
        aggregator.aggregate(&month_b, 2, &mut part_b);
        merged.merge(&part_a).unwrap();
        merged.merge(&part_b).unwrap();

        assert_eq!(merged.skills.tally(), sequential.skills.tally());
        assert_eq!(merged.titles.tally(), sequential.titles.tally());
    }

    #[test]
    fn test_perk_names_round_trip() {
        for perk in Perk::ALL {
            assert_eq!(Perk::from_name(perk.as_str()), Some(perk));
        }
        assert_eq!(Perk::from_name("parking"), None);
    }
}
