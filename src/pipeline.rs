// 🔁 Pipeline - fetch → aggregate → export → reload → summarize → geocode → rank
//
// Each step is callable on its own; `run` sequences them the way the CLI does.

use crate::aggregate::{Aggregator, CategoryResult, RunTally};
use crate::config::Config;
use crate::export::Exporter;
use crate::geocode::{geocode_all, records_from_tally, GeocodeSource, LocationRecord};
use crate::net::Throttle;
use crate::reduce::{chart_arrays, rank, series, CategorySeries, RankedEntry};
use crate::source::{snapshot_digest, snapshot_path, write_snapshot, CommentSource, SnapshotSource};
use crate::store;
use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

// ============================================================================
// OPTIONS & REPORTS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Work from cached snapshots only
    pub offline: bool,
    pub skip_geocode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: Vec<u32>,
    pub failed: Vec<u32>,
}

/// Everything one analysis pass produced
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub run_id: String,
    pub results: Vec<CategoryResult>,
    pub tally: RunTally,
    pub analyzed: Vec<u32>,
    pub skipped: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub fetch: Option<FetchReport>,
    pub analyzed: Vec<u32>,
    pub skipped: Vec<u32>,
    pub series: Vec<CategorySeries>,
    pub ranked_titles: Vec<RankedEntry>,
    pub ranked_skills: Vec<RankedEntry>,
    pub locations: Vec<LocationRecord>,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline<'a> {
    config: &'a Config,
    aggregator: Aggregator,
    exporter: Exporter,
    snapshots: SnapshotSource,
}

impl<'a> Pipeline<'a> {
    /// Fails on an invalid config or any malformed pattern, before anything is fetched
    pub fn new(config: &'a Config) -> Result<Self> {
        config.validate()?;
        config.build_tally()?;
        Ok(Pipeline {
            config,
            aggregator: Aggregator::new(config.traversal)?,
            exporter: Exporter::new(&config.data_dir)?,
            snapshots: SnapshotSource::new(&config.data_dir),
        })
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// Open (and create if needed) the run store under the data directory
    pub fn open_store(&self) -> Result<Connection> {
        let path = self.config.store_path();
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open run store: {}", path.display()))?;
        store::setup_database(&conn)?;
        Ok(conn)
    }

    // ------------------------------------------------------------------------
    // Step 1: fetch
    // ------------------------------------------------------------------------

    /// Fetch every configured thread and cache it as a snapshot.
    ///
    /// A thread that fails to fetch is logged; any older snapshot of it
    /// stays in place for the analysis step.
    pub fn fetch_all(&self, source: &dyn CommentSource) -> FetchReport {
        let mut throttle = Throttle::from_millis(self.config.thread_interval_ms);
        let mut report = FetchReport::default();

        for (&month, &thread_id) in &self.config.threads {
            throttle.wait();
            let fetched = source
                .fetch_thread(thread_id)
                .and_then(|items| write_snapshot(&self.config.data_dir, thread_id, &items));

            match fetched {
                Ok(path) => {
                    info!(month, thread_id, source = source.name(), file = %path.display(), "thread cached");
                    report.fetched.push(month);
                }
                Err(e) => {
                    warn!(month, thread_id, error = %format!("{:#}", e), "thread fetch failed");
                    report.failed.push(month);
                }
            }
        }

        report
    }

    // ------------------------------------------------------------------------
    // Step 2: aggregate
    // ------------------------------------------------------------------------

    /// Aggregate every month from its snapshot, storing each month as it finishes.
    ///
    /// A missing or unreadable snapshot skips that month only.
    pub fn analyze_all(&self, conn: &Connection) -> Result<AnalysisReport> {
        let mut tally = self.config.build_tally()?;
        let run_id = store::begin_run(conn, self.aggregator.traversal())?;
        let mut results = Vec::new();
        let mut analyzed = Vec::new();
        let mut skipped = Vec::new();

        for (&month, &thread_id) in &self.config.threads {
            let items = match self.snapshots.fetch_thread(thread_id) {
                Ok(items) => items,
                Err(e) => {
                    warn!(month, thread_id, error = %format!("{:#}", e), "skipping month");
                    skipped.push(month);
                    continue;
                }
            };

            let analysis = self.aggregator.aggregate(&items, month, &mut tally);
            let digest = snapshot_digest(&snapshot_path(&self.config.data_dir, thread_id)).ok();
            store::record_month(conn, &run_id, thread_id, &analysis, digest.as_deref())?;

            results.extend(analysis.category_results());
            analyzed.push(month);
        }

        store::finish_run(conn, &run_id)?;
        info!(
            run_id = %run_id,
            analyzed = analyzed.len(),
            skipped = skipped.len(),
            "analysis finished"
        );

        Ok(AnalysisReport {
            run_id,
            results,
            tally,
            analyzed,
            skipped,
        })
    }

    // ------------------------------------------------------------------------
    // Step 3: export
    // ------------------------------------------------------------------------

    pub fn export(&self, report: &AnalysisReport) -> Result<()> {
        self.exporter.save_results(&report.results)?;
        self.exporter.save_titles(&report.tally.titles.to_map())?;
        self.exporter.save_skills(&report.tally.skills.to_map())?;
        self.exporter.save_cities(&report.tally.locations.to_map())?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Step 4: reload + summarize
    // ------------------------------------------------------------------------

    /// Re-read the exported files and print title and perk summaries
    pub fn summarize(&self) -> Result<(Vec<CategorySeries>, Vec<RankedEntry>)> {
        let titles = rank(self.exporter.load_titles()?);
        let all_series = series(&self.exporter.load_results()?);

        println!("\n📋 Titles");
        for entry in &titles {
            println!("   {:<30} {}", entry.pattern, entry.count);
        }

        println!("\n📅 Perks by month");
        for s in &all_series {
            let months: Vec<String> = s.points.iter().map(|p| format!("{}:{}", p.month, p.count)).collect();
            println!("   {:<8} {}", s.category.as_str(), months.join(", "));
        }

        Ok((all_series, titles))
    }

    // ------------------------------------------------------------------------
    // Step 5: geocode
    // ------------------------------------------------------------------------

    /// Geocode the exported city tally and write the location files
    pub fn geocode(&self, source: &dyn GeocodeSource) -> Result<Vec<LocationRecord>> {
        let records = records_from_tally(&self.exporter.load_cities()?);
        let mut throttle = Throttle::from_millis(self.config.geocode.interval_ms);

        let located = geocode_all(records, source, &mut throttle);
        self.exporter.save_locations(&located)?;
        Ok(located)
    }

    // ------------------------------------------------------------------------
    // Step 6: rank skills
    // ------------------------------------------------------------------------

    pub fn rank_skills(&self) -> Result<Vec<RankedEntry>> {
        let ranked = rank(self.exporter.load_skills()?);
        let chart = chart_arrays(&ranked);

        println!("\n🛠️  Skills");
        for entry in &ranked {
            println!("   {}, {}", entry.pattern, entry.count);
        }
        println!("\n   keys   {:?}", chart.keys);
        println!("   values {:?}", chart.values);

        self.exporter.save_skill_ranking(&ranked, &chart)?;
        Ok(ranked)
    }

    // ------------------------------------------------------------------------
    // Full run
    // ------------------------------------------------------------------------

    pub fn run(
        &self,
        options: &PipelineOptions,
        live: Option<&dyn CommentSource>,
        geocoder: Option<&dyn GeocodeSource>,
    ) -> Result<RunSummary> {
        let fetch = match (options.offline, live) {
            (false, Some(source)) => Some(self.fetch_all(source)),
            _ => {
                info!("offline run, using cached snapshots");
                None
            }
        };

        let conn = self.open_store()?;
        let report = self.analyze_all(&conn)?;
        self.export(&report)?;

        let (all_series, ranked_titles) = self.summarize()?;

        let locations = match (options.skip_geocode, geocoder) {
            (false, Some(source)) => self.geocode(source)?,
            (false, None) => {
                warn!("no geocoder configured, skipping geocoding");
                self.keep_previous_locations()?
            }
            (true, _) => self.keep_previous_locations()?,
        };

        let ranked_skills = self.rank_skills()?;

        Ok(RunSummary {
            run_id: report.run_id,
            fetch,
            analyzed: report.analyzed,
            skipped: report.skipped,
            series: all_series,
            ranked_titles,
            ranked_skills,
            locations,
        })
    }

    // Locations from an earlier geocoding run, if there was one
    fn keep_previous_locations(&self) -> Result<Vec<LocationRecord>> {
        let path = self.exporter.path(crate::export::LOCATIONS_FILE);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        self.exporter.load_locations()
    }
}

// ============================================================================
// TESTS
// ============================================================================
