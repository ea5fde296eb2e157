// ⚙️ Configuration - Threads, sources, throttles, pattern lists
// Loaded from an optional JSON file; every field has a default

use crate::aggregate::RunTally;
use crate::comments::Traversal;
use crate::geocode::GeocodeSettings;
use crate::net::HttpSettings;
use crate::registry::{PatternRegistry, RegistryKind};
use crate::source::HnSettings;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// "Who is hiring?" thread ids for January..December 2018
pub const DEFAULT_THREADS: [(u32, u64); 12] = [
    (1, 16052538),
    (2, 16282819),
    (3, 16492994),
    (4, 16735011),
    (5, 16967543),
    (6, 17205865),
    (7, 17442187),
    (8, 17663077),
    (9, 17902901),
    (10, 18113144),
    (11, 18354503),
    (12, 18589702),
];

/// Environment variable consulted for the geocoding API key
pub const GEOCODE_KEY_ENV: &str = "HIRING_TRENDS_GEOCODE_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshots, exports and the run store live here
    pub data_dir: PathBuf,

    /// Month (1-12) -> thread id
    pub threads: BTreeMap<u32, u64>,

    pub traversal: Traversal,

    /// Spacing between thread fetches, in milliseconds
    pub thread_interval_ms: u64,

    /// SQLite file (relative to `data_dir`) holding per-month results
    pub store_file: String,

    pub hn: HnSettings,
    pub geocode: GeocodeSettings,
    pub http: HttpSettings,

    // Pattern list overrides. `None` keeps the built-in list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            threads: DEFAULT_THREADS.into_iter().collect(),
            traversal: Traversal::default(),
            thread_interval_ms: 2_000,
            store_file: "runs.db".to_string(),
            hn: HnSettings::default(),
            geocode: GeocodeSettings::default(),
            http: HttpSettings::default(),
            titles: None,
            skills: None,
            locations: None,
        }
    }
}

impl Config {
    /// Load config from a JSON file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path.as_ref()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads.is_empty() {
            bail!("No threads configured");
        }
        if let Some(month) = self.threads.keys().find(|m| !(1..=12).contains(*m)) {
            bail!("Month {} out of range (1..12)", month);
        }
        if self.store_file.trim().is_empty() {
            bail!("store_file must not be empty");
        }
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }

    /// Zeroed run tally over the configured (or built-in) pattern lists.
    /// Fails if any pattern is malformed.
    pub fn build_tally(&self) -> Result<RunTally> {
        Ok(RunTally::new(
            registry(RegistryKind::Titles, self.titles.as_deref())?,
            registry(RegistryKind::Skills, self.skills.as_deref())?,
            registry(RegistryKind::Locations, self.locations.as_deref())?,
        ))
    }
}

fn registry(kind: RegistryKind, overrides: Option<&[String]>) -> Result<PatternRegistry> {
    match overrides {
        Some(patterns) => PatternRegistry::from_patterns(kind, patterns),
        None => PatternRegistry::with_defaults(kind),
    }
}
