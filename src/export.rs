// 📤 Result Exporter - JSON/CSV files for the charting front end
//
// Every file is written whole and read back whole; errors name the file.

use crate::aggregate::CategoryResult;
use crate::geocode::LocationRecord;
use crate::reduce::{ChartArrays, RankedEntry};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULTS_FILE: &str = "results.json";
pub const TITLES_FILE: &str = "title_results.json";
pub const SKILLS_FILE: &str = "skills.json";
pub const CITIES_FILE: &str = "cities.json";
pub const LOCATIONS_FILE: &str = "locations.json";
pub const LAT_LONG_FILE: &str = "lat_long_map.json";
pub const MAP_DATA_FILE: &str = "map_data.json";
pub const SKILLS_CHART_FILE: &str = "skills_chart.json";
pub const SKILLS_CSV_FILE: &str = "skills_ranked.csv";

/// Marker color understood by the map front end
pub const MAP_MARKER_COLOR: &str = "chart.colors.getIndex(0)";

// ============================================================================
// CHART SHAPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLong {
    pub latitude: f64,
    pub longitude: f64,
}

/// One map bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    pub id: String,
    pub name: String,
    pub value: u64,
    pub color: String,
}

/// city -> coordinates, geocoded cities only
pub fn lat_long_map(locations: &[LocationRecord]) -> BTreeMap<String, LatLong> {
    locations
        .iter()
        .filter_map(|loc| {
            loc.coordinates.map(|c| {
                (
                    loc.city.clone(),
                    LatLong {
                        latitude: c.latitude,
                        longitude: c.longitude,
                    },
                )
            })
        })
        .collect()
}

pub fn map_data(locations: &[LocationRecord]) -> Vec<MapData> {
    locations
        .iter()
        .map(|loc| MapData {
            id: loc.city.clone(),
            name: loc.city.clone(),
            value: loc.count,
            color: MAP_MARKER_COLOR.to_string(),
        })
        .collect()
}

// ============================================================================
// EXPORTER
// ============================================================================

pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;
        Ok(Exporter { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<PathBuf> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {}", file))?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(file = %path.display(), "exported");
        Ok(path)
    }

    fn read_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.path(file);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))
    }

    // ------------------------------------------------------------------------
    // Writers
    // ------------------------------------------------------------------------

    pub fn save_results(&self, results: &[CategoryResult]) -> Result<PathBuf> {
        self.write_json(RESULTS_FILE, results)
    }

    pub fn save_titles(&self, titles: &BTreeMap<String, u64>) -> Result<PathBuf> {
        self.write_json(TITLES_FILE, titles)
    }

    pub fn save_skills(&self, skills: &BTreeMap<String, u64>) -> Result<PathBuf> {
        self.write_json(SKILLS_FILE, skills)
    }

    pub fn save_cities(&self, cities: &BTreeMap<String, u64>) -> Result<PathBuf> {
        self.write_json(CITIES_FILE, cities)
    }

    /// locations.json plus the two map files derived from it
    pub fn save_locations(&self, locations: &[LocationRecord]) -> Result<()> {
        self.write_json(LOCATIONS_FILE, locations)?;
        self.write_json(LAT_LONG_FILE, &lat_long_map(locations))?;
        self.write_json(MAP_DATA_FILE, &map_data(locations))?;
        Ok(())
    }

    /// Ranked skills as chart arrays (JSON) and a rank,skill,count table (CSV)
    pub fn save_skill_ranking(&self, ranked: &[RankedEntry], chart: &ChartArrays) -> Result<()> {
        self.write_json(SKILLS_CHART_FILE, chart)?;

        let path = self.path(SKILLS_CSV_FILE);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(["rank", "skill", "count"])?;
        for (i, entry) in ranked.iter().enumerate() {
            writer.write_record([(i + 1).to_string(), entry.pattern.clone(), entry.count.to_string()])?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(file = %path.display(), "exported");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Loaders
    // ------------------------------------------------------------------------

    pub fn load_results(&self) -> Result<Vec<CategoryResult>> {
        self.read_json(RESULTS_FILE)
    }

    pub fn load_titles(&self) -> Result<BTreeMap<String, u64>> {
        self.read_json(TITLES_FILE)
    }

    pub fn load_skills(&self) -> Result<BTreeMap<String, u64>> {
        self.read_json(SKILLS_FILE)
    }

    pub fn load_cities(&self) -> Result<BTreeMap<String, u64>> {
        self.read_json(CITIES_FILE)
    }

    pub fn load_locations(&self) -> Result<Vec<LocationRecord>> {
        self.read_json(LOCATIONS_FILE)
    }

    pub fn load_skill_chart(&self) -> Result<ChartArrays> {
        self.read_json(SKILLS_CHART_FILE)
    }
}

// ============================================================================
// TESTS
// ============================================================================
