// 📍 Location Geocoding - City mentions to coordinates
//
// First candidate wins. A city with no candidate keeps `coordinates: None`,
// which is distinct from a real (0.0, 0.0).

use crate::net::{HttpClient, HttpSettings, Throttle};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One geocoder answer for a place name
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodeCandidate {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<GeocodeCandidate> for Coordinates {
    fn from(c: GeocodeCandidate) -> Self {
        Coordinates {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}

/// LocationRecord - a city, its mention count, and coordinates once known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LocationRow", into = "LocationRow")]
pub struct LocationRecord {
    pub city: String,
    pub coordinates: Option<Coordinates>,
    pub count: u64,
}

impl LocationRecord {
    pub fn new(city: impl Into<String>, count: u64) -> Self {
        LocationRecord {
            city: city.into(),
            coordinates: None,
            count,
        }
    }

    pub fn is_geocoded(&self) -> bool {
        self.coordinates.is_some()
    }
}

// Flat on-disk shape: {"city", "lat", "long", "count"}, lat/long null when unknown
#[derive(Serialize, Deserialize)]
struct LocationRow {
    city: String,
    lat: Option<f64>,
    long: Option<f64>,
    count: u64,
}

impl From<LocationRow> for LocationRecord {
    fn from(row: LocationRow) -> Self {
        let coordinates = match (row.lat, row.long) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        LocationRecord {
            city: row.city,
            coordinates,
            count: row.count,
        }
    }
}

impl From<LocationRecord> for LocationRow {
    fn from(record: LocationRecord) -> Self {
        LocationRow {
            city: record.city,
            lat: record.coordinates.map(|c| c.latitude),
            long: record.coordinates.map(|c| c.longitude),
            count: record.count,
        }
    }
}

/// Records for every city with at least one mention, busiest first
pub fn records_from_tally(tally: &BTreeMap<String, u64>) -> Vec<LocationRecord> {
    let mut records: Vec<LocationRecord> = tally
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(city, &count)| LocationRecord::new(city.clone(), count))
        .collect();
    records.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.city.cmp(&b.city)));
    records
}

// ============================================================================
// MERGE
// ============================================================================

/// Apply geocoder answers keyed by city.
///
/// Only the first candidate is used; an empty answer clears the
/// coordinates. Cities with no answer at all (lookup failed) are left as
/// they were.
pub fn merge_geocode(
    mut records: Vec<LocationRecord>,
    responses: &HashMap<String, Vec<GeocodeCandidate>>,
) -> Vec<LocationRecord> {
    for record in &mut records {
        if let Some(candidates) = responses.get(&record.city) {
            record.coordinates = candidates.first().map(|&c| c.into());
        }
    }
    records
}

/// Geocode every record, one lookup at a time.
///
/// A failed lookup is logged and leaves that record un-geocoded.
pub fn geocode_all(
    records: Vec<LocationRecord>,
    source: &dyn GeocodeSource,
    throttle: &mut Throttle,
) -> Vec<LocationRecord> {
    let mut responses = HashMap::new();

    for record in &records {
        throttle.wait();
        match source.lookup(&record.city) {
            Ok(candidates) => {
                if candidates.is_empty() {
                    warn!(city = %record.city, "no geocode candidates");
                }
                responses.insert(record.city.clone(), candidates);
            }
            Err(e) => {
                warn!(city = %record.city, error = %format!("{:#}", e), "geocode lookup failed");
            }
        }
    }

    let merged = merge_geocode(records, &responses);
    info!(
        cities = merged.len(),
        geocoded = merged.iter().filter(|r| r.is_geocoded()).count(),
        "geocoding finished"
    );
    merged
}

// ============================================================================
// GEOCODE SOURCE
// ============================================================================

pub trait GeocodeSource {
    /// Candidates for a free-text place name, best first
    fn lookup(&self, place: &str) -> Result<Vec<GeocodeCandidate>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeSettings {
    pub endpoint: String,
    /// Spacing between lookups, in milliseconds
    pub interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GeocodeSettings {
    fn default() -> Self {
        GeocodeSettings {
            endpoint: "https://maps.googleapis.com/maps/api/place/findplacefromtext/json"
                .to_string(),
            interval_ms: 1_000,
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    candidates: Vec<PlaceCandidate>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceCandidate {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl PlacesResponse {
    fn into_candidates(self) -> Result<Vec<GeocodeCandidate>> {
        match self.status.as_deref() {
            None | Some("OK") | Some("ZERO_RESULTS") => {}
            Some(status) => bail!(
                "Geocoder returned {}: {}",
                status,
                self.error_message.as_deref().unwrap_or("no message")
            ),
        }

        Ok(self
            .candidates
            .into_iter()
            .map(|c| GeocodeCandidate {
                latitude: c.geometry.location.lat,
                longitude: c.geometry.location.lng,
            })
            .collect())
    }
}

/// Google Places "find place from text" lookup
pub struct GooglePlacesGeocoder {
    http: HttpClient,
    endpoint: String,
    api_key: String,
}

impl GooglePlacesGeocoder {
    pub fn new(settings: &GeocodeSettings, api_key: String, http: HttpSettings) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("Geocoding needs an API key");
        }
        Ok(GooglePlacesGeocoder {
            http: HttpClient::new(http)?,
            endpoint: settings.endpoint.clone(),
            api_key,
        })
    }
}

impl GeocodeSource for GooglePlacesGeocoder {
    fn lookup(&self, place: &str) -> Result<Vec<GeocodeCandidate>> {
        let response: PlacesResponse = self.http.get_json(
            &self.endpoint,
            &[
                ("key", self.api_key.as_str()),
                ("input", place),
                ("inputtype", "textquery"),
                ("fields", "geometry"),
            ],
        )?;
        response.into_candidates()
    }
}

// ============================================================================
// TESTS
// ============================================================================
