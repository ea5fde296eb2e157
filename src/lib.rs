// Hiring Trends - Core Library
// Text-signal extraction over monthly "Who is hiring?" threads

pub mod matcher;
pub mod registry;
pub mod comments;
pub mod aggregate;
pub mod reduce;
pub mod net;
pub mod source;
pub mod geocode;
pub mod config;
pub mod store;
pub mod export;
pub mod logging;
pub mod pipeline;

// Re-export commonly used types
pub use matcher::{matches, Matcher};
pub use registry::{PatternRegistry, RegistryEntry, RegistryKind};
pub use comments::{collect_bodies, TextItem, Traversal};
pub use aggregate::{Aggregator, CategoryResult, MonthAnalysis, Perk, PerkCounts, RunTally};
pub use reduce::{chart_arrays, rank, series, CategorySeries, ChartArrays, MonthPoint, RankedEntry};
pub use source::{CommentSource, HnApiSource, HnSettings, SnapshotSource};
pub use geocode::{
    geocode_all, merge_geocode, records_from_tally,
    Coordinates, GeocodeCandidate, GeocodeSource, GooglePlacesGeocoder, LocationRecord,
};
pub use config::Config;
pub use export::Exporter;
pub use pipeline::{Pipeline, PipelineOptions, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
