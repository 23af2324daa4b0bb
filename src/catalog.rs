//! # Metric Catalog
//!
//! The closed set of verbose metrics the benchmark harness can emit. Every
//! metric name that enters the pipeline, whether from a CSV header or from the
//! `--metrics` filter, is resolved through a [`MetricCatalog`] so that a typo
//! fails loudly instead of producing an empty series.
//!
//! The catalog is an ordinary value: build it once with
//! [`MetricCatalog::builtin`] and pass it by reference to whoever needs
//! lookups.

use crate::error::{ReportError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// A known metric: the CSV column name and its display description
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Metric {
    pub name: &'static str,
    pub description: &'static str,
}

impl Metric {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Total time of a tick. Every input file must carry this column.
pub const WHOLE_UPDATE: Metric = Metric::new("wholeUpdate", "Whole Update");
pub const ENTITY_UPDATE: Metric = Metric::new("entityUpdate", "Entity Update");
pub const CONTROL_BEHAVIOR_UPDATE: Metric =
    Metric::new("controlBehaviorUpdate", "Control Behavior Update");
pub const TRANSPORT_LINES_UPDATE: Metric =
    Metric::new("transportLinesUpdate", "Transport Lines Update");
pub const ELECTRIC_HEAT_FLUID_CIRCUIT_UPDATE: Metric = Metric::new(
    "electricHeatFluidCircuitUpdate",
    "Electric/Heat/Fluid Circuit Update",
);
pub const SPACE_PLATFORMS: Metric = Metric::new("spacePlatforms", "Space Platforms");
pub const TRAINS: Metric = Metric::new("trains", "Trains");
/// Catch-all for whole-update time not attributed to a displayed metric
pub const OTHER: Metric = Metric::new("other", "Other");

const BUILTIN_METRICS: &[Metric] = &[
    WHOLE_UPDATE,
    Metric::new("latencyUpdate", "Latency Update"),
    Metric::new("gameUpdate", "Game Update"),
    Metric::new("planetsUpdate", "Planets Update"),
    CONTROL_BEHAVIOR_UPDATE,
    TRANSPORT_LINES_UPDATE,
    ELECTRIC_HEAT_FLUID_CIRCUIT_UPDATE,
    Metric::new("electricNetworkUpdate", "Electric Network Update"),
    Metric::new("heatNetworkUpdate", "Heat Network Update"),
    Metric::new("fluidFlowUpdate", "Fluid Flow Update"),
    ENTITY_UPDATE,
    Metric::new("lightningUpdate", "Lightning Update"),
    Metric::new("tileHeatingUpdate", "Tile Heating Update"),
    Metric::new("particleUpdate", "Particle Update"),
    Metric::new("mapGenerator", "Map Generator"),
    Metric::new(
        "mapGeneratorBasicTilesSupportCompute",
        "Map Generator Basic Tiles Support Compute",
    ),
    Metric::new(
        "mapGeneratorBasicTilesSupportApply",
        "Map Generator Basic Tiles Support Apply",
    ),
    Metric::new(
        "mapGeneratorCorrectedTilesPrepare",
        "Map Generator Corrected Tiles Prepare",
    ),
    Metric::new(
        "mapGeneratorCorrectedTilesCompute",
        "Map Generator Corrected Tiles Compute",
    ),
    Metric::new(
        "mapGeneratorCorrectedTilesApply",
        "Map Generator Corrected Tiles Apply",
    ),
    Metric::new("mapGeneratorEntitiesApply", "Map Generator Entities Apply"),
    Metric::new("mapGeneratorEntitiesCompute", "Map Generator Entities Compute"),
    Metric::new("mapGeneratorEntitiesPrepare", "Map Generator Entities Prepare"),
    Metric::new("mapGeneratorVariations", "Map Generator Variations"),
    SPACE_PLATFORMS,
    Metric::new("collectorNavMesh", "Collector Nav Mesh"),
    Metric::new(
        "collectorNavMeshPathfinding",
        "Collector Nav Mesh Pathfinding",
    ),
    Metric::new("collectorNavMeshRaycast", "Collector Nav Mesh Raycast"),
    Metric::new("crcComputation", "Crc Computation"),
    Metric::new("consistencyScraper", "Consistency Scraper"),
    Metric::new("logisticManagerUpdate", "Logistic Manager Update"),
    Metric::new("constructionManagerUpdate", "Construction Manager Update"),
    Metric::new("pathFinder", "Path Finder"),
    TRAINS,
    Metric::new("trainPathFinder", "Train Path Finder"),
    Metric::new("commander", "Commander"),
    Metric::new("luaGarbageIncremental", "Lua Garbage Incremental"),
    Metric::new("chartRefresh", "Chart Refresh"),
    Metric::new("chartUpdate", "Chart Update"),
    Metric::new("scriptUpdate", "Script Update"),
    OTHER,
];

/// Metrics drawn as stacked segments of the summary chart, in legend order
pub const SUMMARY_METRICS: &[Metric] = &[
    ENTITY_UPDATE,
    CONTROL_BEHAVIOR_UPDATE,
    TRANSPORT_LINES_UPDATE,
    ELECTRIC_HEAT_FLUID_CIRCUIT_UPDATE,
    SPACE_PLATFORMS,
    TRAINS,
    OTHER,
];

/// Metrics drawn as series of the per-tick line/bar chart
pub const TIME_SERIES_METRICS: &[Metric] = &[
    ENTITY_UPDATE,
    TRAINS,
    CONTROL_BEHAVIOR_UPDATE,
    TRANSPORT_LINES_UPDATE,
    ELECTRIC_HEAT_FLUID_CIRCUIT_UPDATE,
    SPACE_PLATFORMS,
];

/// Immutable registry of known metrics, keyed by column name
#[derive(Clone, Debug)]
pub struct MetricCatalog {
    metrics: Vec<Metric>,
    index: HashMap<&'static str, usize>,
}

impl MetricCatalog {
    /// Build a catalog from the given metrics
    ///
    /// Order is preserved. A later metric with an already registered name
    /// replaces the earlier entry in place.
    pub fn new(metrics: impl IntoIterator<Item = Metric>) -> Self {
        let mut catalog = Self {
            metrics: Vec::new(),
            index: HashMap::new(),
        };
        for metric in metrics {
            match catalog.index.get(metric.name) {
                Some(&position) => catalog.metrics[position] = metric,
                None => {
                    catalog.index.insert(metric.name, catalog.metrics.len());
                    catalog.metrics.push(metric);
                }
            }
        }
        catalog
    }

    /// The full set of verbose metrics emitted by the harness
    pub fn builtin() -> Self {
        Self::new(BUILTIN_METRICS.iter().copied())
    }

    pub fn lookup(&self, name: &str) -> Option<Metric> {
        self.index.get(name).map(|&position| self.metrics[position])
    }

    /// Resolve a metric name, failing with [`ReportError::UnknownMetric`]
    pub fn lookup_or_err(&self, name: &str) -> Result<Metric> {
        self.lookup(name).ok_or_else(|| ReportError::UnknownMetric {
            name: name.to_string(),
        })
    }

    pub fn all(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Parse a metric filter: `*` selects every metric, otherwise a
    /// comma-separated list of names, each of which must be known.
    pub fn parse_filter(&self, spec: &str) -> Result<Vec<Metric>> {
        let spec = spec.trim();
        if spec == "*" {
            return Ok(self.metrics.clone());
        }
        spec.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| self.lookup_or_err(name))
            .collect()
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_contents() {
        let catalog = MetricCatalog::builtin();
        assert_eq!(catalog.len(), 41);
        assert_eq!(catalog.all()[0], WHOLE_UPDATE);
        assert_eq!(catalog.all().last(), Some(&OTHER));
        assert_eq!(
            catalog.lookup("pathFinder").map(|m| m.description),
            Some("Path Finder")
        );
        for metric in SUMMARY_METRICS.iter().chain(TIME_SERIES_METRICS) {
            assert_eq!(catalog.lookup(metric.name), Some(*metric));
        }
    }

    #[test]
    fn test_unknown_metric_names_the_key() {
        let catalog = MetricCatalog::builtin();
        assert!(catalog.lookup("wholeUpdat").is_none());
        match catalog.lookup_or_err("wholeUpdat") {
            Err(ReportError::UnknownMetric { name }) => assert_eq!(name, "wholeUpdat"),
            other => panic!("expected UnknownMetric, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_filter() {
        let catalog = MetricCatalog::builtin();
        assert_eq!(catalog.parse_filter("*").unwrap().len(), catalog.len());
        assert_eq!(
            catalog.parse_filter("trains, entityUpdate").unwrap(),
            vec![TRAINS, ENTITY_UPDATE]
        );
        assert!(matches!(
            catalog.parse_filter("trains,bogus"),
            Err(ReportError::UnknownMetric { name }) if name == "bogus"
        ));
    }

    #[test]
    fn test_duplicate_registration_replaces_in_place() {
        let catalog = MetricCatalog::new([
            WHOLE_UPDATE,
            TRAINS,
            Metric::new("wholeUpdate", "Tick Total"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.all()[0].description, "Tick Total");
        assert_eq!(catalog.all()[1], TRAINS);
    }
}
