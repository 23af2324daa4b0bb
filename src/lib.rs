//! # Verbose Charts Library
//!
//! Turns the verbose per-tick metrics written by a game benchmark harness
//! into aggregated statistics and chart documents.
//!
//! Each input CSV holds one row per (tick, run) and one column per timed
//! update phase, in nanoseconds. The library reads those files, drops warm-up
//! ticks, reduces the samples per run, per tick and per time window, and
//! produces renderer-neutral chart documents or a flat CSV table.
//!
//! ## Architecture Overview
//!
//! - `catalog`: registry of known metric columns
//! - `parser`: CSV reading and header validation
//! - `aggregate`: per-run and per-tick reduction
//! - `window`: time-weighted averages over fixed tick windows
//! - `stats`: statistical primitives
//! - `charts`: summary, time series and box plot documents
//! - `results`: JSON and CSV output
//! - `run_results`: run summary outlier detection
//! - `cli`: command-line parsing and configuration
//!
//! ## Usage Example
//!
//! ```rust
//! use verbose_charts::{
//!     aggregate::{AggregateRunResult, TickFilter},
//!     catalog::{MetricCatalog, WHOLE_UPDATE},
//!     parser::{MetricSchema, SampleTable},
//! };
//!
//! let csv = "tick,run,wholeUpdate\n1,0,1000\n2,0,3000\n1,1,2000\n2,1,2000\n";
//! let table = SampleTable::from_reader(
//!     "base",
//!     csv.as_bytes(),
//!     &MetricCatalog::builtin(),
//!     &MetricSchema::Infer,
//! )?;
//! let result = AggregateRunResult::from_table(&table, &TickFilter::default())?;
//!
//! assert_eq!(result.all_for(&WHOLE_UPDATE).map(|all| all.average), Some(2000.0));
//! assert_eq!(result.runs_for(&WHOLE_UPDATE).len(), 2);
//! # Ok::<(), verbose_charts::error::ReportError>(())
//! ```

pub mod aggregate;

/// Metric registry
///
/// An explicitly constructed, immutable catalog of the metric columns the
/// harness can emit, passed by reference wherever names are resolved.
pub mod catalog;

pub mod charts;

/// Command-line interface and configuration
///
/// Provides argument parsing using clap and converts the raw options into
/// a validated [`ReportConfig`](cli::ReportConfig).
pub mod cli;

pub mod error;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod results;
pub mod run_results;
pub mod stats;
pub mod utils;
pub mod window;

pub use aggregate::{AggregateRunResult, TickFilter, TickResult};
pub use catalog::{Metric, MetricCatalog};
pub use cli::{Args, ChartType, ReportConfig};
pub use error::{ReportError, Result};
pub use metrics::{AggregationStrategy, MetricAggregate};
pub use parser::{MetricSchema, SampleTable};
pub use results::ReportWriter;

/// The current version of verbose-charts
///
/// Written into every JSON document for reproducibility.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default output file
    pub const OUTPUT_FILE: &str = "verbose_metrics.json";

    /// Ticks dropped from the start of every run
    ///
    /// One minute of game time covers map loading and the first autosave.
    pub const REMOVE_FIRST_TICKS: u64 = 3600;

    /// Default metric filter
    pub const METRICS: &str = "*";

    pub const AGGREGATE_STRATEGY: &str = "average";

    /// Runs above `mean + 3σ` are reported as outliers
    pub const STD_DEVIATIONS: f64 = 3.0;
}
