use crate::aggregate::TickFilter;
use crate::catalog::{Metric, MetricCatalog, WHOLE_UPDATE};
use crate::metrics::AggregationStrategy;
use crate::parser::MetricSchema;
use crate::utils::milli_to_micro;
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbose Charts - turn benchmark verbose metrics into chart documents and tables
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Glob pattern for the CSV files (e.g. './data/*.csv')
    pub pattern: String,

    /// Type of output to generate
    #[clap(short = 't', long = "type", value_enum, default_value_t = ChartType::Summary)]
    pub chart_type: ChartType,

    /// Output file; per-file documents and tables are written next to it
    #[clap(short = 'o', long, default_value = crate::defaults::OUTPUT_FILE)]
    pub output: PathBuf,

    /// Remove the first N ticks from the data (to ignore initialization spikes)
    #[clap(long, default_value_t = crate::defaults::REMOVE_FIRST_TICKS)]
    pub remove_first_ticks: u64,

    /// Max tick to include in charts (0 includes every tick)
    #[clap(long, default_value_t = 0)]
    pub max_ticks: u64,

    /// Max update time to plot, in milliseconds
    #[clap(long)]
    pub max_update: Option<f64>,

    /// Trim this prefix from the map names
    #[clap(long, default_value = "")]
    pub trim_prefix: String,

    /// Include the comparison table in the summary chart
    #[clap(long, default_value_t = true, action = ArgAction::Set)]
    pub summary_table: bool,

    /// Time-weight line charts over windows of N ticks (0 picks automatically)
    #[clap(long, default_value_t = 0)]
    pub tick_window_aggregation: u64,

    /// Comma separated list of metrics to use, or '*' for all of them
    #[clap(long, default_value = crate::defaults::METRICS)]
    pub metrics: String,

    /// How runs are reduced to one value: average, minimum, maximum, median or standard_deviation
    #[clap(short = 'a', long, default_value = crate::defaults::AGGREGATE_STRATEGY)]
    pub aggregate_strategy: String,

    /// Standard deviations above the mean before a run counts as an outlier
    #[clap(long, default_value_t = crate::defaults::STD_DEVIATIONS)]
    pub std_deviations: f64,

    /// Skip files that fail instead of aborting
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Kinds of output the tool can produce
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ChartType {
    /// Stacked per-phase comparison of every file
    Summary,

    /// Time series per file, drawn as lines
    Line,

    /// Time series per file, drawn as bars
    Bar,

    /// Distribution of per-run whole update times
    Boxplot,

    /// Per-run statistics as CSV
    Table,

    /// Run summary outliers beyond the configured standard deviations
    Outliers,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Summary => "summary",
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Boxplot => "boxplot",
            ChartType::Table => "table",
            ChartType::Outliers => "outliers",
        }
    }

    /// Whether the output is built from per-tick rather than per-run aggregates
    pub fn is_time_series(&self) -> bool {
        matches!(self, ChartType::Line | ChartType::Bar)
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated configuration for one report
#[derive(Clone, Debug, Serialize)]
pub struct ReportConfig {
    pub files: Vec<PathBuf>,
    pub chart_type: ChartType,
    pub output: PathBuf,
    pub tick_filter: TickFilter,
    pub max_ticks: u64,
    /// Y-axis ceiling in microseconds
    pub max_update: Option<f64>,
    pub trim_prefix: String,
    pub summary_table: bool,
    pub tick_window: u64,
    /// Requested metrics; `None` when every metric is wanted
    pub metrics: Option<Vec<Metric>>,
    pub strategy: AggregationStrategy,
    pub std_deviations: f64,
    pub continue_on_error: bool,
}

impl ReportConfig {
    /// Validate the arguments and expand the input pattern
    pub fn from_args(args: &Args, catalog: &MetricCatalog) -> Result<Self> {
        let strategy: AggregationStrategy = args
            .aggregate_strategy
            .parse()
            .context("Invalid --aggregate-strategy")?;

        let metrics = match args.metrics.trim() {
            "*" => None,
            filter => Some(
                catalog
                    .parse_filter(filter)
                    .context("Invalid --metrics filter")?,
            ),
        };

        if let Some(max_update) = args.max_update {
            if !(max_update.is_finite() && max_update > 0.0) {
                bail!("--max-update must be a positive number of milliseconds");
            }
        }
        if !(args.std_deviations.is_finite() && args.std_deviations >= 0.0) {
            bail!("--std-deviations must be a non-negative number");
        }

        let files = expand_pattern(&args.pattern)?;

        Ok(Self {
            files,
            chart_type: args.chart_type,
            output: args.output.clone(),
            tick_filter: TickFilter::new(args.remove_first_ticks, args.max_ticks),
            max_ticks: args.max_ticks,
            max_update: args.max_update.map(milli_to_micro),
            trim_prefix: args.trim_prefix.clone(),
            summary_table: args.summary_table,
            tick_window: args.tick_window_aggregation,
            metrics,
            strategy,
            std_deviations: args.std_deviations,
            continue_on_error: args.continue_on_error,
        })
    }

    /// Schema used to read every input file
    ///
    /// An explicit metric filter is validated against each header; the whole
    /// update column is always tracked since every chart derives from it.
    pub fn schema(&self) -> MetricSchema {
        match &self.metrics {
            None => MetricSchema::Infer,
            Some(requested) => {
                let mut expected = vec![WHOLE_UPDATE];
                expected.extend(requested.iter().filter(|metric| **metric != WHOLE_UPDATE));
                MetricSchema::Expect(expected)
            }
        }
    }
}

/// Expand a glob pattern into the matching files, sorted by path
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries =
        glob::glob(pattern).with_context(|| format!("Invalid glob pattern {}", pattern))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Failed to read a match of {}", pattern))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        bail!("No files matched the given pattern {}", pattern);
    }
    Ok(files)
}
