//! # Per-Run and Per-Tick Aggregation
//!
//! Reduces the raw samples of one verbose metrics file into the two result
//! shapes the charts consume:
//!
//! - [`AggregateRunResult`]: one aggregate per (metric, run) plus one pooled
//!   aggregate per metric over every retained sample ("all"). Used by the
//!   summary chart, the boxplot and the CSV table.
//! - [`TickResult`]: one aggregate per (metric, tick), pooling every run that
//!   produced that tick. Used by the line and bar charts.
//!
//! Grouping is a single fold into ordered maps, so results are deterministic:
//! runs and ticks always come out ascending.

use crate::catalog::Metric;
use crate::error::Result;
use crate::metrics::{
    AggregationStrategy, MetricAggregate, MetricSample, MetricValue, RunAggregate, TickAggregate,
};
use crate::parser::SampleTable;
use crate::utils::trim_prefix;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Tick bounds applied before per-run aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickFilter {
    /// Samples with `tick <= remove_first_ticks` are discarded
    pub remove_first_ticks: u64,
    /// When non-zero, samples with `tick > max_tick` are discarded
    pub max_tick: u64,
}

impl TickFilter {
    pub fn new(remove_first_ticks: u64, max_tick: u64) -> Self {
        Self {
            remove_first_ticks,
            max_tick,
        }
    }

    pub fn retains(&self, tick: u64) -> bool {
        if tick <= self.remove_first_ticks {
            return false;
        }
        self.max_tick == 0 || tick <= self.max_tick
    }
}

/// Per-run and pooled aggregates of one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRunResult {
    pub file_name: String,
    pub metrics: Vec<Metric>,
    /// Metric name to its run aggregates, ascending by run
    pub runs: BTreeMap<&'static str, Vec<RunAggregate>>,
    /// Metric name to the aggregate over every retained sample
    pub all: BTreeMap<&'static str, MetricAggregate>,
}

impl AggregateRunResult {
    /// Aggregate a parsed table over the metrics it tracks
    pub fn from_table(table: &SampleTable, filter: &TickFilter) -> Result<Self> {
        aggregate_runs(&table.file_name, table.samples(), &table.metrics, filter)
    }

    pub fn runs_for(&self, metric: &Metric) -> &[RunAggregate] {
        self.runs.get(metric.name).map_or(&[], Vec::as_slice)
    }

    pub fn all_for(&self, metric: &Metric) -> Option<&MetricAggregate> {
        self.all.get(metric.name)
    }

    /// Aggregate of `metric` in `run`, if that run retained any sample of it
    pub fn run_for(&self, metric: &Metric, run: u32) -> Option<&RunAggregate> {
        self.runs_for(metric).iter().find(|aggregate| aggregate.run == run)
    }

    /// Every run id that produced at least one aggregate, ascending
    pub fn run_ids(&self) -> Vec<u32> {
        self.runs
            .values()
            .flatten()
            .map(|aggregate| aggregate.run)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Copy of this result whose display name has `prefix` removed
    pub fn with_trimmed_prefix(&self, prefix: &str) -> Self {
        Self {
            file_name: trim_prefix(&self.file_name, prefix),
            ..self.clone()
        }
    }
}

/// Aggregate samples per run and across all runs
///
/// Samples outside `filter` are dropped first. Samples of metrics not listed
/// in `metrics` are ignored. A (run, metric) pair without retained samples
/// has no aggregate; a metric without any retained sample at all is an
/// [`EmptyInput`](crate::error::ReportError::EmptyInput) error and no result
/// is produced.
pub fn aggregate_runs(
    file_name: &str,
    samples: impl IntoIterator<Item = MetricSample>,
    metrics: &[Metric],
    filter: &TickFilter,
) -> Result<AggregateRunResult> {
    let tracked: BTreeSet<&'static str> = metrics.iter().map(|metric| metric.name).collect();

    let mut discarded = 0usize;
    let by_run = samples.into_iter().fold(
        BTreeMap::<u32, BTreeMap<&'static str, Vec<f64>>>::new(),
        |mut groups, sample| {
            if !tracked.contains(sample.metric.name) {
                return groups;
            }
            if !filter.retains(sample.tick) {
                discarded += 1;
                return groups;
            }
            groups
                .entry(sample.run)
                .or_default()
                .entry(sample.metric.name)
                .or_default()
                .push(sample.value);
            groups
        },
    );

    debug!(
        "{}: {} runs retained, {} samples outside {:?}",
        file_name,
        by_run.len(),
        discarded,
        filter
    );

    let mut runs = BTreeMap::new();
    let mut all = BTreeMap::new();
    for metric in metrics {
        let mut run_aggregates = Vec::new();
        let mut pooled = Vec::new();
        for (&run, values_by_metric) in &by_run {
            let Some(values) = values_by_metric.get(metric.name) else {
                continue;
            };
            run_aggregates.push(RunAggregate {
                run,
                stats: MetricAggregate::from_values(values)?,
            });
            pooled.extend_from_slice(values);
        }

        let overall = MetricAggregate::from_values_in(&pooled, || {
            format!(
                "{}: no samples of '{}' left after tick filtering",
                file_name, metric.name
            )
        })?;

        runs.insert(metric.name, run_aggregates);
        all.insert(metric.name, overall);
    }

    Ok(AggregateRunResult {
        file_name: file_name.to_string(),
        metrics: metrics.to_vec(),
        runs,
        all,
    })
}

/// Per-tick aggregates of one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickResult {
    pub file_name: String,
    pub metrics: Vec<Metric>,
    /// Metric name to its tick aggregates, ascending by tick
    pub metric_tick_stats: BTreeMap<&'static str, Vec<TickAggregate>>,
}

impl TickResult {
    /// Aggregate a parsed table per tick over the metrics it tracks
    pub fn from_table(table: &SampleTable) -> Result<Self> {
        aggregate_ticks(&table.file_name, table.samples(), &table.metrics)
    }

    pub fn ticks_for(&self, metric: &Metric) -> &[TickAggregate] {
        self.metric_tick_stats
            .get(metric.name)
            .map_or(&[], Vec::as_slice)
    }

    /// New result keeping only ticks strictly greater than `ticks_to_ignore`
    ///
    /// The receiver is left untouched.
    pub fn ignore_first_ticks(&self, ticks_to_ignore: u64) -> Self {
        let metric_tick_stats = self
            .metric_tick_stats
            .iter()
            .map(|(&name, stats)| {
                let kept = stats
                    .iter()
                    .filter(|stat| stat.tick > ticks_to_ignore)
                    .copied()
                    .collect();
                (name, kept)
            })
            .collect();

        Self {
            file_name: self.file_name.clone(),
            metrics: self.metrics.clone(),
            metric_tick_stats,
        }
    }

    /// The series of `metric`, one strategy-selected value per tick
    pub fn series(&self, metric: &Metric, strategy: AggregationStrategy) -> Vec<MetricValue> {
        self.ticks_for(metric)
            .iter()
            .map(|stat| MetricValue::new(stat.tick, strategy.select(&stat.stats)))
            .collect()
    }

    /// Copy of this result whose display name has `prefix` removed
    pub fn with_trimmed_prefix(&self, prefix: &str) -> Self {
        Self {
            file_name: trim_prefix(&self.file_name, prefix),
            ..self.clone()
        }
    }
}

/// Aggregate samples per tick, pooling every run that produced the tick
pub fn aggregate_ticks(
    file_name: &str,
    samples: impl IntoIterator<Item = MetricSample>,
    metrics: &[Metric],
) -> Result<TickResult> {
    let tracked: BTreeSet<&'static str> = metrics.iter().map(|metric| metric.name).collect();

    let by_metric = samples
        .into_iter()
        .filter(|sample| tracked.contains(sample.metric.name))
        .fold(
            BTreeMap::<&'static str, BTreeMap<u64, Vec<f64>>>::new(),
            |mut groups, sample| {
                groups
                    .entry(sample.metric.name)
                    .or_default()
                    .entry(sample.tick)
                    .or_default()
                    .push(sample.value);
                groups
            },
        );

    let mut metric_tick_stats = BTreeMap::new();
    for metric in metrics {
        let ticks = match by_metric.get(metric.name) {
            Some(values_by_tick) => values_by_tick
                .iter()
                .map(|(&tick, values)| {
                    Ok(TickAggregate {
                        tick,
                        stats: MetricAggregate::from_values(values)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        metric_tick_stats.insert(metric.name, ticks);
    }

    debug!(
        "{}: aggregated {} metrics per tick",
        file_name,
        metric_tick_stats.len()
    );

    Ok(TickResult {
        file_name: file_name.to_string(),
        metrics: metrics.to_vec(),
        metric_tick_stats,
    })
}
