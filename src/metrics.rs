use crate::catalog::Metric;
use crate::error::{ReportError, Result};
use crate::stats;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One raw measurement read from a verbose metrics file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub metric: Metric,
    pub tick: u64,
    pub run: u32,
    /// Nanoseconds
    pub value: f64,
}

/// Statistical reduction of a set of samples, in the unit of the input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAggregate {
    pub average: f64,
    pub standard_deviation: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub median: f64,
}

impl MetricAggregate {
    /// Reduce `values` with the five statistical primitives
    pub fn from_values(values: &[f64]) -> Result<Self> {
        Ok(Self {
            average: stats::mean(values)?,
            standard_deviation: stats::population_std_dev(values)?,
            minimum: stats::minimum(values)?,
            maximum: stats::maximum(values)?,
            median: stats::median(values)?,
        })
    }

    /// Same as [`from_values`](Self::from_values) but replaces the generic
    /// empty-input context with a caller supplied one.
    pub fn from_values_in(values: &[f64], context: impl FnOnce() -> String) -> Result<Self> {
        if values.is_empty() {
            return Err(ReportError::empty(context()));
        }
        Self::from_values(values)
    }
}

/// Aggregate of one metric over a single run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunAggregate {
    pub run: u32,
    #[serde(flatten)]
    pub stats: MetricAggregate,
}

/// Aggregate of one metric over every run at a single tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickAggregate {
    pub tick: u64,
    #[serde(flatten)]
    pub stats: MetricAggregate,
}

/// A single `(tick, value)` point of a time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub tick: u64,
    pub value: f64,
}

impl MetricValue {
    pub fn new(tick: u64, value: f64) -> Self {
        Self { tick, value }
    }
}

/// Time-weighted average over the half-open tick span `[window_start, window_end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowedPoint {
    pub window_start: u64,
    pub window_end: u64,
    pub value: f64,
}

/// Which scalar of a [`MetricAggregate`] represents "the" value of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    #[default]
    Average,
    Minimum,
    Maximum,
    Median,
    StandardDeviation,
}

impl AggregationStrategy {
    pub const ALL: [AggregationStrategy; 5] = [
        AggregationStrategy::Average,
        AggregationStrategy::Minimum,
        AggregationStrategy::Maximum,
        AggregationStrategy::Median,
        AggregationStrategy::StandardDeviation,
    ];

    /// Pick the field of `aggregate` this strategy stands for
    pub fn select(&self, aggregate: &MetricAggregate) -> f64 {
        match self {
            AggregationStrategy::Average => aggregate.average,
            AggregationStrategy::Minimum => aggregate.minimum,
            AggregationStrategy::Maximum => aggregate.maximum,
            AggregationStrategy::Median => aggregate.median,
            AggregationStrategy::StandardDeviation => aggregate.standard_deviation,
        }
    }

    /// Reduce a plain list of values the way this strategy reduces a set
    pub fn reduce(&self, values: &[f64]) -> Result<f64> {
        match self {
            AggregationStrategy::Average => stats::mean(values),
            AggregationStrategy::Minimum => stats::minimum(values),
            AggregationStrategy::Maximum => stats::maximum(values),
            AggregationStrategy::Median => stats::median(values),
            AggregationStrategy::StandardDeviation => stats::population_std_dev(values),
        }
    }

    /// The configuration string, e.g. `standard_deviation`
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationStrategy::Average => "average",
            AggregationStrategy::Minimum => "minimum",
            AggregationStrategy::Maximum => "maximum",
            AggregationStrategy::Median => "median",
            AggregationStrategy::StandardDeviation => "standard_deviation",
        }
    }

    /// Title-case label for chart titles
    pub fn label(&self) -> &'static str {
        match self {
            AggregationStrategy::Average => "Average",
            AggregationStrategy::Minimum => "Minimum",
            AggregationStrategy::Maximum => "Maximum",
            AggregationStrategy::Median => "Median",
            AggregationStrategy::StandardDeviation => "Standard Deviation",
        }
    }

    /// Compact label used where horizontal space is scarce
    pub fn short_label(&self) -> &'static str {
        match self {
            AggregationStrategy::StandardDeviation => "σ",
            other => other.label(),
        }
    }

    /// Suffix of the flattened CSV table columns, e.g. `wholeUpdate_median`
    pub fn column_suffix(&self) -> &'static str {
        match self {
            AggregationStrategy::StandardDeviation => "standardDeviation",
            other => other.as_str(),
        }
    }

    fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|strategy| strategy.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for AggregationStrategy {
    type Err = ReportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ReportError::InvalidAggregationStrategy {
                input: s.to_string(),
                allowed: Self::allowed(),
            })
    }
}

impl std::fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
