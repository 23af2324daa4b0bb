//! # Chart Documents
//!
//! Builds renderer-neutral chart documents from aggregated results. Every
//! document is a plain serde structure holding labels, datasets and axis
//! bounds, with all timings converted to microseconds. Rendering is left to
//! whatever consumes the JSON.
//!
//! ## Chart Types
//!
//! - **Summary**: one stacked horizontal bar per file, split into the
//!   top-level update phases, plus an optional comparison table
//! - **Line / Bar**: per-file time series of the phases, optionally
//!   time-weighted into fixed tick windows
//! - **Box Plot**: distribution of the per-run whole update time per file

use crate::aggregate::{AggregateRunResult, TickResult};
use crate::catalog::{Metric, OTHER, SUMMARY_METRICS, TIME_SERIES_METRICS, WHOLE_UPDATE};
use crate::error::{ReportError, Result};
use crate::metrics::{AggregationStrategy, MetricValue};
use crate::stats;
use crate::utils::{
    format_table_row, format_table_separator, nano_to_micro, percent_decrease, round_to,
};
use crate::window::{aggregate_by_window, auto_tick_window};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, warn};

/// Colorblind-safe palette
pub mod colors {
    pub const BLUE: &str = "#0072B2";
    pub const ORANGE: &str = "#E69F00";
    pub const YELLOW: &str = "#F0E442";
    pub const GREEN: &str = "#009E73";
    pub const SKY_BLUE: &str = "#56B4E9";
    pub const VERMILLION: &str = "#D55E00";
    pub const REDDISH_PURPLE: &str = "#CC79A7";
    pub const DARK_GREY: &str = "#585858";
    pub const WHITE: &str = "#FFFFFF";
    pub const BLACK: &str = "#000000";
}

pub const WHOLE_UPDATE_AVERAGE_LABEL: &str = "Whole Update Average";

fn metric_color(name: &str) -> &'static str {
    match name {
        "entityUpdate" => colors::BLUE,
        "controlBehaviorUpdate" => colors::REDDISH_PURPLE,
        "transportLinesUpdate" => colors::GREEN,
        "electricHeatFluidCircuitUpdate" => colors::ORANGE,
        "spacePlatforms" => colors::VERMILLION,
        "trains" => colors::YELLOW,
        "wholeUpdate" => colors::WHITE,
        _ => colors::DARK_GREY,
    }
}

/// Options for [`build_summary_chart`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryOptions {
    pub strategy: AggregationStrategy,
    /// Restrict the bars to these metrics; `None` shows every summary metric
    pub metrics: Option<Vec<Metric>>,
    /// Attach the comparison table to the document
    pub include_table: bool,
}

/// One metric of one file in the summary chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEntry {
    pub metric: &'static str,
    pub description: &'static str,
    /// Strategy-selected value in microseconds
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

/// Every entry of one file, phases first (descending), then other and whole update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryColumn {
    pub file_name: String,
    pub whole_update: f64,
    pub entries: Vec<SummaryEntry>,
}

impl SummaryColumn {
    pub fn value_of(&self, metric: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.metric == metric)
            .map(|entry| entry.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarDataset {
    pub metric: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    /// One value per file, aligned with [`SummaryChart::labels`]
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTableRow {
    pub label: String,
    /// Cells are percentages rather than microseconds
    pub percent: bool,
    pub cells: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub header: Vec<String>,
    pub rows: Vec<SummaryTableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryChart {
    pub title: String,
    pub x_axis_label: String,
    pub strategy: AggregationStrategy,
    /// File names, ascending by whole update time
    pub labels: Vec<String>,
    pub datasets: Vec<BarDataset>,
    pub columns: Vec<SummaryColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<SummaryTable>,
}

fn summary_entry(metric: &Metric, value: f64, range: Option<(f64, f64)>) -> SummaryEntry {
    SummaryEntry {
        metric: metric.name,
        description: metric.description,
        value,
        minimum: range.map(|(minimum, _)| minimum),
        maximum: range.map(|(_, maximum)| maximum),
    }
}

fn summary_column(
    result: &AggregateRunResult,
    displayed: &[Metric],
    strategy: AggregationStrategy,
) -> Result<SummaryColumn> {
    let whole = result.all_for(&WHOLE_UPDATE).ok_or_else(|| {
        ReportError::empty(format!(
            "no {} metric values found in {}",
            WHOLE_UPDATE.name, result.file_name
        ))
    })?;
    let whole_update = nano_to_micro(strategy.select(whole));

    let mut entries: Vec<SummaryEntry> = result
        .metrics
        .iter()
        .filter(|metric| **metric != WHOLE_UPDATE && **metric != OTHER)
        .filter(|metric| displayed.contains(metric))
        .filter_map(|metric| {
            result.all_for(metric).map(|aggregate| {
                summary_entry(
                    metric,
                    nano_to_micro(strategy.select(aggregate)),
                    Some((
                        nano_to_micro(aggregate.minimum),
                        nano_to_micro(aggregate.maximum),
                    )),
                )
            })
        })
        .collect();
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));

    let sum_of_parts: f64 = entries.iter().map(|entry| entry.value).sum();
    entries.push(summary_entry(&OTHER, whole_update - sum_of_parts, None));
    entries.push(summary_entry(
        &WHOLE_UPDATE,
        whole_update,
        Some((
            nano_to_micro(whole.minimum),
            nano_to_micro(whole.maximum),
        )),
    ));

    Ok(SummaryColumn {
        file_name: result.file_name.clone(),
        whole_update,
        entries,
    })
}

/// Build the stacked summary chart comparing every file
///
/// Files are ordered by ascending whole update time, so the first column is
/// the best one. `other` absorbs whatever the displayed phases do not cover.
pub fn build_summary_chart(
    results: &[AggregateRunResult],
    options: &SummaryOptions,
) -> Result<SummaryChart> {
    if results.is_empty() {
        return Err(ReportError::empty("summary chart without any input file"));
    }

    let displayed: Vec<Metric> = SUMMARY_METRICS
        .iter()
        .filter(|metric| {
            options
                .metrics
                .as_ref()
                .map_or(true, |requested| requested.contains(metric))
        })
        .copied()
        .collect();

    let mut columns = results
        .iter()
        .map(|result| summary_column(result, &displayed, options.strategy))
        .collect::<Result<Vec<_>>>()?;
    columns.sort_by(|a, b| a.whole_update.total_cmp(&b.whole_update));

    // Union of every entry across files, first-seen order
    let mut row_metrics: Vec<(&'static str, &'static str)> = Vec::new();
    for entry in columns.iter().flat_map(|column| &column.entries) {
        if !row_metrics.iter().any(|(name, _)| *name == entry.metric) {
            row_metrics.push((entry.metric, entry.description));
        }
    }

    let summary_position = |name: &str| {
        SUMMARY_METRICS
            .iter()
            .position(|metric| metric.name == name)
            .unwrap_or(SUMMARY_METRICS.len())
    };
    let mut datasets: Vec<BarDataset> = row_metrics
        .iter()
        .filter(|(name, _)| *name != WHOLE_UPDATE.name)
        .map(|&(name, description)| BarDataset {
            metric: name,
            label: description,
            color: metric_color(name),
            data: columns
                .iter()
                .map(|column| column.value_of(name).unwrap_or(0.0))
                .collect(),
        })
        .collect();
    datasets.sort_by_key(|dataset| summary_position(dataset.metric));

    let table = options
        .include_table
        .then(|| summary_table(&columns, &row_metrics));

    let label = options.strategy.label();
    debug!(
        "Summary chart: {} files, {} datasets",
        columns.len(),
        datasets.len()
    );

    Ok(SummaryChart {
        title: format!("{} Per Tick Metrics", label),
        x_axis_label: format!(
            "Average Time using {} per tick [microseconds] (lower is better)",
            label.to_lowercase()
        ),
        strategy: options.strategy,
        labels: columns
            .iter()
            .map(|column| column.file_name.clone())
            .collect(),
        datasets,
        columns,
        table,
    })
}

fn summary_table(
    columns: &[SummaryColumn],
    row_metrics: &[(&'static str, &'static str)],
) -> SummaryTable {
    let mut header = vec!["Category".to_string()];
    header.extend(columns.iter().map(|column| column.file_name.clone()));

    let mut rows: Vec<SummaryTableRow> = row_metrics
        .iter()
        .map(|&(name, description)| SummaryTableRow {
            label: description.to_string(),
            percent: false,
            cells: columns
                .iter()
                .map(|column| column.value_of(name).map(f64::round))
                .collect(),
        })
        .collect();

    let from_previous = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            i.checked_sub(1).map(|previous| {
                round_to(
                    percent_decrease(columns[previous].whole_update, column.whole_update),
                    2,
                )
            })
        })
        .collect();
    rows.push(SummaryTableRow {
        label: "% Decrease from Previous".to_string(),
        percent: true,
        cells: from_previous,
    });

    let best = columns.first().map_or(0.0, |column| column.whole_update);
    rows.push(SummaryTableRow {
        label: "% Decrease from Best".to_string(),
        percent: true,
        cells: columns
            .iter()
            .map(|column| Some(round_to(percent_decrease(best, column.whole_update), 2)))
            .collect(),
    });

    SummaryTable { header, rows }
}

/// Plain text lines of the summary table, without color
pub fn render_summary_table(table: &SummaryTable) -> Vec<String> {
    let cell_text = |row: &SummaryTableRow, cell: &Option<f64>| match cell {
        Some(value) if row.percent => format!("{}%", value),
        Some(value) => format!("{}", value),
        None => String::new(),
    };

    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            let mut line = vec![row.label.clone()];
            line.extend(row.cells.iter().map(|cell| cell_text(row, cell)));
            line
        })
        .collect();

    let widths: Vec<usize> = (0..table.header.len())
        .map(|column| {
            std::iter::once(&table.header)
                .chain(&body)
                .filter_map(|line| line.get(column))
                .map(|text| text.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let separator = format_table_separator(&widths);

    let mut lines = vec![
        separator.clone(),
        format_table_row(&as_refs(&table.header), &widths),
        separator.clone(),
    ];
    lines.extend(body.iter().map(|line| format_table_row(&as_refs(line), &widths)));
    lines.push(separator);
    lines
}

fn as_refs(line: &[String]) -> Vec<&str> {
    line.iter().map(String::as_str).collect()
}

/// Print the summary table to stdout, header and percentages highlighted
pub fn print_summary_table(table: &SummaryTable) {
    let lines = render_summary_table(table);
    let percent_rows = table.rows.iter().filter(|row| row.percent).count();
    let first_percent_line = lines.len().saturating_sub(1 + percent_rows);

    println!();
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with('+') {
            println!("{}", line.dimmed());
        } else if i == 1 {
            println!("{}", line.bold().cyan());
        } else if i >= first_percent_line {
            println!("{}", line.yellow());
        } else if line.contains(WHOLE_UPDATE.description) {
            println!("{}", line.bold());
        } else {
            println!("{}", line);
        }
    }
    println!();
}

/// How a time series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    #[default]
    Line,
    Bar,
}

/// Options for [`build_line_chart`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineChartOptions {
    pub kind: SeriesKind,
    pub strategy: AggregationStrategy,
    /// Last tick to draw; `0` draws everything
    pub max_ticks: u64,
    /// Window width in ticks; `0` picks one from the timeline length
    pub tick_window: u64,
    /// Y-axis ceiling in microseconds; computed from the file when `None`
    pub y_max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: u64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub kind: SeriesKind,
    pub color: &'static str,
    pub fill: bool,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChart {
    pub kind: SeriesKind,
    pub title: String,
    /// Window actually applied, `0` when the raw ticks are drawn
    pub tick_window: u64,
    pub labels: Vec<u64>,
    pub datasets: Vec<Series>,
    pub y_min: f64,
    pub y_max: f64,
}

/// Highest per-tick whole update maximum across `results`, in microseconds
///
/// Used as a shared y-axis ceiling so every file's chart has the same scale.
pub fn whole_update_ceiling(results: &[TickResult]) -> f64 {
    results
        .iter()
        .flat_map(|result| result.ticks_for(&WHOLE_UPDATE))
        .map(|stat| nano_to_micro(stat.stats.maximum))
        .fold(0.0, f64::max)
}

/// Build the time series chart of one file
pub fn build_line_chart(result: &TickResult, options: &LineChartOptions) -> Result<LineChart> {
    let within = |tick: u64| options.max_ticks == 0 || tick <= options.max_ticks;

    let whole_series = result.series(&WHOLE_UPDATE, options.strategy);
    if whole_series.is_empty() {
        return Err(ReportError::empty(format!(
            "no {} metric values found in {}",
            WHOLE_UPDATE.name, result.file_name
        )));
    }
    let whole_values: Vec<f64> = whole_series.iter().map(|point| point.value).collect();
    let whole_update_average = nano_to_micro(stats::mean(&whole_values)?);

    let horizon = if options.max_ticks > 0 {
        options.max_ticks
    } else {
        whole_series.last().map_or(0, |point| point.tick)
    };
    let tick_window = if options.tick_window > 0 {
        options.tick_window
    } else {
        auto_tick_window(horizon)
    };

    let mut datasets = Vec::new();
    for metric in result
        .metrics
        .iter()
        .filter(|metric| TIME_SERIES_METRICS.contains(metric))
    {
        let mut points: Vec<MetricValue> = result
            .series(metric, options.strategy)
            .into_iter()
            .filter(|point| within(point.tick))
            .collect();

        if tick_window > 0 {
            points = aggregate_by_window(&points, tick_window)?
                .into_iter()
                .map(|window| MetricValue::new(window.window_start, window.value))
                .filter(|point| within(point.tick))
                .collect();
        }

        datasets.push(Series {
            label: metric.name.to_string(),
            kind: options.kind,
            color: metric_color(metric.name),
            fill: true,
            points: points
                .iter()
                .map(|point| Point {
                    x: point.tick,
                    y: nano_to_micro(point.value),
                })
                .collect(),
        });
    }

    let labels: Vec<u64> = match datasets.first() {
        Some(first) => first.points.iter().map(|point| point.x).collect(),
        None => whole_series
            .iter()
            .map(|point| point.tick)
            .filter(|&tick| within(tick))
            .collect(),
    };

    datasets.push(Series {
        label: WHOLE_UPDATE_AVERAGE_LABEL.to_string(),
        kind: SeriesKind::Line,
        color: colors::WHITE,
        fill: false,
        points: labels
            .iter()
            .map(|&x| Point {
                x,
                y: whole_update_average,
            })
            .collect(),
    });

    let y_max = options
        .y_max
        .unwrap_or_else(|| whole_update_ceiling(std::slice::from_ref(result)));

    debug!(
        "{}: {} series, {} ticks, window {}",
        result.file_name,
        datasets.len(),
        labels.len(),
        tick_window
    );

    Ok(LineChart {
        kind: options.kind,
        title: format!("{} Timeseries Metrics", result.file_name),
        tick_window,
        labels,
        datasets,
        y_min: 0.0,
        y_max,
    })
}

/// Five-number summary plus mean of one file's per-run values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlotStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    /// Every per-run value, ascending
    pub items: Vec<f64>,
    pub outliers: Vec<f64>,
}

impl BoxPlotStats {
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let mut items = values.to_vec();
        items.sort_by(f64::total_cmp);
        let (q1, median, q3) = stats::quartiles(&items)?;
        Ok(Self {
            min: stats::minimum(&items)?,
            q1,
            median,
            q3,
            max: stats::maximum(&items)?,
            mean: stats::mean(&items)?,
            items,
            outliers: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxPlotDataset {
    pub file_name: String,
    pub stats: BoxPlotStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxPlot {
    pub title: String,
    pub axis_label: String,
    pub strategy: AggregationStrategy,
    /// File names, descending by mean
    pub labels: Vec<String>,
    pub datasets: Vec<BoxPlotDataset>,
    pub y_min: f64,
    pub y_max: f64,
}

/// Build the distribution of per-run whole update times for every file
pub fn build_box_plot(
    results: &[AggregateRunResult],
    strategy: AggregationStrategy,
) -> Result<BoxPlot> {
    if strategy == AggregationStrategy::StandardDeviation {
        warn!("A box plot of per-run standard deviations is rarely meaningful");
    }

    let mut datasets = results
        .iter()
        .map(|result| {
            let values: Vec<f64> = result
                .runs_for(&WHOLE_UPDATE)
                .iter()
                .map(|run| nano_to_micro(strategy.select(&run.stats)))
                .collect();
            if values.is_empty() {
                return Err(ReportError::empty(format!(
                    "no {} runs found in {}",
                    WHOLE_UPDATE.name, result.file_name
                )));
            }
            Ok(BoxPlotDataset {
                file_name: result.file_name.clone(),
                stats: BoxPlotStats::from_values(&values)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    datasets.sort_by(|a, b| b.stats.mean.total_cmp(&a.stats.mean));

    let minimum = datasets
        .iter()
        .map(|dataset| dataset.stats.min)
        .reduce(f64::min)
        .ok_or_else(|| ReportError::empty("box plot without any input file"))?;
    let maximum = datasets
        .iter()
        .map(|dataset| dataset.stats.max)
        .fold(minimum, f64::max);

    Ok(BoxPlot {
        title: format!("{} Whole Update Time Distribution", strategy.short_label()),
        axis_label: "Whole Update Time [microseconds] (lower is better)".to_string(),
        strategy,
        labels: datasets
            .iter()
            .map(|dataset| dataset.file_name.clone())
            .collect(),
        datasets,
        y_min: (minimum * 0.9).floor(),
        y_max: (maximum * 1.1).floor(),
    })
}
