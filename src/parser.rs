//! # Verbose Metrics Reader
//!
//! Reads the `*_verbose_metrics.csv` files written by the benchmark harness
//! into a [`SampleTable`]. A file has a header row with a `tick` column, a
//! `run` column and one column per metric holding nanosecond timings.
//!
//! ## Schema Modes
//!
//! - [`MetricSchema::Infer`]: every header column other than `tick`/`run` is
//!   a metric and must be known to the catalog.
//! - [`MetricSchema::Expect`]: the caller names the metrics to track; each of
//!   them must be a header column, other columns are ignored.
//!
//! Either way the schema is fixed once from the header and every row is read
//! against it. The `wholeUpdate` column is mandatory in both modes.

use crate::catalog::{Metric, MetricCatalog, WHOLE_UPDATE};
use crate::error::{ReportError, Result};
use crate::metrics::MetricSample;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub const TICK_COLUMN: &str = "tick";
pub const RUN_COLUMN: &str = "run";

/// Suffix the harness appends to every verbose metrics file name
const VERBOSE_SUFFIX: &str = "_verbose_metrics";

/// How the set of tracked metrics is determined for a file
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MetricSchema {
    /// Track every metric column found in the header
    #[default]
    Infer,
    /// Track exactly these metrics; an empty list behaves like `Infer`
    Expect(Vec<Metric>),
}

/// One CSV row: tick, run and one optional value per tracked metric
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub tick: u64,
    pub run: u32,
    /// Aligned with [`SampleTable::metrics`]; `None` for an empty cell
    pub values: Vec<Option<f64>>,
}

/// The parsed content of one verbose metrics file
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    pub file_name: String,
    pub metrics: Vec<Metric>,
    pub rows: Vec<SampleRow>,
}

impl SampleTable {
    /// Read a verbose metrics file from disk
    pub fn from_path(path: &Path, catalog: &MetricCatalog, schema: &MetricSchema) -> Result<Self> {
        let file = File::open(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(&display_name(path), file, catalog, schema)
    }

    /// Read verbose metrics CSV data from any reader
    ///
    /// `file_name` is only used for result naming and error context.
    pub fn from_reader<R: Read>(
        file_name: &str,
        reader: R,
        catalog: &MetricCatalog,
        schema: &MetricSchema,
    ) -> Result<Self> {
        let csv_error = |source: csv::Error| ReportError::Csv {
            file: file_name.to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(csv_error)?.clone();
        let column_of = |name: &str| headers.iter().position(|header| header == name);
        let missing_column = |column: &str| ReportError::MissingRequiredColumn {
            file: file_name.to_string(),
            column: column.to_string(),
        };

        let tick_index = column_of(TICK_COLUMN).ok_or_else(|| missing_column(TICK_COLUMN))?;
        let run_index = column_of(RUN_COLUMN).ok_or_else(|| missing_column(RUN_COLUMN))?;
        if column_of(WHOLE_UPDATE.name).is_none() {
            return Err(missing_column(WHOLE_UPDATE.name));
        }

        let columns: Vec<(Metric, usize)> = match schema {
            MetricSchema::Expect(expected) if !expected.is_empty() => {
                let mut missing = Vec::new();
                let mut columns = Vec::with_capacity(expected.len());
                for metric in expected {
                    match column_of(metric.name) {
                        Some(index) => columns.push((*metric, index)),
                        None => missing.push(metric.name.to_string()),
                    }
                }
                if !missing.is_empty() {
                    return Err(ReportError::SchemaMismatch {
                        file: file_name.to_string(),
                        missing,
                    });
                }
                columns
            }
            _ => headers
                .iter()
                .enumerate()
                .filter(|(_, header)| {
                    !header.is_empty() && *header != TICK_COLUMN && *header != RUN_COLUMN
                })
                .map(|(index, header)| -> Result<(Metric, usize)> {
                    let metric = catalog.lookup(header).ok_or_else(|| {
                        ReportError::UnknownColumn {
                            file: file_name.to_string(),
                            name: header.to_string(),
                        }
                    })?;
                    Ok((metric, index))
                })
                .collect::<Result<_>>()?,
        };

        debug!(
            "{}: tracking {} metric columns ({})",
            file_name,
            columns.len(),
            columns
                .iter()
                .map(|(metric, _)| metric.name)
                .collect::<Vec<_>>()
                .join(",")
        );

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            let line = record
                .position()
                .map_or(index + 2, |position| position.line() as usize);
            let cell = |column: usize| record.get(column).unwrap_or("");
            let invalid = |column: usize| ReportError::InvalidValue {
                file: file_name.to_string(),
                row: line,
                column: headers.get(column).unwrap_or("").to_string(),
                value: cell(column).to_string(),
            };

            let tick = cell(tick_index)
                .parse::<u64>()
                .map_err(|_| invalid(tick_index))?;
            let run = cell(run_index)
                .parse::<u32>()
                .map_err(|_| invalid(run_index))?;

            let values = columns
                .iter()
                .map(|&(_, column)| match cell(column) {
                    "" => Ok(None),
                    raw => raw
                        .parse::<f64>()
                        .ok()
                        .filter(|value| value.is_finite())
                        .map(Some)
                        .ok_or_else(|| invalid(column)),
                })
                .collect::<Result<Vec<_>>>()?;

            rows.push(SampleRow { tick, run, values });
        }

        debug!("{}: read {} rows", file_name, rows.len());

        Ok(Self {
            file_name: file_name.to_string(),
            metrics: columns.into_iter().map(|(metric, _)| metric).collect(),
            rows,
        })
    }

    /// Flatten the table into one sample per non-empty cell, in row order
    pub fn samples(&self) -> impl Iterator<Item = MetricSample> + '_ {
        self.rows.iter().flat_map(move |row| {
            self.metrics
                .iter()
                .zip(&row.values)
                .filter_map(move |(metric, value)| {
                    value.map(|value| MetricSample {
                        metric: *metric,
                        tick: row.tick,
                        run: row.run,
                        value,
                    })
                })
        })
    }
}

/// Display name of an input file: the file stem without the harness suffix
///
/// ```rust
/// # use std::path::Path;
/// # use verbose_charts::parser::display_name;
/// assert_eq!(display_name(Path::new("out/base_verbose_metrics.csv")), "base");
/// ```
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(VERBOSE_SUFFIX, ""))
        .unwrap_or_default()
}
