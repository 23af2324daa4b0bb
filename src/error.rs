//! Error types shared by the aggregation pipeline.
//!
//! Every variant carries enough context (file, metric, row) to be printed
//! directly in a report header. Library functions return
//! [`Result<T>`](Result); the binary wraps these in `anyhow` at the edge.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading, validating and aggregating benchmark data
#[derive(Debug, Error)]
pub enum ReportError {
    /// A statistical reduction was asked to summarise zero samples
    #[error("cannot aggregate an empty set of values ({context})")]
    EmptyInput { context: String },

    /// A metric name is not part of the metric catalog
    #[error("metric not supported: {name}")]
    UnknownMetric { name: String },

    /// A CSV header names a column that is not in the metric catalog
    #[error("{file}: metric not supported: {name}")]
    UnknownColumn { file: String, name: String },

    /// A column every input file must carry is absent
    #[error("{file}: expected '{column}' column to be present in the CSV")]
    MissingRequiredColumn { file: String, column: String },

    /// The aggregation strategy string is not one of the known strategies
    #[error("aggregation strategy \"{input}\" must be one of [{allowed}]")]
    InvalidAggregationStrategy { input: String, allowed: String },

    /// The caller asked for metrics the file does not contain
    #[error("{file}: expected metric columns are missing: {}", missing.join(", "))]
    SchemaMismatch { file: String, missing: Vec<String> },

    /// A cell is not a finite number
    #[error("{file}: row {row}, column '{column}': invalid numeric value \"{value}\"")]
    InvalidValue {
        file: String,
        row: usize,
        column: String,
        value: String,
    },

    /// Window aggregation needs a strictly positive window
    #[error("tick window must be greater than zero (got {window})")]
    InvalidWindow { window: u64 },

    /// The tick range would produce more windows than can be represented
    #[error("ticks {first_tick}..={last_tick} split into windows of {window} exceed {limit} windows")]
    WindowRange {
        first_tick: u64,
        last_tick: u64,
        window: u64,
        limit: u64,
    },

    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize chart document: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn empty(context: impl Into<String>) -> Self {
        ReportError::EmptyInput {
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ReportError::MissingRequiredColumn {
            file: "base".to_string(),
            column: "wholeUpdate".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "base: expected 'wholeUpdate' column to be present in the CSV"
        );

        let err = ReportError::SchemaMismatch {
            file: "base".to_string(),
            missing: vec!["trains".to_string(), "pathFinder".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "base: expected metric columns are missing: trains, pathFinder"
        );

        let err = ReportError::UnknownColumn {
            file: "base".to_string(),
            name: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "base: metric not supported: bogus");

        let err = ReportError::empty("base / wholeUpdate");
        assert!(err.to_string().contains("base / wholeUpdate"));
    }
}
