//! # Run Summary Results
//!
//! Besides the verbose metrics, the benchmark harness writes one summary row
//! per run (`save_name, run_index, execution_time_ms, avg_ms, …`). This
//! module reads that file and flags runs whose average tick time lies more
//! than `k` standard deviations above the mean of their save, which usually
//! means the machine was disturbed during that run.

use crate::error::{ReportError, Result};
use crate::stats;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// One row of the run summary CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResultRow {
    pub save_name: String,
    pub run_index: u32,
    pub execution_time_ms: f64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub effective_ups: f64,
    pub ticks: u64,
    pub factorio_version: String,
    pub platform: String,
}

/// Rows of one save, in file order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRuns {
    pub save_name: String,
    pub rows: Vec<RunResultRow>,
}

/// Outcome of the outlier filter for one save
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResultFilter {
    pub save_name: String,
    /// Upper bound on `avg_ms` for kept runs
    pub threshold_ms: f64,
    pub keep: Vec<RunResultRow>,
    pub remove: Vec<RunResultRow>,
}

/// Read a run summary file and group its rows by save name
pub fn read_run_results(path: &Path) -> Result<Vec<SaveRuns>> {
    let file = File::open(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_run_results(&path.display().to_string(), file)
}

/// Parse run summary CSV data; saves keep the order of their first row
pub fn parse_run_results<R: Read>(file_name: &str, reader: R) -> Result<Vec<SaveRuns>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut saves: Vec<SaveRuns> = Vec::new();
    for row in reader.deserialize::<RunResultRow>() {
        let row = row.map_err(|source| ReportError::Csv {
            file: file_name.to_string(),
            source,
        })?;
        push_row(&mut saves, row);
    }

    debug!("{}: {} saves", file_name, saves.len());
    Ok(saves)
}

/// Merge saves read from several files so each save name appears once
///
/// Rows keep file order within a save; saves keep the order of their first
/// appearance.
pub fn merge_saves<I>(saves: I) -> Vec<SaveRuns>
where
    I: IntoIterator<Item = SaveRuns>,
{
    let mut merged: Vec<SaveRuns> = Vec::new();
    for save in saves {
        for row in save.rows {
            push_row(&mut merged, row);
        }
    }
    merged
}

fn push_row(saves: &mut Vec<SaveRuns>, row: RunResultRow) {
    match saves.iter_mut().find(|save| save.save_name == row.save_name) {
        Some(save) => save.rows.push(row),
        None => saves.push(SaveRuns {
            save_name: row.save_name.clone(),
            rows: vec![row],
        }),
    }
}

/// Split `rows` into runs to keep and runs whose `avg_ms` exceeds
/// `mean + standard_deviations * σ` (population σ)
pub fn filter_outside_std_deviations(
    save_name: &str,
    rows: &[RunResultRow],
    standard_deviations: f64,
) -> Result<RunResultFilter> {
    let averages: Vec<f64> = rows.iter().map(|row| row.avg_ms).collect();
    let mean = stats::mean(&averages).map_err(|_| {
        ReportError::empty(format!("no runs to filter for save '{}'", save_name))
    })?;
    let threshold_ms = mean + stats::population_std_dev(&averages)? * standard_deviations;

    let (remove, keep): (Vec<_>, Vec<_>) = rows
        .iter()
        .cloned()
        .partition(|row| row.avg_ms > threshold_ms);

    if !remove.is_empty() {
        warn!(
            "{}: {} of {} runs above {:.3} ms",
            save_name,
            remove.len(),
            rows.len(),
            threshold_ms
        );
    }

    Ok(RunResultFilter {
        save_name: save_name.to_string(),
        threshold_ms,
        keep,
        remove,
    })
}

/// Apply [`filter_outside_std_deviations`] to every save
pub fn filter_all(saves: &[SaveRuns], standard_deviations: f64) -> Result<Vec<RunResultFilter>> {
    saves
        .iter()
        .map(|save| filter_outside_std_deviations(&save.save_name, &save.rows, standard_deviations))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "save_name,run_index,execution_time_ms,avg_ms,min_ms,max_ms,\
                          effective_ups,ticks,factorio_version,platform\n";

    fn row(save_name: &str, run_index: u32, avg_ms: f64) -> RunResultRow {
        RunResultRow {
            save_name: save_name.to_string(),
            run_index,
            execution_time_ms: 1000.0,
            avg_ms,
            min_ms: avg_ms / 2.0,
            max_ms: avg_ms * 2.0,
            effective_ups: 1000.0 / avg_ms,
            ticks: 3600,
            factorio_version: "2.0.55".to_string(),
            platform: "linux64".to_string(),
        }
    }

    #[test]
    fn test_parse_groups_by_save_in_first_seen_order() {
        let csv = format!(
            "{}{}{}{}",
            HEADER,
            "b,0,1000,2.5,1,4,400,3600,2.0.55,linux64\n",
            "a,0,1000,3.0,1,4,333,3600,2.0.55,linux64\n",
            "b,1,1000,2.7,1,4,370,3600,2.0.55,linux64\n",
        );
        let saves = parse_run_results("runs.csv", csv.as_bytes()).unwrap();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[0].save_name, "b");
        assert_eq!(saves[0].rows.len(), 2);
        assert_eq!(saves[0].rows[1].run_index, 1);
        assert_eq!(saves[0].rows[1].avg_ms, 2.7);
        assert_eq!(saves[1].save_name, "a");
    }

    #[test]
    fn test_merge_saves_across_files() {
        let first = vec![
            SaveRuns {
                save_name: "base".to_string(),
                rows: vec![row("base", 0, 10.0), row("base", 1, 10.0)],
            },
            SaveRuns {
                save_name: "other".to_string(),
                rows: vec![row("other", 0, 4.0)],
            },
        ];
        let second = vec![SaveRuns {
            save_name: "base".to_string(),
            rows: vec![row("base", 2, 40.0)],
        }];

        let merged = merge_saves(first.into_iter().chain(second));
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].save_name, "base");
        let runs: Vec<u32> = merged[0].rows.iter().map(|row| row.run_index).collect();
        assert_eq!(runs, vec![0, 1, 2]);
        assert_eq!(merged[1].save_name, "other");

        // One filter per save, computed over the runs of every file.
        let filters = filter_all(&merged, 1.0).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].threshold_ms, 20.0 + 200f64.sqrt());
        assert_eq!(filters[0].remove.len(), 1);
        assert_eq!(filters[0].remove[0].run_index, 2);
    }

    #[test]
    fn test_parse_rejects_malformed_row() {
        let csv = format!("{}b,zero,1000,2.5,1,4,400,3600,2.0.55,linux64\n", HEADER);
        assert!(matches!(
            parse_run_results("runs.csv", csv.as_bytes()),
            Err(ReportError::Csv { .. })
        ));
    }

    #[test]
    fn test_filter_removes_slow_outlier() {
        let mut rows: Vec<RunResultRow> = (0..9).map(|i| row("base", i, 10.0)).collect();
        rows.push(row("base", 9, 100.0));

        // mean 19, σ 27: threshold 19 + 27 * 1 = 46
        let filter = filter_outside_std_deviations("base", &rows, 1.0).unwrap();
        assert_eq!(filter.threshold_ms, 46.0);
        assert_eq!(filter.keep.len(), 9);
        assert_eq!(filter.remove.len(), 1);
        assert_eq!(filter.remove[0].run_index, 9);

        let lenient = filter_outside_std_deviations("base", &rows, 3.0).unwrap();
        assert!(lenient.remove.is_empty());
    }

    #[test]
    fn test_filter_keeps_identical_runs() {
        let rows: Vec<RunResultRow> = (0..3).map(|i| row("base", i, 5.0)).collect();
        let filter = filter_outside_std_deviations("base", &rows, 0.0).unwrap();
        assert_eq!(filter.keep, rows);
        assert!(filter.remove.is_empty());
    }

    #[test]
    fn test_filter_without_rows_fails() {
        let err = filter_outside_std_deviations("base", &[], 3.0).unwrap_err();
        assert!(err.to_string().contains("base"));
    }
}
