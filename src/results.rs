use crate::aggregate::AggregateRunResult;
use crate::error::{ReportError, Result};
use crate::metrics::AggregationStrategy;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// System information for reproducibility
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub tool_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            tool_version: crate::VERSION.to_string(),
        }
    }
}

/// Header attached to every JSON document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub chart_type: String,
    pub input_files: Vec<String>,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize)]
pub struct ReportDocument<'a, T: Serialize> {
    pub metadata: ReportMetadata,
    pub chart: &'a T,
}

/// Writes chart documents and run tables next to a configured output path
///
/// The output path only contributes its stem: `out/report.json` yields
/// `out/report.json`, `out/report_{file}.json` and `out/report.csv`.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    stem: PathBuf,
    chart_type: String,
    input_files: Vec<String>,
    written: Vec<PathBuf>,
}

impl ReportWriter {
    pub fn new(output: &Path) -> Self {
        Self {
            stem: output.with_extension(""),
            chart_type: String::new(),
            input_files: Vec::new(),
            written: Vec::new(),
        }
    }

    /// Record what produced the documents, for the metadata header
    pub fn with_context(mut self, chart_type: impl Into<String>, input_files: Vec<String>) -> Self {
        self.chart_type = chart_type.into();
        self.input_files = input_files;
        self
    }

    pub fn stem(&self) -> &Path {
        &self.stem
    }

    /// Every path written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn document_path(&self) -> PathBuf {
        self.suffixed(".json")
    }

    pub fn per_file_path(&self, file_name: &str) -> PathBuf {
        self.suffixed(&format!("_{}.json", file_name))
    }

    pub fn table_path(&self) -> PathBuf {
        self.suffixed(".csv")
    }

    fn suffixed(&self, suffix: &str) -> PathBuf {
        let mut name = self.stem.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    fn metadata(&self) -> ReportMetadata {
        ReportMetadata {
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            chart_type: self.chart_type.clone(),
            input_files: self.input_files.clone(),
            system_info: SystemInfo::default(),
        }
    }

    /// Write `chart` wrapped with metadata to `{stem}.json`
    pub fn write_document<T: Serialize>(&mut self, chart: &T) -> Result<PathBuf> {
        let path = self.document_path();
        self.write_json(path, chart)
    }

    /// Write the document of a single input file to `{stem}_{file_name}.json`
    pub fn write_per_file_document<T: Serialize>(
        &mut self,
        file_name: &str,
        chart: &T,
    ) -> Result<PathBuf> {
        let path = self.per_file_path(file_name);
        self.write_json(path, chart)
    }

    fn write_json<T: Serialize>(&mut self, path: PathBuf, chart: &T) -> Result<PathBuf> {
        let document = ReportDocument {
            metadata: self.metadata(),
            chart,
        };
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&path, json).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Results written to: {:?}", path);
        self.written.push(path.clone());
        Ok(path)
    }

    /// Write one row per (file, run) with the strategy-selected value of each
    /// metric to `{stem}.csv`
    pub fn write_run_table(
        &mut self,
        results: &[AggregateRunResult],
        strategy: AggregationStrategy,
    ) -> Result<PathBuf> {
        let path = self.table_path();
        let file = File::create(&path).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        write_run_table_to(file, results, strategy).map_err(|err| match err {
            ReportError::Csv { source, .. } => ReportError::Csv {
                file: path.display().to_string(),
                source,
            },
            other => other,
        })?;

        info!("Verbose run statistics saved to: {:?}", path);
        self.written.push(path.clone());
        Ok(path)
    }
}

/// Write the run table as CSV into any writer
///
/// Columns are `fileName`, `run` and one `{metric}_{strategy}` column per
/// metric seen in any result, in first-seen order. Values stay in
/// nanoseconds. A run that has no aggregate for a metric gets an empty cell.
pub fn write_run_table_to<W: Write>(
    writer: W,
    results: &[AggregateRunResult],
    strategy: AggregationStrategy,
) -> Result<()> {
    let csv_error = |source: csv::Error| ReportError::Csv {
        file: "run table".to_string(),
        source,
    };

    let mut metric_names: Vec<&'static str> = Vec::new();
    for metric in results.iter().flat_map(|result| &result.metrics) {
        if !metric_names.contains(&metric.name) {
            metric_names.push(metric.name);
        }
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec!["fileName".to_string(), "run".to_string()];
    header.extend(
        metric_names
            .iter()
            .map(|name| format!("{}_{}", name, strategy.column_suffix())),
    );
    csv_writer.write_record(&header).map_err(csv_error)?;

    for result in results {
        let runs = result.run_ids();
        debug!("{}: {} runs in table", result.file_name, runs.len());
        for run in runs {
            let mut record = vec![result.file_name.clone(), run.to_string()];
            record.extend(metric_names.iter().map(|name| {
                result
                    .runs
                    .get(name)
                    .and_then(|aggregates| aggregates.iter().find(|agg| agg.run == run))
                    .map(|agg| strategy.select(&agg.stats).to_string())
                    .unwrap_or_default()
            }));
            csv_writer.write_record(&record).map_err(csv_error)?;
        }
    }

    csv_writer
        .flush()
        .map_err(|source| csv_error(csv::Error::from(source)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate_runs, TickFilter};
    use crate::catalog::{TRAINS, WHOLE_UPDATE};
    use crate::metrics::MetricSample;
    use tempfile::TempDir;

    fn sparse_result() -> AggregateRunResult {
        let samples = vec![
            MetricSample {
                metric: WHOLE_UPDATE,
                tick: 1,
                run: 0,
                value: 100.0,
            },
            MetricSample {
                metric: WHOLE_UPDATE,
                tick: 1,
                run: 1,
                value: 300.0,
            },
            MetricSample {
                metric: TRAINS,
                tick: 1,
                run: 0,
                value: 7.5,
            },
        ];
        aggregate_runs(
            "base",
            samples,
            &[WHOLE_UPDATE, TRAINS],
            &TickFilter::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_output_paths_derive_from_stem() {
        let writer = ReportWriter::new(Path::new("out/verbose_metrics.json"));
        assert_eq!(writer.stem(), Path::new("out/verbose_metrics"));
        assert_eq!(writer.document_path(), Path::new("out/verbose_metrics.json"));
        assert_eq!(
            writer.per_file_path("base"),
            Path::new("out/verbose_metrics_base.json")
        );
        assert_eq!(writer.table_path(), Path::new("out/verbose_metrics.csv"));

        let bare = ReportWriter::new(Path::new("report"));
        assert_eq!(bare.table_path(), Path::new("report.csv"));
    }

    #[test]
    fn test_run_table_leaves_missing_cells_empty() {
        let mut buffer = Vec::new();
        write_run_table_to(&mut buffer, &[sparse_result()], AggregationStrategy::Average)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "fileName,run,wholeUpdate_average,trains_average",
                "base,0,100,7.5",
                "base,1,300,",
            ]
        );
    }

    #[test]
    fn test_run_table_uses_strategy_suffix() {
        let mut buffer = Vec::new();
        write_run_table_to(
            &mut buffer,
            &[sparse_result()],
            AggregationStrategy::StandardDeviation,
        )
        .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("fileName,run,wholeUpdate_standardDeviation,"));
    }

    #[test]
    fn test_write_document_wraps_metadata() {
        let dir = TempDir::new().unwrap();
        let mut writer = ReportWriter::new(&dir.path().join("report.json"))
            .with_context("summary", vec!["base.csv".to_string()]);

        let path = writer.write_document(&vec![1, 2, 3]).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["metadata"]["chartType"], "summary");
        assert_eq!(json["metadata"]["inputFiles"][0], "base.csv");
        assert_eq!(json["metadata"]["version"], crate::VERSION);
        assert_eq!(json["chart"], serde_json::json!([1, 2, 3]));

        let table = writer
            .write_run_table(&[sparse_result()], AggregationStrategy::Maximum)
            .unwrap();
        assert!(table.exists());
        assert_eq!(writer.written(), &[path, table]);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let mut writer = ReportWriter::new(&dir.path().join("missing/report.json"));
        assert!(matches!(
            writer.write_document(&1),
            Err(ReportError::Io { .. })
        ));
    }
}
