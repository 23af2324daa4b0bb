use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use verbose_charts::{
    aggregate::{AggregateRunResult, TickFilter, TickResult},
    catalog::{MetricCatalog, TRAINS, WHOLE_UPDATE},
    charts::{build_box_plot, build_line_chart, build_summary_chart, LineChartOptions, SummaryOptions},
    parser::{MetricSchema, SampleTable},
    results::ReportWriter,
    run_results::{filter_all, merge_saves, read_run_results},
    AggregationStrategy, ReportError,
};

/// Write a verbose metrics file with `runs` runs of `ticks` ticks each.
///
/// Whole update is `base + tick` ns, trains a tenth of that; tick 1 of every
/// run is a large warm-up spike.
fn write_metrics(dir: &Path, name: &str, base: f64, runs: u32, ticks: u64) -> PathBuf {
    let mut csv = String::from("tick,run,wholeUpdate,trains,entityUpdate\n");
    for run in 0..runs {
        for tick in 1..=ticks {
            let whole = if tick == 1 {
                1_000_000.0
            } else {
                base + tick as f64
            };
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                tick,
                run,
                whole,
                whole / 10.0,
                whole / 2.0
            ));
        }
    }
    let path = dir.join(format!("{}_verbose_metrics.csv", name));
    std::fs::write(&path, csv).unwrap();
    path
}

fn load(path: &Path, filter: &TickFilter) -> Result<AggregateRunResult> {
    let table = SampleTable::from_path(path, &MetricCatalog::builtin(), &MetricSchema::Infer)?;
    Ok(AggregateRunResult::from_table(&table, filter)?)
}

/// The warm-up tick is filtered out and every run is aggregated.
#[test]
fn aggregate_file_from_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_metrics(dir.path(), "bench-base", 10_000.0, 3, 5);

    let result = load(&path, &TickFilter::new(1, 0))?;
    assert_eq!(result.file_name, "bench-base");
    assert_eq!(result.run_ids(), vec![0, 1, 2]);

    let all = result.all_for(&WHOLE_UPDATE).unwrap();
    assert_eq!(all.minimum, 10_002.0);
    assert_eq!(all.maximum, 10_005.0);
    assert_eq!(all.average, 10_003.5);
    assert_eq!(result.runs_for(&TRAINS).len(), 3);

    assert_eq!(result.with_trimmed_prefix("bench-").file_name, "base");
    Ok(())
}

/// Summary, box plot and table outputs land next to the output path.
#[test]
fn write_reports_for_two_files() -> Result<()> {
    let dir = TempDir::new()?;
    let filter = TickFilter::new(1, 0);
    let results = vec![
        load(&write_metrics(dir.path(), "slow", 20_000.0, 2, 4), &filter)?,
        load(&write_metrics(dir.path(), "fast", 10_000.0, 2, 4), &filter)?,
    ];

    let summary = build_summary_chart(
        &results,
        &SummaryOptions {
            strategy: AggregationStrategy::Median,
            metrics: None,
            include_table: true,
        },
    )?;
    assert_eq!(summary.labels, vec!["fast", "slow"]);
    assert!(summary.table.is_some());

    let plot = build_box_plot(&results, AggregationStrategy::Average)?;
    assert_eq!(plot.labels, vec!["slow", "fast"]);

    let mut writer = ReportWriter::new(&dir.path().join("report.json"))
        .with_context("summary", vec!["slow".to_string(), "fast".to_string()]);
    let document = writer.write_document(&summary)?;
    let table = writer.write_run_table(&results, AggregationStrategy::Median)?;

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(document)?)?;
    assert_eq!(json["chart"]["title"], "Median Per Tick Metrics");
    assert_eq!(json["chart"]["labels"][0], "fast");

    let csv = std::fs::read_to_string(table)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "fileName,run,wholeUpdate_median,trains_median,entityUpdate_median"
    );
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("slow,0,"));
    assert!(lines[4].starts_with("fast,1,"));
    Ok(())
}

/// Line charts are written one per file and honor the tick window.
#[test]
fn per_file_line_chart() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_metrics(dir.path(), "base", 10_000.0, 2, 120);
    let table = SampleTable::from_path(&path, &MetricCatalog::builtin(), &MetricSchema::Infer)?;
    let result = TickResult::from_table(&table)?.ignore_first_ticks(1);

    let chart = build_line_chart(
        &result,
        &LineChartOptions {
            tick_window: 60,
            ..Default::default()
        },
    )?;
    assert_eq!(chart.labels, vec![0, 60, 120]);
    let labels: Vec<&str> = chart.datasets.iter().map(|series| series.label.as_str()).collect();
    assert_eq!(labels, vec!["trains", "entityUpdate", "Whole Update Average"]);

    let mut writer = ReportWriter::new(&dir.path().join("lines.json"));
    let written = writer.write_per_file_document(&result.file_name, &chart)?;
    assert_eq!(written, dir.path().join("lines_base.json"));
    assert!(written.exists());
    Ok(())
}

/// A file without the whole update column produces no result.
#[test]
fn missing_whole_update_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken_verbose_metrics.csv");
    std::fs::write(&path, "tick,run,trains\n1,0,5\n")?;

    let err = SampleTable::from_path(&path, &MetricCatalog::builtin(), &MetricSchema::Infer)
        .unwrap_err();
    match err {
        ReportError::MissingRequiredColumn { file, column } => {
            assert_eq!(file, "broken");
            assert_eq!(column, "wholeUpdate");
        }
        other => panic!("expected MissingRequiredColumn, got {:?}", other),
    }
    Ok(())
}

/// Filtering away every tick is an error naming the file and metric.
#[test]
fn over_aggressive_tick_filter_fails() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_metrics(dir.path(), "short", 10_000.0, 1, 10);
    let err = load(&path, &TickFilter::new(3600, 0)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("short"));
    assert!(message.contains("wholeUpdate"));
    Ok(())
}

/// A save split across two run summary files is filtered as one population.
#[test]
fn outliers_merge_saves_across_files() -> Result<()> {
    let dir = TempDir::new()?;
    let header = "save_name,run_index,execution_time_ms,avg_ms,min_ms,max_ms,\
                  effective_ups,ticks,factorio_version,platform\n";
    let first = dir.path().join("runs_a.csv");
    let second = dir.path().join("runs_b.csv");
    let mut csv = String::from(header);
    for run in 0..9 {
        csv.push_str(&format!("base,{},1000,10,5,20,100,3600,2.0.55,linux64\n", run));
    }
    std::fs::write(&first, csv)?;
    std::fs::write(
        &second,
        format!("{}base,9,1000,100,50,200,10,3600,2.0.55,linux64\n", header),
    )?;

    let saves = merge_saves(
        read_run_results(&first)?
            .into_iter()
            .chain(read_run_results(&second)?),
    );
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].rows.len(), 10);

    // mean 19, σ 27: only run 9 exceeds 19 + 27.
    let filters = filter_all(&saves, 1.0)?;
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].keep.len(), 9);
    assert_eq!(filters[0].remove.len(), 1);
    assert_eq!(filters[0].remove[0].run_index, 9);
    Ok(())
}
