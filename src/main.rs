//! # Verbose Charts - Main Entry Point
//!
//! Reads every file matched by the input pattern, aggregates it and writes
//! the requested output next to the configured output path:
//!
//! - `summary` and `boxplot`: one JSON document comparing every file
//! - `line` and `bar`: one JSON document per file
//! - `table`: one CSV row per (file, run)
//! - `outliers`: keep/remove split of run summary files as JSON
//!
//! ## Error Handling
//!
//! Files are processed in parallel and independently. Depending on the
//! `--continue-on-error` flag, a failing file either aborts the report
//! (default) or is logged and left out of it.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use verbose_charts::{
    charts::{
        build_box_plot, build_line_chart, build_summary_chart, print_summary_table,
        whole_update_ceiling, LineChartOptions, SeriesKind, SummaryOptions,
    },
    logging,
    run_results::{filter_all, merge_saves, read_run_results},
    utils::format_micros,
    AggregateRunResult, Args, ChartType, MetricCatalog, ReportConfig, ReportWriter, SampleTable,
    TickResult, VERSION,
};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    info!("Starting verbose-charts {}", VERSION);
    debug!("Arguments: {:?}", args);

    let catalog = MetricCatalog::builtin();
    let config = ReportConfig::from_args(&args, &catalog)?;
    info!(
        "Generating {} output from {} files",
        config.chart_type,
        config.files.len()
    );

    let input_files = config
        .files
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    let mut writer =
        ReportWriter::new(&config.output).with_context(config.chart_type.as_str(), input_files);

    match config.chart_type {
        ChartType::Summary => {
            let results = process_files(&config, |path| load_run_result(path, &config, &catalog))?;
            let chart = build_summary_chart(
                &results,
                &SummaryOptions {
                    strategy: config.strategy,
                    metrics: config.metrics.clone(),
                    include_table: config.summary_table,
                },
            )?;
            for column in &chart.columns {
                info!(
                    "{}: {} {} whole update",
                    column.file_name,
                    format_micros(column.whole_update),
                    config.strategy.label().to_lowercase()
                );
            }
            if let Some(table) = &chart.table {
                print_summary_table(table);
            }
            writer.write_document(&chart)?;
        }
        ChartType::Line | ChartType::Bar => {
            let results = process_files(&config, |path| load_tick_result(path, &config, &catalog))?;
            let y_max = config
                .max_update
                .unwrap_or_else(|| whole_update_ceiling(&results));
            let options = LineChartOptions {
                kind: if config.chart_type == ChartType::Bar {
                    SeriesKind::Bar
                } else {
                    SeriesKind::Line
                },
                strategy: config.strategy,
                max_ticks: config.max_ticks,
                tick_window: config.tick_window,
                y_max: Some(y_max),
            };

            for result in &results {
                let outcome = build_line_chart(result, &options)
                    .map_err(anyhow::Error::from)
                    .and_then(|chart| {
                        writer
                            .write_per_file_document(&result.file_name, &chart)
                            .map_err(anyhow::Error::from)
                    });
                if let Err(err) = outcome {
                    error!("Chart failed for {}: {:#}", result.file_name, err);
                    if !config.continue_on_error {
                        return Err(err);
                    }
                }
            }
        }
        ChartType::Boxplot => {
            let results = process_files(&config, |path| load_run_result(path, &config, &catalog))?;
            let plot = build_box_plot(&results, config.strategy)?;
            writer.write_document(&plot)?;
        }
        ChartType::Table => {
            let results = process_files(&config, |path| load_run_result(path, &config, &catalog))?;
            writer.write_run_table(&results, config.strategy)?;
        }
        ChartType::Outliers => {
            let saves = merge_saves(
                process_files(&config, |path| {
                    read_run_results(path).map_err(anyhow::Error::from)
                })?
                .into_iter()
                .flatten(),
            );
            let filters = filter_all(&saves, config.std_deviations)?;
            let removed: usize = filters.iter().map(|filter| filter.remove.len()).sum();
            if removed > 0 {
                warn!(
                    "{} runs lie more than {} standard deviations above their save's mean",
                    removed, config.std_deviations
                );
            }
            writer.write_document(&filters)?;
        }
    }

    info!(
        "verbose-charts completed, {} files written",
        writer.written().len()
    );
    Ok(())
}

/// Run `load` on every input file in parallel, keeping input order
///
/// Failing files abort the report unless `continue_on_error` is set, in which
/// case they are logged and skipped. At least one file must succeed.
fn process_files<T, F>(config: &ReportConfig, load: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Sync,
{
    let outcomes: Vec<(&PathBuf, Result<T>)> = config
        .files
        .par_iter()
        .map(|path| {
            info!("Processing file: {}", path.display());
            let outcome = load(path.as_path())
                .with_context(|| format!("Failed to process {}", path.display()));
            (path, outcome)
        })
        .collect();

    let mut loaded = Vec::with_capacity(outcomes.len());
    for (path, outcome) in outcomes {
        match outcome {
            Ok(value) => loaded.push(value),
            Err(err) => {
                error!("{:#}", err);
                if !config.continue_on_error {
                    return Err(err);
                }
                warn!("Skipping {}", path.display());
            }
        }
    }

    if loaded.is_empty() {
        bail!("None of the {} input files could be processed", config.files.len());
    }
    Ok(loaded)
}

fn load_run_result(
    path: &Path,
    config: &ReportConfig,
    catalog: &MetricCatalog,
) -> Result<AggregateRunResult> {
    let table = SampleTable::from_path(path, catalog, &config.schema())?;
    let result = AggregateRunResult::from_table(&table, &config.tick_filter)?;
    Ok(result.with_trimmed_prefix(&config.trim_prefix))
}

fn load_tick_result(
    path: &Path,
    config: &ReportConfig,
    catalog: &MetricCatalog,
) -> Result<TickResult> {
    let table = SampleTable::from_path(path, catalog, &config.schema())?;
    let mut result = TickResult::from_table(&table)?;
    let remove_first_ticks = config.tick_filter.remove_first_ticks;
    if remove_first_ticks > 0 {
        result = result.ignore_first_ticks(remove_first_ticks);
    }
    Ok(result.with_trimmed_prefix(&config.trim_prefix))
}
