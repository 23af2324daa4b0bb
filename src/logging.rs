use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Colors each log line by level, with no timestamp or target.
///
/// Warnings and errors get a short prefix so they stay recognizable when
/// color is disabled (e.g. output piped to a file).
pub struct ColorizedFormatter;

impl ColorizedFormatter {
    fn prefix(level: &Level) -> &'static str {
        match *level {
            Level::WARN => "warning: ",
            Level::ERROR => "error: ",
            _ => "",
        }
    }

    fn paint(level: &Level, line: String) -> ColoredString {
        match *level {
            Level::INFO => line.normal(),
            Level::WARN => line.yellow(),
            Level::ERROR => line.red().bold(),
            Level::DEBUG => line.blue(),
            Level::TRACE => line.purple(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();
        let mut buffer = String::from(Self::prefix(level));
        ctx.format_fields(Writer::new(&mut buffer), event)?;

        writeln!(writer, "{}", Self::paint(level, buffer))
    }
}

/// Filter from `RUST_LOG`, falling back to `info` (or `debug` when verbose)
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    })
}

/// Install the colorized subscriber on stderr
pub fn init(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .event_format(ColorizedFormatter)
        .init();
}
