//! # Utility Functions and Helper Module
//!
//! Small helpers shared by the chart builders and the report writer.
//!
//! ## Key Functionality Categories
//!
//! - **Unit Conversion**: The harness records nanoseconds, charts are drawn
//!   in microseconds and the CLI accepts milliseconds
//! - **Derived Ratios**: Percent decrease and percent difference between two
//!   measurements
//! - **Formatting**: Human-readable display of timings and rounding
//! - **Display Helpers**: Plain text table rows for console output
//!
//! ## Usage Examples
//!
//! ```rust
//! use verbose_charts::utils::*;
//!
//! assert_eq!(nano_to_micro(1500.0), 1.5);
//! assert_eq!(percent_decrease(100.0, 50.0), 50.0);
//! assert_eq!(round_to(12.3456, 2), 12.35);
//! assert_eq!(format_micros(2500.0), "2.50ms");
//! ```

/// Convert nanoseconds to microseconds
pub fn nano_to_micro(nanos: f64) -> f64 {
    nanos / 1_000.0
}

/// Convert microseconds to nanoseconds
pub fn micro_to_nano(micros: f64) -> f64 {
    micros * 1_000.0
}

/// Convert milliseconds to microseconds
pub fn milli_to_micro(millis: f64) -> f64 {
    millis * 1_000.0
}

/// Relative decrease from `start` to `end`, in percent
///
/// Positive when `end` is smaller than `start`. The result is not finite
/// when `start` is zero.
///
/// ## Examples
///
/// ```rust
/// # use verbose_charts::utils::percent_decrease;
/// assert_eq!(percent_decrease(100.0, 50.0), 50.0);
/// assert_eq!(percent_decrease(50.0, 100.0), -100.0);
/// ```
pub fn percent_decrease(start: f64, end: f64) -> f64 {
    (start - end) / start.abs() * 100.0
}

/// Symmetric difference between two values relative to their mean, in percent
///
/// Always non-negative and independent of argument order.
pub fn percent_difference(start: f64, end: f64) -> f64 {
    (end - start).abs() / ((end + start).abs() / 2.0) * 100.0
}

/// Round `value` to `places` decimal places, halves away from zero
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Remove `prefix` from the start of a display name, if present
pub fn trim_prefix(name: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    name.strip_prefix(prefix).unwrap_or(name).to_string()
}

/// Format a microsecond timing in a human-readable way
///
/// Automatically selects the most appropriate unit based on the magnitude:
///
/// - **Nanoseconds**: < 1 μs (e.g., "500ns")
/// - **Microseconds**: < 1 ms (e.g., "1.50μs")
/// - **Milliseconds**: < 1 s (e.g., "25.75ms")
/// - **Seconds**: everything longer (e.g., "1.25s")
///
/// ## Examples
///
/// ```rust
/// # use verbose_charts::utils::format_micros;
/// assert_eq!(format_micros(0.5), "500ns");
/// assert_eq!(format_micros(1.5), "1.50μs");
/// assert_eq!(format_micros(1250000.0), "1.25s");
/// ```
pub fn format_micros(micros: f64) -> String {
    let magnitude = micros.abs();
    if magnitude < 1.0 {
        format!("{:.0}ns", micro_to_nano(micros))
    } else if magnitude < 1_000.0 {
        format!("{:.2}μs", micros)
    } else if magnitude < 1_000_000.0 {
        format!("{:.2}ms", micros / 1_000.0)
    } else {
        format!("{:.2}s", micros / 1_000_000.0)
    }
}

/// Format a table row
///
/// Each column is left-aligned and padded to its width; columns without a
/// configured width fall back to 10 characters. Width is counted in
/// characters so labels like "σ" line up.
pub fn format_table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut row = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        let padding = width.saturating_sub(column.chars().count());
        row.push(' ');
        row.push_str(column);
        row.push_str(&" ".repeat(padding));
        row.push_str(" |");
    }
    row
}

/// Horizontal separator matching [`format_table_row`]
pub fn format_table_separator(widths: &[usize]) -> String {
    let mut separator = String::from("+");
    for &width in widths {
        separator.push_str(&"-".repeat(width + 2));
        separator.push('+');
    }
    separator
}
