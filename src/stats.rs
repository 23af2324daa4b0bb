//! # Statistical Primitives
//!
//! Pure reductions over slices of `f64` samples. Every function is total on
//! non-empty input and returns [`ReportError::EmptyInput`] otherwise, so that a
//! missing series can never masquerade as a zero in a comparison report.
//!
//! ## Functions
//!
//! - [`mean`]: arithmetic mean
//! - [`population_std_dev`]: standard deviation with divisor `n`
//! - [`minimum`] / [`maximum`]: linear scans
//! - [`median`]: middle element, or mean of the two middle elements
//! - [`quartiles`]: Tukey hinges used by boxplots

use crate::error::{ReportError, Result};

fn ensure_non_empty(values: &[f64], op: &str) -> Result<()> {
    if values.is_empty() {
        return Err(ReportError::empty(format!("{} of zero samples", op)));
    }
    Ok(())
}

/// Arithmetic mean of the values
pub fn mean(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values, "mean")?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divisor `n`, not `n - 1`)
///
/// ```rust
/// # use verbose_charts::stats::population_std_dev;
/// assert_eq!(population_std_dev(&[5.0, 5.0, 5.0, 5.0]).unwrap(), 0.0);
/// assert_eq!(population_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap(), 2.0);
/// ```
pub fn population_std_dev(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// Smallest value
pub fn minimum(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values, "minimum")?;
    Ok(values.iter().cloned().fold(f64::INFINITY, f64::min))
}

/// Largest value
pub fn maximum(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values, "maximum")?;
    Ok(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
}

/// Median of the values
///
/// Sorts a copy ascending. Odd lengths return the middle element, even
/// lengths the mean of the two middle elements.
pub fn median(values: &[f64]) -> Result<f64> {
    ensure_non_empty(values, "median")?;
    let sorted = sorted_copy(values);
    Ok(median_of_sorted(&sorted))
}

/// Lower hinge, median and upper hinge of the values
///
/// The halves exclude the middle element for odd lengths, matching how the
/// boxplot statistics have always been computed for these reports. A single
/// sample yields that sample for all three values.
pub fn quartiles(values: &[f64]) -> Result<(f64, f64, f64)> {
    ensure_non_empty(values, "quartiles")?;
    let sorted = sorted_copy(values);
    let len = sorted.len();
    let mid = len / 2;
    let median = median_of_sorted(&sorted);

    if len == 1 {
        return Ok((median, median, median));
    }

    let lower = &sorted[..mid];
    let upper = if len % 2 == 0 {
        &sorted[mid..]
    } else {
        &sorted[mid + 1..]
    };

    Ok((median_of_sorted(lower), median, median_of_sorted(upper)))
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

// Callers guarantee `sorted` is non-empty and ascending.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
