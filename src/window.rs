//! # Time-Window Aggregation
//!
//! Converts an irregular per-tick series into fixed-width windows holding a
//! time-weighted average, so noisy per-tick data can be drawn as a trend.
//!
//! ## Weighting Model
//!
//! Each point holds its value from its own tick until the tick of the next
//! point (last observation carried forward). The final point holds its value
//! up to the end of whichever window is being evaluated, so the last window is
//! flat-extrapolated to its edge. A window's value is the sum of
//! `value * overlap` divided by the covered duration, or `0` when no point
//! covers any part of it.
//!
//! ## Alignment
//!
//! The first window starts at `floor(min_tick / window) * window` and windows
//! tile forward while their start is `<= max_tick`. Intervals are half-open:
//! a point exactly on a boundary belongs to the window it starts.
//!
//! ## Examples
//!
//! ```rust
//! # use verbose_charts::metrics::MetricValue;
//! # use verbose_charts::window::aggregate_by_window;
//! let points = [MetricValue::new(0, 10.0), MetricValue::new(50, 20.0)];
//! let windows = aggregate_by_window(&points, 100).unwrap();
//! assert_eq!(windows.len(), 1);
//! assert_eq!(windows[0].value, 15.0);
//! ```

use crate::error::{ReportError, Result};
use crate::metrics::{MetricValue, WindowedPoint};
use tracing::trace;

/// Ticks per second of game time
pub const TICKS_PER_SECOND: u64 = 60;
pub const TICKS_PER_MINUTE: u64 = TICKS_PER_SECOND * 60;

/// Upper bound on the number of windows one series may be split into
pub const MAX_WINDOWS: u64 = 1_000_000;

/// Split the points into windows of `window` ticks and time-weight each one
///
/// The input does not need to be sorted. Points are ordered by tick (then by
/// value, so that duplicate ticks resolve the same way regardless of input
/// order). An empty input yields an empty output.
///
/// Fails with [`ReportError::WindowRange`] when the tick range needs more than
/// [`MAX_WINDOWS`] windows or the last window would end past `u64::MAX`.
pub fn aggregate_by_window(points: &[MetricValue], window: u64) -> Result<Vec<WindowedPoint>> {
    if window == 0 {
        return Err(ReportError::InvalidWindow { window });
    }
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let sorted = sorted_points(points);
    let min_tick = sorted[0].tick;
    let max_tick = sorted[sorted.len() - 1].tick;
    let first_start = (min_tick / window) * window;

    let range_error = || ReportError::WindowRange {
        first_tick: min_tick,
        last_tick: max_tick,
        window,
        limit: MAX_WINDOWS,
    };
    let count = (max_tick - first_start) / window + 1;
    if count > MAX_WINDOWS {
        return Err(range_error());
    }
    // The last window starts at or below `max_tick`, so only its end can overflow.
    count
        .checked_mul(window)
        .and_then(|span| first_start.checked_add(span))
        .ok_or_else(range_error)?;

    let mut windows = Vec::with_capacity(count as usize);
    for index in 0..count {
        let window_start = first_start + index * window;
        windows.push(weighted_window(&sorted, window_start, window_start + window));
    }

    trace!(
        "Aggregated {} points into {} windows of {} ticks",
        points.len(),
        windows.len(),
        window
    );
    Ok(windows)
}

/// Time-weight the ascending `sorted` points over `[window_start, window_end)`
fn weighted_window(sorted: &[MetricValue], window_start: u64, window_end: u64) -> WindowedPoint {
    let mut weighted_sum = 0.0;
    let mut total_duration = 0u64;

    // Points before the one holding at `window_start` end before the window.
    let first = sorted
        .partition_point(|point| point.tick <= window_start)
        .saturating_sub(1);

    for (i, current) in sorted.iter().enumerate().skip(first) {
        let held_until = sorted.get(i + 1).map_or(window_end, |next| next.tick);

        let segment_start = window_start.max(current.tick);
        let segment_end = window_end.min(held_until);

        if segment_end <= window_start {
            continue;
        }
        if segment_start >= window_end {
            break;
        }

        let duration = segment_end.saturating_sub(segment_start);
        if duration > 0 {
            weighted_sum += current.value * duration as f64;
            total_duration += duration;
        }
    }

    let value = if total_duration > 0 {
        weighted_sum / total_duration as f64
    } else {
        0.0
    };
    WindowedPoint {
        window_start,
        window_end,
        value,
    }
}

/// Time-weighted average over the trailing `window` ticks of the series
///
/// The window is `[last_tick - window, last_tick]`. Each point's value covers
/// the span since the previous point. Returns `0` for an empty series or a
/// window that covers nothing.
pub fn time_weighted_average(points: &[MetricValue], window: u64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }

    let sorted = sorted_points(points);
    let end_tick = sorted[sorted.len() - 1].tick as i128;
    let start_tick = end_tick - window as i128;

    let mut weighted_sum = 0.0;
    let mut total_duration = 0i128;

    for i in (0..sorted.len()).rev() {
        let current = sorted[i];
        let segment_start = match i.checked_sub(1) {
            Some(prev) => start_tick.max(sorted[prev].tick as i128),
            None => start_tick,
        };
        let segment_end = end_tick.min(current.tick as i128);

        if segment_end <= start_tick {
            break;
        }
        if segment_start >= end_tick {
            continue;
        }

        let duration = segment_end - segment_start;
        if duration > 0 {
            weighted_sum += current.value * duration as f64;
            total_duration += duration;
        }
    }

    if total_duration > 0 {
        weighted_sum / total_duration as f64
    } else {
        0.0
    }
}

/// Pick a window size for a timeline ending at `max_tick`
///
/// Returns `0` (no windowing) for timelines shorter than a minute of game
/// time.
pub fn auto_tick_window(max_tick: u64) -> u64 {
    if max_tick >= 10 * TICKS_PER_MINUTE {
        30 * TICKS_PER_SECOND
    } else if max_tick >= 5 * TICKS_PER_MINUTE {
        15 * TICKS_PER_SECOND
    } else if max_tick >= TICKS_PER_MINUTE {
        TICKS_PER_SECOND
    } else {
        0
    }
}

fn sorted_points(points: &[MetricValue]) -> Vec<MetricValue> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.value.total_cmp(&b.value)));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(raw: &[(u64, f64)]) -> Vec<MetricValue> {
        raw.iter().map(|&(tick, value)| MetricValue::new(tick, value)).collect()
    }

    #[test]
    fn test_single_window_weighted_average() {
        let windows = aggregate_by_window(&points(&[(0, 10.0), (50, 20.0)]), 100).unwrap();
        assert_eq!(
            windows,
            vec![WindowedPoint {
                window_start: 0,
                window_end: 100,
                value: 15.0
            }]
        );
    }

    #[test]
    fn test_sample_spanning_windows_contributes_to_each() {
        // 10 holds over [0, 150), 30 holds from 150 to the end of each window.
        let windows = aggregate_by_window(&points(&[(0, 10.0), (150, 30.0)]), 100).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].value, 10.0);
        assert_eq!((windows[1].window_start, windows[1].window_end), (100, 200));
        assert_eq!(windows[1].value, (10.0 * 50.0 + 30.0 * 50.0) / 100.0);
    }

    #[test]
    fn test_alignment_to_window_multiple() {
        let windows = aggregate_by_window(&points(&[(130, 4.0), (170, 8.0), (260, 2.0)]), 100)
            .unwrap();
        let bounds: Vec<(u64, u64)> = windows
            .iter()
            .map(|w| (w.window_start, w.window_end))
            .collect();
        assert_eq!(bounds, vec![(100, 200), (200, 300)]);
        // [130,170) holds 4, [170,200) holds 8; coverage is 70 ticks.
        assert!((windows[0].value - (4.0 * 40.0 + 8.0 * 30.0) / 70.0).abs() < 1e-12);
        // [200,260) holds 8, [260,300) holds 2.
        assert!((windows[1].value - (8.0 * 60.0 + 2.0 * 40.0) / 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_point_starts_its_window() {
        let windows = aggregate_by_window(&points(&[(0, 1.0), (100, 5.0)]), 100).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].value, 1.0);
        assert_eq!(windows[1].window_start, 100);
        assert_eq!(windows[1].value, 5.0);
    }

    #[test]
    fn test_uncovered_window_is_zero() {
        let sorted = points(&[(50, 3.0), (60, 4.0)]);
        let window = weighted_window(&sorted, 0, 10);
        assert_eq!(window.value, 0.0);
        assert_eq!((window.window_start, window.window_end), (0, 10));

        let window = weighted_window(&sorted, 40, 60);
        assert_eq!(window.value, 3.0);
    }

    #[test]
    fn test_partial_coverage_and_duplicate_ticks() {
        // The first point at tick 5 leaves [0, 5) uncovered: coverage is 5..10.
        let windows = aggregate_by_window(&points(&[(5, 2.0)]), 10).unwrap();
        assert_eq!(windows[0].value, 2.0);

        // A duplicate tick with zero hold time never covers anything on its own.
        let windows = aggregate_by_window(&points(&[(0, 1.0), (0, 9.0)]), 10).unwrap();
        assert_eq!(windows[0].value, 9.0);
    }

    #[test]
    fn test_shuffled_input_matches_sorted_input() {
        let sorted = points(&[
            (0, 3.0),
            (17, 9.5),
            (40, 1.0),
            (40, 4.0),
            (99, 2.0),
            (133, 7.25),
            (250, 0.5),
        ]);
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        shuffled.swap(1, 4);
        shuffled.swap(0, 2);

        assert_eq!(
            aggregate_by_window(&sorted, 50).unwrap(),
            aggregate_by_window(&shuffled, 50).unwrap()
        );
    }

    #[test]
    fn test_empty_and_invalid_window() {
        assert!(aggregate_by_window(&[], 60).unwrap().is_empty());
        assert!(matches!(
            aggregate_by_window(&points(&[(1, 1.0)]), 0),
            Err(ReportError::InvalidWindow { window: 0 })
        ));
    }

    #[test]
    fn test_tick_range_limits() {
        let err = aggregate_by_window(&points(&[(u64::MAX - 5, 1.0)]), 60).unwrap_err();
        assert!(matches!(err, ReportError::WindowRange { window: 60, .. }));

        let sparse = points(&[(3_601, 1.0), (1_000_000_000_000_000_000, 2.0)]);
        let err = aggregate_by_window(&sparse, 1_800).unwrap_err();
        match err {
            ReportError::WindowRange {
                first_tick,
                last_tick,
                limit,
                ..
            } => {
                assert_eq!(first_tick, 3_601);
                assert_eq!(last_tick, 1_000_000_000_000_000_000);
                assert_eq!(limit, MAX_WINDOWS);
            }
            other => panic!("expected WindowRange, got {:?}", other),
        }

        // Exactly at the limit is still accepted.
        let edge = points(&[(0, 1.0), (MAX_WINDOWS - 1, 1.0)]);
        let windows = aggregate_by_window(&edge, 1).unwrap();
        assert_eq!(windows.len() as u64, MAX_WINDOWS);
        assert_eq!(windows[windows.len() - 1].window_end, MAX_WINDOWS);
    }

    #[test]
    fn test_time_weighted_average_trailing_window() {
        assert_eq!(time_weighted_average(&[], 10), 0.0);
        // Window [10, 20]: value 6 covers (10, 20].
        let series = points(&[(0, 2.0), (10, 4.0), (20, 6.0)]);
        assert_eq!(time_weighted_average(&series, 10), 6.0);
        // Window [0, 20]: 4 covers (0, 10], 6 covers (10, 20].
        assert_eq!(time_weighted_average(&series, 20), 5.0);
        // Unsorted input is handled.
        let unsorted = points(&[(20, 6.0), (0, 2.0), (10, 4.0)]);
        assert_eq!(time_weighted_average(&unsorted, 20), 5.0);
    }

    #[test]
    fn test_auto_tick_window() {
        assert_eq!(auto_tick_window(0), 0);
        assert_eq!(auto_tick_window(TICKS_PER_MINUTE - 1), 0);
        assert_eq!(auto_tick_window(TICKS_PER_MINUTE), 60);
        assert_eq!(auto_tick_window(5 * TICKS_PER_MINUTE), 900);
        assert_eq!(auto_tick_window(10 * TICKS_PER_MINUTE), 1800);
    }
}
