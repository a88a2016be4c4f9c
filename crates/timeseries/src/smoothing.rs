//! Outlier removal and smoothing.

use tracing::debug;

use crate::error::{Result, TimeSeriesError};
use crate::series::Series;

/// Default threshold of [`deviation_filter`], in percent.
pub const DEFAULT_MAX_DEVIATION_PCT: f64 = 100.0;
/// Default window of [`rolling_mean_centered`].
pub const DEFAULT_WINDOW: usize = 9;

/// Percent change of each sample against the previous one, on the input
/// order. The first entry is `None`.
///
/// The denominator keeps its sign, so a negative previous value gives a
/// negative change; a zero previous value gives an infinite or NaN change.
pub fn percent_changes(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        if i == 0 {
            out.push(None);
        } else {
            let prev = values[i - 1];
            out.push(Some((v - prev).abs() / prev * 100.0));
        }
    }
    out
}

/// Drop samples that changed by more than `max_pct` percent since the
/// previous sample of the unfiltered series.
///
/// The first sample has no change to compare and is dropped, as are samples
/// whose change is NaN.
pub fn deviation_filter(series: &Series, max_pct: f64) -> Result<Series> {
    let changes = percent_changes(&series.values());
    let kept: Vec<_> = series
        .samples()
        .iter()
        .zip(changes)
        .filter(|(_, change)| matches!(change, Some(pct) if *pct <= max_pct))
        .map(|(s, _)| *s)
        .collect();

    debug!(
        input = series.len(),
        kept = kept.len(),
        max_pct,
        "Deviation filter"
    );
    if kept.is_empty() {
        return Err(TimeSeriesError::EmptyAfterFilter);
    }
    Ok(Series::sorted(kept))
}

/// Centred moving average. Position `i` averages
/// `values[i + w/2 + 1 - w ..= i + w/2]` and is `None` where that window
/// leaves the series.
pub fn rolling_mean_centered(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(TimeSeriesError::invalid_parameter("window must be at least 1"));
    }
    let n = values.len();
    let ahead = window / 2;
    let behind = window - 1 - ahead;

    Ok((0..n)
        .map(|i| {
            if i < behind || i + ahead >= n {
                return None;
            }
            let slice = &values[i - behind..=i + ahead];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Sample;
    use chrono::NaiveDate;
    use test_utils::assert_approx_eq;

    fn series(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Sample {
                date: start + chrono::Duration::days(5 * i as i64),
                value,
            })
            .collect();
        Series::sorted(samples)
    }

    #[test]
    fn test_spike_and_its_successor_are_dropped() {
        // 0.2 -> 0.5 is +150%, 0.5 -> 0.21 is -58%.
        let filtered = deviation_filter(&series(&[0.2, 0.5, 0.21, 0.22]), 100.0).unwrap();
        assert_eq!(filtered.values(), vec![0.21, 0.22]);
    }

    #[test]
    fn test_changes_use_unfiltered_neighbours() {
        // 0.1 -> 0.3 (+200%) dropped; 0.3 -> 0.1 (-67%) kept although
        // 0.3 itself was dropped.
        let filtered = deviation_filter(&series(&[0.1, 0.3, 0.1]), 100.0).unwrap();
        assert_eq!(filtered.values(), vec![0.1]);
        assert_eq!(filtered.samples()[0].date, NaiveDate::from_ymd_opt(2023, 1, 11).unwrap());
    }

    #[test]
    fn test_first_sample_dropped_and_exact_threshold_passes() {
        let filtered = deviation_filter(&series(&[0.2, 0.4]), 100.0).unwrap();
        assert_eq!(filtered.values(), vec![0.4]);

        let filtered = deviation_filter(&series(&[0.20, 0.21, 0.22]), 100.0).unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.samples()[0].date, NaiveDate::from_ymd_opt(2023, 1, 6).unwrap());
    }

    #[test]
    fn test_single_sample_is_empty_after_filter() {
        assert!(matches!(
            deviation_filter(&series(&[0.5]), 100.0),
            Err(TimeSeriesError::EmptyAfterFilter)
        ));
    }

    #[test]
    fn test_zero_predecessor_drops_sample() {
        // 0.2 -> 0.0 is exactly -100%; 0.0 -> 0.3 is infinite.
        let filtered = deviation_filter(&series(&[0.2, 0.0, 0.3, 0.31]), 100.0).unwrap();
        assert_eq!(filtered.values(), vec![0.0, 0.31]);
    }

    #[test]
    fn test_empty_series() {
        assert!(matches!(
            deviation_filter(&Series::default(), 100.0),
            Err(TimeSeriesError::EmptyAfterFilter)
        ));
    }

    #[test]
    fn test_rolling_mean_odd_window() {
        let values: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let smoothed = rolling_mean_centered(&values, 9).unwrap();
        assert!(smoothed[..4].iter().all(Option::is_none));
        assert_approx_eq!(smoothed[4].unwrap(), 4.0, 1e-12);
        assert_approx_eq!(smoothed[7].unwrap(), 7.0, 1e-12);
        assert!(smoothed[8..].iter().all(Option::is_none));
    }

    #[test]
    fn test_rolling_mean_even_window_leans_forward() {
        let smoothed = rolling_mean_centered(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(smoothed, vec![Some(1.5), Some(2.5), Some(3.5), None]);
    }

    #[test]
    fn test_rolling_mean_short_series_and_bad_window() {
        assert_eq!(rolling_mean_centered(&[1.0, 2.0], 9).unwrap(), vec![None, None]);
        assert!(rolling_mean_centered(&[1.0], 0).is_err());
    }
}
