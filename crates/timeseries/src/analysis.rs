//! The full analysis: samples → CSVs → events → chart.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use renderer::chart::{self, ChartOptions, Marker, SeriesPoint};
use rusttype::Font;
use tracing::{info, instrument};

use crate::error::{Result, TimeSeriesError};
use crate::events::{classify_events, Event};
use crate::output::{write_filtered_csv, write_full_csv};
use crate::peaks::{find_peaks, find_valleys};
use crate::series::{collect_samples, Series};
use crate::smoothing::{
    deviation_filter, rolling_mean_centered, DEFAULT_MAX_DEVIATION_PCT, DEFAULT_WINDOW,
};

pub const FULL_CSV: &str = "timeseries_full.csv";
pub const FILTERED_CSV: &str = "timeseries_filtered.csv";
pub const CHART_PNG: &str = "timeseries_chart.png";

#[derive(Debug, Clone)]
pub struct AnalysisParams {
    /// Samples changing more than this (percent) are dropped.
    pub max_deviation_pct: f64,
    pub window: usize,
    pub min_prominence: f64,
    /// Minimum peak width, in samples.
    pub min_width: f64,
    pub chart: ChartOptions,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            max_deviation_pct: DEFAULT_MAX_DEVIATION_PCT,
            window: DEFAULT_WINDOW,
            min_prominence: 0.05,
            min_width: 5.0,
            chart: ChartOptions::default(),
        }
    }
}

impl AnalysisParams {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(TimeSeriesError::invalid_parameter("window must be at least 1"));
        }
        let non_negative = |v: f64| v >= 0.0;
        if !non_negative(self.max_deviation_pct) {
            return Err(TimeSeriesError::invalid_parameter(
                "max deviation must be a non-negative percentage",
            ));
        }
        if !non_negative(self.min_prominence) || !non_negative(self.min_width) {
            return Err(TimeSeriesError::invalid_parameter(
                "prominence and width must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Filtered series with its smoothing and events.
#[derive(Debug, Clone)]
pub struct Detection {
    pub filtered: Series,
    pub smoothed: Vec<Option<f64>>,
    pub events: Vec<Event>,
}

impl Detection {
    pub fn event_date(&self, event: &Event) -> Option<NaiveDate> {
        self.filtered.samples().get(event.index()).map(|s| s.date)
    }

    pub fn chart_points(&self) -> Vec<SeriesPoint> {
        self.filtered
            .samples()
            .iter()
            .zip(&self.smoothed)
            .map(|(s, smoothed)| SeriesPoint {
                date: s.date,
                raw: s.value,
                smoothed: *smoothed,
            })
            .collect()
    }

    pub fn chart_markers(&self) -> Vec<Marker> {
        self.events
            .iter()
            .filter_map(|e| {
                let date = self.event_date(e)?;
                Some(match e {
                    Event::Peak(_) => Marker::Peak(date),
                    Event::GrowthOrCut(_) => Marker::GrowthOrCut(date),
                })
            })
            .collect()
    }
}

/// Filter, smooth and find events in a date-sorted series.
///
/// Peaks and valleys are searched on the smoothed values, with missing
/// values taken as 0.
pub fn detect(series: &Series, params: &AnalysisParams) -> Result<Detection> {
    params.validate()?;
    let filtered = deviation_filter(series, params.max_deviation_pct)?;
    let smoothed = rolling_mean_centered(&filtered.values(), params.window)?;

    let signal: Vec<f64> = smoothed.iter().map(|v| v.unwrap_or(0.0)).collect();
    let peaks: Vec<usize> = find_peaks(&signal, params.min_prominence, params.min_width)
        .iter()
        .map(|p| p.index)
        .collect();
    let valleys: Vec<usize> = find_valleys(&signal, params.min_prominence, params.min_width)
        .iter()
        .map(|p| p.index)
        .collect();
    let events = classify_events(&peaks, &valleys);
    info!(
        peaks = peaks.len(),
        valleys = valleys.len(),
        events = events.len(),
        "Detected events"
    );

    Ok(Detection {
        filtered,
        smoothed,
        events,
    })
}

/// Files written by [`analyze`] and what they contain.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub samples: usize,
    pub kept: usize,
    pub events: Vec<(NaiveDate, Event)>,
    pub full_csv: PathBuf,
    pub filtered_csv: PathBuf,
    pub chart: PathBuf,
}

/// Sample every GeoTIFF in `input_dir` and write the CSVs and the chart
/// into `output_dir`.
#[instrument(skip_all, fields(input = %input_dir.display(), output = %output_dir.display()))]
pub fn analyze(
    input_dir: &Path,
    output_dir: &Path,
    params: &AnalysisParams,
    font: Option<&Font>,
) -> Result<AnalysisReport> {
    params.validate()?;
    let series = collect_samples(input_dir)?;
    std::fs::create_dir_all(output_dir)?;

    let full_csv = output_dir.join(FULL_CSV);
    write_full_csv(&full_csv, &series)?;

    let detection = detect(&series, params)?;
    let filtered_csv = output_dir.join(FILTERED_CSV);
    write_filtered_csv(&filtered_csv, &detection.filtered, &detection.smoothed)?;

    let image = chart::render_time_series(
        &detection.chart_points(),
        &detection.chart_markers(),
        font,
        &params.chart,
    )?;
    let chart = output_dir.join(CHART_PNG);
    renderer::png::save_rgb(&chart, &image, &[("Title", params.chart.title.as_str())])?;

    let events = detection
        .events
        .iter()
        .filter_map(|e| detection.event_date(e).map(|d| (d, *e)))
        .collect();
    info!(
        samples = series.len(),
        kept = detection.filtered.len(),
        chart = %chart.display(),
        "Time series analysis complete"
    );

    Ok(AnalysisReport {
        samples: series.len(),
        kept: detection.filtered.len(),
        events,
        full_csv,
        filtered_csv,
        chart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Sample;
    use test_utils::{create_crop_cycle_series, create_dates};

    fn series_of(values: &[f64]) -> Series {
        let dates = create_dates(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), values.len(), 5);
        Series::sorted(
            dates
                .into_iter()
                .zip(values)
                .map(|(date, &value)| Sample { date, value })
                .collect(),
        )
    }

    #[test]
    fn test_detects_harvest_cycles() {
        // Three 30-sample cycles growing from 0.3 to 0.8, then cut.
        let values = create_crop_cycle_series(3, 30, 0.3, 0.8);
        let detection = detect(&series_of(&values), &AnalysisParams::default()).unwrap();

        // The cut from 0.8 to 0.3 is -62.5%, inside the filter. Only the
        // first sample, which has no predecessor, is dropped.
        assert_eq!(detection.filtered.len(), values.len() - 1);
        assert!(detection.smoothed[..4].iter().all(Option::is_none));

        let kinds: Vec<&str> = detection.events.iter().map(Event::label).collect();
        assert!(kinds.len() >= 2, "events: {:?}", detection.events);
        assert_eq!(kinds[0], "peak");
        for pair in kinds.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        // The first peak sits just before the first cut.
        let first = detection.events[0].index();
        assert!((23..=29).contains(&first), "first peak at {}", first);
        assert_eq!(detection.chart_markers().len(), detection.events.len());
    }

    #[test]
    fn test_series_shorter_than_window_has_no_events() {
        let detection = detect(&series_of(&[0.4; 8]), &AnalysisParams::default()).unwrap();
        assert!(detection.smoothed.iter().all(Option::is_none));
        assert!(detection.events.is_empty());
        assert_eq!(detection.chart_points().len(), 8);
    }

    #[test]
    fn test_invalid_params() {
        let params = AnalysisParams {
            window: 0,
            ..Default::default()
        };
        assert!(detect(&series_of(&[0.4; 3]), &params).is_err());
        let params = AnalysisParams {
            max_deviation_pct: f64::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
