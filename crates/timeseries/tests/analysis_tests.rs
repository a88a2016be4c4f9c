//! Integration tests: time-series analysis over a directory of GeoTIFFs.

use std::path::Path;

use bioma_common::CrsCode;
use chrono::NaiveDate;
use raster::Raster;
use test_utils::{assert_approx_eq, create_crop_cycle_series, create_dates, create_grid_with_nans};
use timeseries::analysis::{CHART_PNG, FILTERED_CSV, FULL_CSV};
use timeseries::{analyze, collect_samples, AnalysisParams, Event, TimeSeriesError};

// ============================================================================
// Helpers
// ============================================================================

fn write_scene(dir: &Path, name: &str, value: f32) {
    let data = create_grid_with_nans(4, 4, value, &[(0, 0)]);
    let raster = Raster::new(4, 4, data)
        .unwrap()
        .with_crs(CrsCode::Epsg4326)
        .with_nodata(f64::NAN);
    geotiff::write_f32(&dir.join(name), &raster).unwrap();
}

fn scene_name(date: NaiveDate) -> String {
    format!("openEO_{}Z.tif", date.format("%Y-%m-%d"))
}

/// Two harvest cycles, one scene every 5 days, written in reverse order.
fn write_cycles(dir: &Path) -> Vec<NaiveDate> {
    let values = create_crop_cycle_series(2, 30, 0.3, 0.8);
    let dates = create_dates(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(), values.len(), 5);
    for (date, value) in dates.iter().zip(&values).rev() {
        write_scene(dir, &scene_name(*date), *value as f32);
    }
    dates
}

fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect()
}

// ============================================================================
// Sampling
// ============================================================================

#[test]
fn test_samples_sorted_and_bad_names_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_scene(dir.path(), "openEO_2023-02-01Z.tif", 0.6);
    write_scene(dir.path(), "openEO_2023-01-01Z.tif", 0.4);
    write_scene(dir.path(), "openEO_not-a-dateZ.tif", 0.9);
    write_scene(dir.path(), "ndvi.tif", 0.9);
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let series = collect_samples(dir.path()).unwrap();
    assert_eq!(
        series.dates(),
        vec![
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()
        ]
    );
    assert_approx_eq!(series.values()[0], 0.4, 1e-6);
    assert_approx_eq!(series.values()[1], 0.6, 1e-6);
}

#[test]
fn test_integer_reflectance_is_scaled() {
    let dir = tempfile::tempdir().unwrap();
    write_scene(dir.path(), "openEO_2023-01-01Z.tif", 4500.0);
    let series = collect_samples(dir.path()).unwrap();
    assert_approx_eq!(series.values()[0], 0.45, 1e-6);
}

#[test]
fn test_no_tiffs_and_no_samples() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        collect_samples(dir.path()),
        Err(TimeSeriesError::NoTiffs(_))
    ));

    write_scene(dir.path(), "scene.tif", 0.5);
    assert!(matches!(
        collect_samples(dir.path()),
        Err(TimeSeriesError::NoSamples(_))
    ));
}

// ============================================================================
// Full analysis
// ============================================================================

#[test]
fn test_analyze_writes_tables_and_chart() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("analysis");
    let dates = write_cycles(input.path());

    let report = analyze(input.path(), &out_dir, &AnalysisParams::default(), None).unwrap();
    assert_eq!(report.samples, 60);
    assert_eq!(report.kept, 59);

    let full = csv_rows(&out_dir.join(FULL_CSV));
    assert_eq!(full[0], vec!["date", "mean_ndvi"]);
    assert_eq!(full.len(), 61);
    assert_eq!(full[1][0], "2022-01-01");

    let filtered = csv_rows(&out_dir.join(FILTERED_CSV));
    assert_eq!(filtered[0], vec!["date", "mean_ndvi", "smoothed_ndvi"]);
    assert_eq!(filtered.len(), 60);
    // The first sample has no predecessor and is filtered out.
    assert_eq!(filtered[1][0], full[2][0]);
    // Window of 9: the first four rows have no smoothed value.
    assert_eq!(filtered[1][2], "");
    assert_ne!(filtered[5][2], "");

    let png = std::fs::read(out_dir.join(CHART_PNG)).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(report.chart, out_dir.join(CHART_PNG));

    // Peak, cut, peak: the growth curve peaks just before each harvest.
    let kinds: Vec<&str> = report.events.iter().map(|(_, e)| e.label()).collect();
    assert_eq!(kinds, vec!["peak", "growth_or_cut", "peak"]);
    match report.events[0] {
        // Event indices count filtered samples, which start at the second date.
        (date, Event::Peak(index)) => assert_eq!(date, dates[index + 1]),
        other => panic!("unexpected first event {:?}", other),
    }
}

#[test]
fn test_analyze_rejects_bad_window() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_cycles(input.path());
    let params = AnalysisParams {
        window: 0,
        ..Default::default()
    };
    assert!(analyze(input.path(), output.path(), &params, None).is_err());
    assert!(!output.path().join(FULL_CSV).exists());
}
