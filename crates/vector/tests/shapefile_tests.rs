//! Integration tests: write shapefiles, read, reproject and rewrite them.

use std::path::{Path, PathBuf};

use bioma_common::{BoundingBox, CrsCode};
use projection::wkt;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use test_utils::{assert_approx_eq, prj};
use vector::{area_of_interest, Geometry, Layer, VectorError};

/// UTM 23S coordinates of (-47, -23).
const CENTER: (f64, f64) = (295_007.8275, 7_455_081.8957);

/// One 2 km square field around `CENTER`, with a `name` attribute.
fn write_field(dir: &Path, prj: Option<CrsCode>) -> PathBuf {
    let path = dir.join("talhoes.shp");
    let builder = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("name").unwrap(), 20);
    let mut writer = shapefile::Writer::from_path(&path, builder).unwrap();

    let (cx, cy) = CENTER;
    let square = Polygon::with_rings(vec![PolygonRing::Outer(vec![
        Point::new(cx - 1000.0, cy - 1000.0),
        Point::new(cx - 1000.0, cy + 1000.0),
        Point::new(cx + 1000.0, cy + 1000.0),
        Point::new(cx + 1000.0, cy - 1000.0),
        Point::new(cx - 1000.0, cy - 1000.0),
    ])]);
    let mut record = Record::default();
    record.insert(
        "name".to_string(),
        FieldValue::Character(Some("talhao 1".to_string())),
    );
    writer.write_shape_and_record(&square, &record).unwrap();
    drop(writer);

    if let Some(crs) = prj {
        std::fs::write(path.with_extension("prj"), wkt::to_wkt(crs)).unwrap();
    }
    path
}

fn utm23s() -> CrsCode {
    CrsCode::from_epsg(32723).unwrap()
}

#[test]
fn test_read_identifies_crs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_field(dir.path(), Some(utm23s()));
    let layer = Layer::read(&path).unwrap();

    assert_eq!(layer.crs, Some(utm23s()));
    assert_eq!(layer.features.len(), 1);
    let bounds = layer.total_bounds().unwrap();
    assert_approx_eq!(bounds.width(), 2000.0, 1e-6);
    assert!(matches!(layer.features[0].geometry, Some(Geometry::Polygon(_))));
}

#[test]
fn test_missing_prj_assumes_wgs84() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_field(dir.path(), None);
    let layer = Layer::read(&path).unwrap();
    assert_eq!(layer.crs, Some(CrsCode::Epsg4326));
    assert!(layer.projection.is_geographic());
}

#[test]
fn test_read_identifies_arcgis_prj_files() {
    let cases = [
        (prj::WGS84, CrsCode::Epsg4326),
        (prj::SIRGAS_2000, CrsCode::Epsg4674),
        (prj::WGS84_UTM_23S, utm23s()),
        (prj::SIRGAS_2000_UTM_22S, CrsCode::from_epsg(31982).unwrap()),
    ];
    for (text, expected) in cases {
        let dir = tempfile::tempdir().unwrap();
        let path = write_field(dir.path(), None);
        std::fs::write(path.with_extension("prj"), text).unwrap();

        let layer = Layer::read(&path).unwrap();
        assert_eq!(layer.crs, Some(expected), "{}", text);
    }
}

#[test]
fn test_reproject_to_wgs84() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_field(dir.path(), Some(utm23s()));
    let layer = Layer::read(&path).unwrap().to_crs(CrsCode::Epsg4326);
    let b = layer.total_bounds().unwrap();

    assert!(b.contains_point(-47.0, -23.0));
    // 2 km at 23 degrees south, plus the grid convergence rotation.
    assert_approx_eq!(b.width(), 0.01952, 5e-4);
    assert_approx_eq!(b.height(), 0.01808, 5e-4);
}

#[test]
fn test_area_of_interest_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_field(dir.path(), Some(utm23s()));

    let aoi = area_of_interest(dir.path(), None).unwrap();
    assert!(aoi.west < -47.0 && aoi.east > -47.0);
    assert!(aoi.south < -23.0 && aoi.north > -23.0);

    let clamp = BoundingBox::new(-47.0, -30.0, -40.0, -23.0);
    let clamped = area_of_interest(dir.path(), Some(&clamp)).unwrap();
    assert_eq!(clamped.west, -47.0);
    assert_eq!(clamped.north, -23.0);
    assert_eq!(clamped.east, aoi.east);
    assert_eq!(clamped.south, aoi.south);
}

#[test]
fn test_area_of_interest_without_shapefile() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        area_of_interest(dir.path(), None),
        Err(VectorError::NoShapefile(_))
    ));
}

#[test]
fn test_rewrite_reprojected_layer() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_field(dir.path(), Some(utm23s()));
    let out = dir.path().join("out").join("talhoes_4326.shp");

    let layer = Layer::read(&path).unwrap().to_crs(CrsCode::Epsg4326);
    let expected = layer.total_bounds().unwrap();
    layer.write(&out).unwrap();

    assert!(out.with_extension("shx").is_file());
    assert!(out.with_extension("dbf").is_file());
    let back = Layer::read(&out).unwrap();
    assert_eq!(back.crs, Some(CrsCode::Epsg4326));
    let b = back.total_bounds().unwrap();
    assert_approx_eq!(b.min_x, expected.min_x, 1e-9);
    assert_approx_eq!(b.max_y, expected.max_y, 1e-9);
    assert!(matches!(
        back.features[0].record.get("name"),
        Some(FieldValue::Character(Some(s))) if s.trim() == "talhao 1"
    ));
}

#[test]
fn test_unsupported_projection_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_field(dir.path(), None);
    std::fs::write(
        path.with_extension("prj"),
        "PROJCS[\"Albers\",GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]],PROJECTION[\"Albers\"],UNIT[\"Meter\",1.0]]",
    )
    .unwrap();
    assert!(matches!(
        Layer::read(&path),
        Err(VectorError::Projection(_))
    ));
}
