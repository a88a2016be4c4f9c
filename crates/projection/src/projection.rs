//! Projection selection from CRS codes and WKT.

use bioma_common::{CrsCode, Datum};
use tracing::debug;

use crate::ellipsoid::Ellipsoid;
use crate::error::{ProjectionError, Result};
use crate::mercator::WebMercator;
use crate::transverse_mercator::TransverseMercator;
use crate::wkt::{self, normalize, WktNode};

/// A map projection, or plain lon/lat.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees.
    Geographic,
    WebMercator(WebMercator),
    TransverseMercator(TransverseMercator),
}

impl Projection {
    /// Projection for a supported EPSG code.
    pub fn from_crs(crs: CrsCode) -> Self {
        match crs {
            CrsCode::Epsg4326 | CrsCode::Epsg4674 => Projection::Geographic,
            CrsCode::Epsg3857 => Projection::WebMercator(WebMercator::new()),
            CrsCode::Utm { zone, south, datum } => {
                let ellipsoid = match datum {
                    Datum::Wgs84 => Ellipsoid::WGS84,
                    Datum::Sirgas2000 => Ellipsoid::GRS80,
                };
                Projection::TransverseMercator(TransverseMercator::utm_on(ellipsoid, zone, south))
            }
        }
    }

    /// Projection described by WKT text (e.g. the contents of a `.prj`).
    pub fn from_wkt(text: &str) -> Result<Self> {
        let root = wkt::parse(text)?;
        Self::from_wkt_node(&root)
    }

    pub fn from_wkt_node(root: &WktNode) -> Result<Self> {
        match root.keyword.to_uppercase().as_str() {
            "GEOGCS" | "GEOGCRS" | "GEODCRS" => Ok(Projection::Geographic),
            "PROJCS" | "PROJCRS" => projected_from_wkt(root),
            other => Err(ProjectionError::UnsupportedProjection(format!(
                "root node {}",
                other
            ))),
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Projection::Geographic)
    }

    /// Projected (or geographic) coordinates to lon/lat degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::WebMercator(p) => p.inverse(x, y),
            Projection::TransverseMercator(p) => p.inverse(x, y),
        }
    }

    /// Lon/lat degrees to this projection.
    pub fn from_geographic(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator(p) => p.forward(lon, lat),
            Projection::TransverseMercator(p) => p.forward(lon, lat),
        }
    }
}

fn projected_from_wkt(root: &WktNode) -> Result<Projection> {
    let method = root
        .child("PROJECTION")
        .or_else(|| root.find("METHOD"))
        .and_then(|n| n.name())
        .ok_or_else(|| ProjectionError::MissingParameter("PROJECTION".to_string()))?;

    if let Some(unit) = root.child("UNIT").or_else(|| root.child("LENGTHUNIT")) {
        let factor = unit.numbers().first().copied().unwrap_or(1.0);
        if (factor - 1.0).abs() > 1e-12 {
            return Err(ProjectionError::UnsupportedProjection(format!(
                "linear unit {} ({} m)",
                unit.name().unwrap_or("?"),
                factor
            )));
        }
    }

    let ellipsoid = root
        .find("SPHEROID")
        .or_else(|| root.find("ELLIPSOID"))
        .and_then(|s| {
            let numbers = s.numbers();
            match numbers.as_slice() {
                [a, inv_f, ..] => Some(Ellipsoid::from_inverse_flattening(*a, *inv_f)),
                _ => None,
            }
        })
        .unwrap_or_default();

    debug!(method = method, a = ellipsoid.a, "Parsed projected WKT");

    match normalize(method).as_str() {
        "transversemercator" | "gausskruger" => {
            let param = |names: &[&str], default: Option<f64>| -> Result<f64> {
                names
                    .iter()
                    .find_map(|n| root.parameter(n))
                    .or(default)
                    .ok_or_else(|| ProjectionError::MissingParameter(names[0].to_string()))
            };
            let lon0 = param(&["central_meridian", "longitude_of_natural_origin"], None)?;
            let lat0 = param(
                &["latitude_of_origin", "latitude_of_natural_origin"],
                Some(0.0),
            )?;
            let k0 = param(
                &["scale_factor", "scale_factor_at_natural_origin"],
                Some(1.0),
            )?;
            let fe = param(&["false_easting"], Some(0.0))?;
            let fn_ = param(&["false_northing"], Some(0.0))?;
            Ok(Projection::TransverseMercator(TransverseMercator::new(
                ellipsoid, lon0, lat0, k0, fe, fn_,
            )))
        }
        "mercatorauxiliarysphere" | "popularvisualisationpseudomercator" => {
            Ok(Projection::WebMercator(WebMercator::new()))
        }
        _ => Err(ProjectionError::UnsupportedProjection(method.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_coords_approx_eq;

    #[test]
    fn test_wkt_matches_epsg() {
        let crs = CrsCode::from_epsg(32723).unwrap();
        let from_wkt = Projection::from_wkt(&wkt::to_wkt(crs)).unwrap();
        let from_code = Projection::from_crs(crs);

        let a = from_wkt.from_geographic(-46.6, -23.5);
        let b = from_code.from_geographic(-46.6, -23.5);
        assert_coords_approx_eq!((a.0, a.1), (b.0, b.1), 1e-6);
    }

    #[test]
    fn test_geographic_passthrough() {
        let proj = Projection::from_wkt(&wkt::to_wkt(CrsCode::Epsg4674)).unwrap();
        assert!(proj.is_geographic());
        assert_eq!(proj.to_geographic(-47.0, -22.0), (-47.0, -22.0));
    }

    #[test]
    fn test_web_mercator_wkt() {
        let proj = Projection::from_wkt(&wkt::to_wkt(CrsCode::Epsg3857)).unwrap();
        assert!(matches!(proj, Projection::WebMercator(_)));
    }

    #[test]
    fn test_unsupported_method() {
        let text = r#"PROJCS["Albers",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Albers"],UNIT["Meter",1.0]]"#;
        assert!(matches!(
            Projection::from_wkt(text),
            Err(ProjectionError::UnsupportedProjection(_))
        ));
    }

    #[test]
    fn test_feet_rejected() {
        let text = r#"PROJCS["x",GEOGCS["GCS_WGS_1984",DATUM["D",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Transverse_Mercator"],PARAMETER["Central_Meridian",-75.0],UNIT["Foot_US",0.3048006096012192]]"#;
        assert!(Projection::from_wkt(text).is_err());
    }
}
