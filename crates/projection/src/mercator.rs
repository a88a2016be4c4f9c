//! Web Mercator (EPSG:3857).
//!
//! Spherical Mercator on the WGS84 semi-major axis, as used by web tiles.

use std::f64::consts::PI;

/// Latitude limit where Web Mercator becomes square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    pub radius: f64,
}

impl WebMercator {
    pub fn new() -> Self {
        Self {
            radius: 6_378_137.0,
        }
    }

    /// Project lon/lat degrees to meters. Latitude is clamped to ±MAX_LATITUDE.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = self.radius * lon_deg.to_radians();
        let y = self.radius * (PI / 4.0 + lat / 2.0).tan().ln();
        (x, y)
    }

    /// Meters to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / self.radius).to_degrees();
        let lat = (2.0 * (y / self.radius).exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    #[test]
    fn test_extent_corner() {
        let merc = WebMercator::new();
        let (x, y) = merc.forward(180.0, MAX_LATITUDE);
        assert_approx_eq!(x, 20_037_508.342_789_244, 1e-6);
        assert_approx_eq!(y, 20_037_508.342_789_244, 1e-3);
    }

    #[test]
    fn test_roundtrip() {
        let merc = WebMercator::new();
        let (x, y) = merc.forward(-47.06, -22.9);
        let (lon, lat) = merc.inverse(x, y);
        assert_coords_approx_eq!((lon, lat), (-47.06, -22.9), 1e-10);
    }

    #[test]
    fn test_latitude_clamped() {
        let merc = WebMercator::new();
        let (_, y_pole) = merc.forward(0.0, 90.0);
        let (_, y_max) = merc.forward(0.0, MAX_LATITUDE);
        assert_eq!(y_pole, y_max);
        assert!(y_pole.is_finite());
    }
}
