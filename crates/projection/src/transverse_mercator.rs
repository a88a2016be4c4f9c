//! Transverse Mercator projection (ellipsoidal, Krüger series).
//!
//! This is the projection behind every UTM zone. The fourth-order Krüger
//! series in the conformal/rectifying-latitude form is accurate to well
//! under a millimetre several zones away from the central meridian, so
//! points can move between neighbouring UTM zones and back losslessly.
//!
//! The projection parameters include:
//! - Central meridian (lon0)
//! - Latitude of origin (lat0)
//! - Scale factor on the central meridian (k0)
//! - False easting / false northing (meters)

use std::f64::consts::PI;

use crate::ellipsoid::Ellipsoid;

/// Transverse Mercator projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of origin in radians
    pub lat0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    /// False easting (meters)
    pub false_easting: f64,
    /// False northing (meters)
    pub false_northing: f64,
    pub ellipsoid: Ellipsoid,
    /// First eccentricity
    e: f64,
    /// Rectifying radius
    big_a: f64,
    alpha: [f64; 4],
    beta: [f64; 4],
    delta: [f64; 4],
    /// Rectifying-sphere northing of the latitude of origin
    xi0: f64,
}

impl TransverseMercator {
    /// Create a projection from parameters in degrees and meters.
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0_deg: f64,
        lat0_deg: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let n = ellipsoid.f / (2.0 - ellipsoid.f);
        let (n2, n3, n4) = (n * n, n * n * n, n * n * n * n);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0,
            49561.0 * n4 / 161_280.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0,
            4397.0 * n4 / 161_280.0,
        ];
        let delta = [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3 + 116.0 * n4 / 45.0,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0 - 227.0 * n4 / 45.0,
            56.0 * n3 / 15.0 - 136.0 * n4 / 35.0,
            4279.0 * n4 / 630.0,
        ];

        let mut proj = Self {
            lon0: lon0_deg.to_radians(),
            lat0: lat0_deg.to_radians(),
            k0,
            false_easting,
            false_northing,
            ellipsoid,
            e: ellipsoid.e2().sqrt(),
            big_a: ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0),
            alpha,
            beta,
            delta,
            xi0: 0.0,
        };
        proj.xi0 = proj.gauss_schreiber(proj.lat0, 0.0).0;
        proj
    }

    /// UTM zone on the WGS84 ellipsoid.
    ///
    /// Zone `z` has its central meridian at `-183 + 6z` degrees. Southern
    /// zones use a false northing of 10 000 km.
    pub fn utm(zone: u8, south: bool) -> Self {
        Self::utm_on(Ellipsoid::WGS84, zone, south)
    }

    /// UTM zone on an arbitrary ellipsoid.
    pub fn utm_on(ellipsoid: Ellipsoid, zone: u8, south: bool) -> Self {
        let lon0 = -183.0 + 6.0 * zone as f64;
        let false_northing = if south { 10_000_000.0 } else { 0.0 };
        Self::new(ellipsoid, lon0, 0.0, 0.9996, 500_000.0, false_northing)
    }

    /// UTM zone containing a longitude.
    pub fn zone_for_longitude(lon_deg: f64) -> u8 {
        let zone = ((lon_deg + 180.0) / 6.0).floor() as i64 + 1;
        zone.clamp(1, 60) as u8
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.lon0.to_degrees()
    }

    /// Map latitude and longitude offset (radians) to the rectifying
    /// coordinates (xi, eta), in units of the rectifying radius.
    fn gauss_schreiber(&self, phi: f64, dlon: f64) -> (f64, f64) {
        let sin_phi = phi.sin();
        let tau = (sin_phi.atanh() - self.e * (self.e * sin_phi).atanh()).sinh();
        let xi_p = tau.atan2(dlon.cos());
        let eta_p = (dlon.sin() / (1.0 + tau * tau).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }
        (xi, eta)
    }

    /// Project geographic coordinates (degrees) to easting/northing (meters).
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        // Normalize longitude difference to [-π, π]
        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let (xi, eta) = self.gauss_schreiber(lat_deg.to_radians(), dlon);
        let scale = self.k0 * self.big_a;
        (
            self.false_easting + scale * eta,
            self.false_northing + scale * (xi - self.xi0),
        )
    }

    /// Convert easting/northing (meters) back to geographic degrees.
    ///
    /// Returns (lon, lat).
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let scale = self.k0 * self.big_a;
        let xi = (northing - self.false_northing) / scale + self.xi0;
        let eta = (easting - self.false_easting) / scale;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        // Conformal latitude, then geodetic latitude.
        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        for (j, delta) in self.delta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            phi += delta * (k * chi).sin();
        }
        let lam = self.lon0 + eta_p.sinh().atan2(xi_p.cos());

        (lam.to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_coords_approx_eq};

    #[test]
    fn test_central_meridian_on_equator() {
        let proj = TransverseMercator::utm(23, true);
        assert_approx_eq!(proj.central_meridian(), -45.0, 1e-12);

        let (e, n) = proj.forward(-45.0, 0.0);
        assert_coords_approx_eq!((e, n), (500_000.0, 10_000_000.0), 1e-6);
    }

    #[test]
    fn test_usgs_worked_example() {
        // Clarke 1866, lat 40°30'N, lon 73°30'W, central meridian 75°W.
        let clarke = Ellipsoid {
            a: 6_378_206.4,
            f: 1.0 - (1.0_f64 - 0.006_768_66).sqrt(),
        };
        let proj = TransverseMercator::new(clarke, -75.0, 0.0, 0.9996, 0.0, 0.0);
        let (x, y) = proj.forward(-73.5, 40.5);
        assert_approx_eq!(x, 127_106.5, 0.5);
        assert_approx_eq!(y, 4_484_124.4, 0.5);
    }

    #[test]
    fn test_utm_23s_sao_paulo_state() {
        let proj = TransverseMercator::utm(23, true);
        let (e, n) = proj.forward(-47.0, -23.0);
        assert_approx_eq!(e, 295_007.83, 0.05);
        assert_approx_eq!(n, 7_455_081.90, 0.05);
    }

    #[test]
    fn test_roundtrip() {
        let proj = TransverseMercator::utm(22, true);
        for &(lon, lat) in &[(-51.0, -10.0), (-49.2, -25.4), (-53.7, -1.0), (-48.1, -33.0)] {
            let (e, n) = proj.forward(lon, lat);
            let (lon2, lat2) = proj.inverse(e, n);
            assert_coords_approx_eq!((lon2, lat2), (lon, lat), 1e-8);
        }
    }

    #[test]
    fn test_roundtrip_far_from_central_meridian() {
        // Zone 22 points projected through zone 23, about 9° off its meridian.
        let west = TransverseMercator::utm(22, true);
        let east = TransverseMercator::utm(23, true);
        for &(e, n) in &[(700_000.0, 7_400_000.0), (300_000.0, 9_000_000.0)] {
            let (lon, lat) = west.inverse(e, n);
            let (e23, n23) = east.forward(lon, lat);
            let (lon2, lat2) = east.inverse(e23, n23);
            let (e2, n2) = west.forward(lon2, lat2);
            assert_coords_approx_eq!((e2, n2), (e, n), 1e-4);
        }
    }

    #[test]
    fn test_latitude_of_origin_offsets_northing() {
        let proj = TransverseMercator::new(Ellipsoid::WGS84, -45.0, -10.0, 1.0, 0.0, 0.0);
        let (e, n) = proj.forward(-45.0, -10.0);
        assert_coords_approx_eq!((e, n), (0.0, 0.0), 1e-6);
        let (lon, lat) = proj.inverse(1000.0, -2000.0);
        let (e2, n2) = proj.forward(lon, lat);
        assert_coords_approx_eq!((e2, n2), (1000.0, -2000.0), 1e-6);
    }

    #[test]
    fn test_zone_for_longitude() {
        assert_eq!(TransverseMercator::zone_for_longitude(-47.0), 23);
        assert_eq!(TransverseMercator::zone_for_longitude(-180.0), 1);
        assert_eq!(TransverseMercator::zone_for_longitude(179.9), 60);
        assert_eq!(TransverseMercator::zone_for_longitude(180.0), 60);
    }
}
