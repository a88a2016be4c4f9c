//! Coordinate Reference System codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BiomaError, BiomaResult};

/// Geodetic datum behind a CRS.
///
/// WGS84 and SIRGAS 2000 share an ellipsoid to within a millimetre, and the
/// transforms in this workspace treat them as identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datum {
    Wgs84,
    Sirgas2000,
}

/// CRS codes supported end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 geographic (lon/lat in degrees)
    Epsg4326,
    /// SIRGAS 2000 geographic
    Epsg4674,
    /// Web Mercator (meters)
    Epsg3857,
    /// Universal Transverse Mercator zone on the given datum
    Utm { zone: u8, south: bool, datum: Datum },
}

impl CrsCode {
    /// Map an EPSG number onto a supported code.
    pub fn from_epsg(code: u32) -> BiomaResult<Self> {
        let crs = match code {
            4326 => CrsCode::Epsg4326,
            4674 => CrsCode::Epsg4674,
            3857 | 900913 => CrsCode::Epsg3857,
            32601..=32660 => CrsCode::Utm {
                zone: (code - 32600) as u8,
                south: false,
                datum: Datum::Wgs84,
            },
            32701..=32760 => CrsCode::Utm {
                zone: (code - 32700) as u8,
                south: true,
                datum: Datum::Wgs84,
            },
            // SIRGAS 2000 / UTM zone 11N..22N
            31965..=31976 => CrsCode::Utm {
                zone: (code - 31965 + 11) as u8,
                south: false,
                datum: Datum::Sirgas2000,
            },
            // SIRGAS 2000 / UTM zone 17S..25S
            31977..=31985 => CrsCode::Utm {
                zone: (code - 31977 + 17) as u8,
                south: true,
                datum: Datum::Sirgas2000,
            },
            _ => return Err(BiomaError::UnsupportedCrs(format!("EPSG:{}", code))),
        };
        Ok(crs)
    }

    /// UTM zone on a datum, rejecting zones the datum has no EPSG code for.
    pub fn utm(zone: u8, south: bool, datum: Datum) -> BiomaResult<Self> {
        let valid = match (datum, south) {
            (Datum::Wgs84, _) => (1..=60).contains(&zone),
            (Datum::Sirgas2000, false) => (11..=22).contains(&zone),
            (Datum::Sirgas2000, true) => (17..=25).contains(&zone),
        };
        if !valid {
            return Err(BiomaError::UnsupportedCrs(format!(
                "UTM zone {}{} on {:?}",
                zone,
                if south { 'S' } else { 'N' },
                datum
            )));
        }
        Ok(CrsCode::Utm { zone, south, datum })
    }

    /// Parse "EPSG:xxxx", "epsg:xxxx", a bare EPSG number or "CRS:84".
    pub fn parse(s: &str) -> BiomaResult<Self> {
        let normalized = s.trim().to_uppercase();
        if normalized == "CRS:84" || normalized == "WGS84" {
            return Ok(CrsCode::Epsg4326);
        }

        let digits = normalized.strip_prefix("EPSG:").unwrap_or(&normalized);
        let code: u32 = digits
            .parse()
            .map_err(|_| BiomaError::UnsupportedCrs(s.to_string()))?;
        Self::from_epsg(code)
    }

    /// EPSG number of this CRS.
    pub fn epsg(&self) -> u32 {
        match *self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg4674 => 4674,
            CrsCode::Epsg3857 => 3857,
            CrsCode::Utm {
                zone,
                south,
                datum: Datum::Wgs84,
            } => {
                if south {
                    32700 + zone as u32
                } else {
                    32600 + zone as u32
                }
            }
            CrsCode::Utm {
                zone,
                south,
                datum: Datum::Sirgas2000,
            } => {
                if south {
                    31977 + zone as u32 - 17
                } else {
                    31965 + zone as u32 - 11
                }
            }
        }
    }

    /// Check if this is a geographic (lon/lat) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Epsg4674)
    }

    /// UTM zone and hemisphere, when this is a UTM CRS.
    pub fn utm_zone(&self) -> Option<(u8, bool)> {
        match *self {
            CrsCode::Utm { zone, south, .. } => Some((zone, south)),
            _ => None,
        }
    }

    pub fn datum(&self) -> Datum {
        match *self {
            CrsCode::Epsg4674 => Datum::Sirgas2000,
            CrsCode::Utm { datum, .. } => datum,
            _ => Datum::Wgs84,
        }
    }

    /// Human-readable name, as used in `.prj` files.
    pub fn name(&self) -> String {
        match *self {
            CrsCode::Epsg4326 => "GCS_WGS_1984".to_string(),
            CrsCode::Epsg4674 => "GCS_SIRGAS_2000".to_string(),
            CrsCode::Epsg3857 => "WGS_1984_Web_Mercator_Auxiliary_Sphere".to_string(),
            CrsCode::Utm { zone, south, datum } => {
                let prefix = match datum {
                    Datum::Wgs84 => "WGS_1984",
                    Datum::Sirgas2000 => "SIRGAS_2000",
                };
                format!(
                    "{}_UTM_Zone_{}{}",
                    prefix,
                    zone,
                    if south { 'S' } else { 'N' }
                )
            }
        }
    }
}

impl FromStr for CrsCode {
    type Err = BiomaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CrsCode::parse(s)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
