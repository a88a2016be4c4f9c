//! Date handling for acquisition windows and image metadata.

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{BiomaError, BiomaResult};

/// Inclusive acquisition window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalExtent {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TemporalExtent {
    pub fn new(start: NaiveDate, end: NaiveDate) -> BiomaResult<Self> {
        if start > end {
            return Err(BiomaError::InvertedTemporalExtent {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> BiomaResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for TemporalExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// Serialises as `["YYYY-MM-DD", "YYYY-MM-DD"]`.
impl Serialize for TemporalExtent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.start.format("%Y-%m-%d").to_string())?;
        seq.serialize_element(&self.end.format("%Y-%m-%d").to_string())?;
        seq.end()
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> BiomaResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| BiomaError::invalid_date(s, e.to_string()))
}

/// Parse a TIFF `DateTime` tag value (`YYYY:MM:DD HH:MM:SS`).
pub fn parse_tiff_datetime(s: &str) -> BiomaResult<NaiveDateTime> {
    let trimmed = s.trim_end_matches('\0').trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y:%m:%d %H:%M:%S")
        .map_err(|e| BiomaError::invalid_date(s, e.to_string()))
}

/// Format a timestamp as a TIFF `DateTime` tag value.
pub fn format_tiff_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y:%m:%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extent() {
        let extent = TemporalExtent::parse("2023-01-01", "2023-12-31").unwrap();
        assert_eq!(extent.days(), 365);
        assert_eq!(extent.to_string(), "2023-01-01/2023-12-31");
    }

    #[test]
    fn test_inverted_extent_rejected() {
        let err = TemporalExtent::parse("2023-06-01", "2023-01-01").unwrap_err();
        assert!(matches!(err, BiomaError::InvertedTemporalExtent { .. }));
    }

    #[test]
    fn test_malformed_date_rejected() {
        assert!(TemporalExtent::parse("2023/01/01", "2023-02-01").is_err());
        assert!(TemporalExtent::parse("2023-01-01", "2023-02-30").is_err());
    }

    #[test]
    fn test_serialize_as_pair() {
        let extent = TemporalExtent::parse("2023-01-01", "2023-03-01").unwrap();
        let json = serde_json::to_string(&extent).unwrap();
        assert_eq!(json, r#"["2023-01-01","2023-03-01"]"#);
    }

    #[test]
    fn test_tiff_datetime() {
        let dt = parse_tiff_datetime("2023:05:17 13:45:02\0").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2023, 5, 17).unwrap());
        assert_eq!(format_tiff_datetime(&dt), "2023:05:17 13:45:02");
        assert!(parse_tiff_datetime("2023-05-17").is_err());
    }
}
