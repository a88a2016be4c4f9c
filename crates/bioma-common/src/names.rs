//! Dates embedded in product file names.
//!
//! Batch results come back as `openEO_2023-05-01Z.tif`, renamed RGB scenes as
//! `RGB_2023-05-01.tif`, and composites as `combined_openEO_2023-05-01Z.png`.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn iso_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"))
}

/// Second `_`-separated segment of a file name, cut at the first `Z`
/// and at the extension.
///
/// `openEO_2023-05-01Z.tif` gives `2023-05-01`, `RGB_2023-05-01.png` gives
/// `2023-05-01`, `scene.tif` gives `None`.
pub fn date_from_segment(file_name: &str) -> Option<String> {
    let segment = file_name.split('_').nth(1)?;
    let segment = segment.split('Z').next().unwrap_or(segment);
    let segment = match segment.rfind('.') {
        Some(dot) => &segment[..dot],
        None => segment,
    };
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

/// First `YYYY-MM-DD` substring of a name.
pub fn find_iso_date(name: &str) -> Option<String> {
    iso_date_regex().find(name).map(|m| m.as_str().to_string())
}

/// First `YYYY-MM-DD` substring that is also a real calendar date.
pub fn parse_iso_date(name: &str) -> Option<NaiveDate> {
    iso_date_regex()
        .find_iter(name)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
}
