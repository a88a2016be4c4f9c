//! Well-known text (WKT1) CRS definitions, as found in ESRI `.prj` files.
//!
//! The parser builds a generic node tree:
//!
//! ```text
//! PROJCS["WGS_1984_UTM_Zone_23S",
//!     GEOGCS["GCS_WGS_1984", DATUM[..., SPHEROID["WGS_1984",6378137.0,298.257223563]], ...],
//!     PROJECTION["Transverse_Mercator"],
//!     PARAMETER["Central_Meridian",-45.0], ...
//!     UNIT["Meter",1.0]]
//! ```
//!
//! Both `[...]` and `(...)` delimiters are accepted. Unquoted identifiers
//! (e.g. `AXIS["X",EAST]`) are kept as strings.

use bioma_common::{CrsCode, Datum};

use crate::error::{ProjectionError, Result};

/// One value inside a WKT node.
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Str(String),
    Num(f64),
    Node(WktNode),
}

/// A `KEYWORD[...]` node.
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub values: Vec<WktValue>,
}

impl WktNode {
    /// First string value, which WKT uses as the node name.
    pub fn name(&self) -> Option<&str> {
        self.values.iter().find_map(|v| match v {
            WktValue::Str(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Numeric values, in order.
    pub fn numbers(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|v| match v {
                WktValue::Num(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    /// Direct children with the given keyword (case-insensitive).
    pub fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a WktNode> + 'a {
        self.values.iter().filter_map(move |v| match v {
            WktValue::Node(n) if n.keyword.eq_ignore_ascii_case(keyword) => Some(n),
            _ => None,
        })
    }

    pub fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.values.iter().find_map(|v| match v {
            WktValue::Node(n) if n.keyword.eq_ignore_ascii_case(keyword) => Some(n),
            _ => None,
        })
    }

    /// Depth-first search for a descendant with the given keyword.
    pub fn find(&self, keyword: &str) -> Option<&WktNode> {
        for value in &self.values {
            if let WktValue::Node(node) = value {
                if node.keyword.eq_ignore_ascii_case(keyword) {
                    return Some(node);
                }
                if let Some(found) = node.find(keyword) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Value of `PARAMETER[name, value]`, matching names loosely
    /// (case, spaces and underscores are ignored).
    pub fn parameter(&self, name: &str) -> Option<f64> {
        let wanted = normalize(name);
        self.children("PARAMETER").find_map(|p| {
            let pname = p.name()?;
            if normalize(pname) == wanted {
                p.numbers().first().copied()
            } else {
                None
            }
        })
    }

    /// `AUTHORITY["EPSG", "xxxx"]` code attached directly to this node.
    pub fn epsg(&self) -> Option<u32> {
        let authority = self.child("AUTHORITY").or_else(|| self.child("ID"))?;
        if !authority.name()?.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        authority.values.iter().skip(1).find_map(|v| match v {
            WktValue::Str(s) => s.parse().ok(),
            WktValue::Num(n) => Some(*n as u32),
            _ => None,
        })
    }
}

/// Lowercase and drop spaces and underscores.
pub(crate) fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parse WKT text into a node tree.
pub fn parse(text: &str) -> Result<WktNode> {
    let mut parser = Parser {
        chars: text.trim().char_indices().peekable(),
        text: text.trim(),
    };
    let node = parser.node()?;
    parser.skip_ws();
    if let Some((pos, _)) = parser.chars.peek() {
        return Err(ProjectionError::invalid_wkt(format!(
            "trailing content at offset {}",
            pos
        )));
    }
    Ok(node)
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        ident
    }

    fn node(&mut self) -> Result<WktNode> {
        self.skip_ws();
        let keyword = self.identifier();
        if keyword.is_empty() {
            return Err(ProjectionError::invalid_wkt("expected keyword"));
        }
        self.skip_ws();
        let close = match self.chars.next() {
            Some((_, '[')) => ']',
            Some((_, '(')) => ')',
            other => {
                return Err(ProjectionError::invalid_wkt(format!(
                    "expected '[' after {}, found {:?}",
                    keyword,
                    other.map(|(_, c)| c)
                )))
            }
        };

        let mut values = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek().copied() {
                Some((_, c)) if c == close => {
                    self.chars.next();
                    break;
                }
                Some((_, ',')) => {
                    self.chars.next();
                }
                Some((_, '"')) => values.push(WktValue::Str(self.quoted()?)),
                Some((_, c)) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                    values.push(WktValue::Num(self.number()?))
                }
                Some((_, c)) if c.is_alphabetic() => {
                    // Either a nested node or a bare enum value like EAST.
                    let mut lookahead = self.chars.clone();
                    while matches!(lookahead.peek(), Some((_, c)) if c.is_alphanumeric() || *c == '_')
                    {
                        lookahead.next();
                    }
                    while matches!(lookahead.peek(), Some((_, c)) if c.is_whitespace()) {
                        lookahead.next();
                    }
                    if matches!(lookahead.peek(), Some((_, '[')) | Some((_, '('))) {
                        values.push(WktValue::Node(self.node()?));
                    } else {
                        values.push(WktValue::Str(self.identifier()));
                    }
                }
                Some((pos, c)) => {
                    return Err(ProjectionError::invalid_wkt(format!(
                        "unexpected '{}' at offset {}",
                        c, pos
                    )))
                }
                None => {
                    return Err(ProjectionError::invalid_wkt(format!(
                        "unterminated {} node",
                        keyword
                    )))
                }
            }
        }

        Ok(WktNode { keyword, values })
    }

    fn quoted(&mut self) -> Result<String> {
        self.chars.next();
        let mut s = String::new();
        loop {
            match self.chars.next() {
                // A doubled quote is an escaped quote.
                Some((_, '"')) => {
                    if matches!(self.chars.peek(), Some((_, '"'))) {
                        self.chars.next();
                        s.push('"');
                    } else {
                        return Ok(s);
                    }
                }
                Some((_, c)) => s.push(c),
                None => return Err(ProjectionError::invalid_wkt("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = match self.chars.peek() {
            Some(&(pos, _)) => pos,
            None => return Err(ProjectionError::invalid_wkt("expected number")),
        };
        let mut end = start;
        while let Some(&(pos, c)) = self.chars.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let literal = &self.text[start..end];
        literal
            .parse()
            .map_err(|_| ProjectionError::invalid_wkt(format!("invalid number '{}'", literal)))
    }
}

/// Best-effort identification of a supported EPSG code.
///
/// Uses the top-level AUTHORITY when present, otherwise the ESRI names
/// written by ArcGIS and QGIS (`GCS_WGS_1984`, `WGS_1984_UTM_Zone_23S`,
/// `SIRGAS_2000_UTM_Zone_22S`, ...).
pub fn identify(root: &WktNode) -> Option<CrsCode> {
    if let Some(code) = root.epsg() {
        if let Ok(crs) = CrsCode::from_epsg(code) {
            return Some(crs);
        }
    }

    let name = normalize(root.name()?);
    match root.keyword.to_uppercase().as_str() {
        "GEOGCS" | "GEOGCRS" | "GEODCRS" => {
            if name.contains("sirgas") {
                Some(CrsCode::Epsg4674)
            } else if name.contains("wgs1984") || name.contains("wgs84") {
                Some(CrsCode::Epsg4326)
            } else {
                None
            }
        }
        "PROJCS" | "PROJCRS" => {
            if name.contains("webmercator") || name.contains("pseudomercator") {
                return Some(CrsCode::Epsg3857);
            }
            let zone_part = name.split("utmzone").nth(1)?;
            let digits: String = zone_part.chars().take_while(|c| c.is_ascii_digit()).collect();
            let zone: u8 = digits.parse().ok()?;
            let south = zone_part[digits.len()..].starts_with('s');
            let datum = if name.contains("sirgas") {
                Datum::Sirgas2000
            } else if name.contains("wgs1984") || name.contains("wgs84") {
                Datum::Wgs84
            } else {
                return None;
            };
            CrsCode::utm(zone, south, datum).ok()
        }
        _ => None,
    }
}

/// ESRI-flavoured WKT for a supported CRS, suitable for a `.prj` file.
pub fn to_wkt(crs: CrsCode) -> String {
    let geogcs = match crs.datum() {
        Datum::Wgs84 => "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]",
        Datum::Sirgas2000 => "GEOGCS[\"GCS_SIRGAS_2000\",DATUM[\"D_SIRGAS_2000\",SPHEROID[\"GRS_1980\",6378137.0,298.257222101]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]",
    };

    match crs {
        CrsCode::Epsg4326 | CrsCode::Epsg4674 => geogcs.to_string(),
        CrsCode::Epsg3857 => format!(
            "PROJCS[\"{}\",{},PROJECTION[\"Mercator_Auxiliary_Sphere\"],PARAMETER[\"False_Easting\",0.0],PARAMETER[\"False_Northing\",0.0],PARAMETER[\"Central_Meridian\",0.0],PARAMETER[\"Standard_Parallel_1\",0.0],PARAMETER[\"Auxiliary_Sphere_Type\",0.0],UNIT[\"Meter\",1.0]]",
            crs.name(),
            geogcs
        ),
        CrsCode::Utm { zone, south, .. } => format!(
            "PROJCS[\"{}\",{},PROJECTION[\"Transverse_Mercator\"],PARAMETER[\"False_Easting\",500000.0],PARAMETER[\"False_Northing\",{:.1}],PARAMETER[\"Central_Meridian\",{:.1}],PARAMETER[\"Scale_Factor\",0.9996],PARAMETER[\"Latitude_Of_Origin\",0.0],UNIT[\"Meter\",1.0]]",
            crs.name(),
            geogcs,
            if south { 10_000_000.0 } else { 0.0 },
            -183.0 + 6.0 * zone as f64
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM_23S: &str = r#"PROJCS["WGS_1984_UTM_Zone_23S",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",-45.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    #[test]
    fn test_parse_projcs() {
        let root = parse(UTM_23S).unwrap();
        assert_eq!(root.keyword, "PROJCS");
        assert_eq!(root.name(), Some("WGS_1984_UTM_Zone_23S"));
        assert_eq!(root.parameter("central meridian"), Some(-45.0));
        assert_eq!(root.parameter("False_Northing"), Some(10_000_000.0));

        let spheroid = root.find("SPHEROID").unwrap();
        assert_eq!(spheroid.numbers(), vec![6378137.0, 298.257223563]);
    }

    #[test]
    fn test_parse_ogc_with_authority_and_axis() {
        let text = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],AUTHORITY["EPSG","4326"]]"#;
        let root = parse(text).unwrap();
        assert_eq!(root.epsg(), Some(4326));
        let axes: Vec<_> = root.children("AXIS").collect();
        assert_eq!(axes.len(), 2);
        assert_eq!(axes[1].values[1], WktValue::Str("EAST".to_string()));
        assert_eq!(identify(&root), Some(CrsCode::Epsg4326));
    }

    #[test]
    fn test_identify_esri_names() {
        let root = parse(UTM_23S).unwrap();
        assert_eq!(identify(&root), CrsCode::from_epsg(32723).ok());

        let sirgas = to_wkt(CrsCode::from_epsg(31982).unwrap());
        let root = parse(&sirgas).unwrap();
        assert_eq!(identify(&root), CrsCode::from_epsg(31982).ok());
    }

    #[test]
    fn test_to_wkt_roundtrips_through_identify() {
        for code in [4326, 4674, 3857, 32723, 32618, 31983] {
            let crs = CrsCode::from_epsg(code).unwrap();
            let root = parse(&to_wkt(crs)).unwrap();
            assert_eq!(identify(&root), Some(crs), "EPSG:{}", code);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("PROJCS[\"x\"").is_err());
        assert!(parse("[1,2]").is_err());
        assert!(parse("GEOGCS[\"a\"] trailing").is_err());
    }
}
