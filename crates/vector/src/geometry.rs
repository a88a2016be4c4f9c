//! 2D geometries and their conversion to and from shapefile shapes.

use bioma_common::BoundingBox;
use shapefile::{Multipoint, Point, Polygon, PolygonRing, Polyline, Shape};

use crate::error::{Result, VectorError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A polygon ring and whether it is an exterior ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub points: Vec<Coord>,
    pub outer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    Polyline(Vec<Vec<Coord>>),
    Polygon(Vec<Ring>),
}

macro_rules! coords {
    ($points:expr) => {
        $points.iter().map(|p| Coord::new(p.x, p.y)).collect::<Vec<_>>()
    };
}

macro_rules! rings {
    ($polygon:expr) => {
        $polygon
            .rings()
            .iter()
            .map(|ring| Ring {
                points: coords!(ring.points()),
                outer: matches!(ring, PolygonRing::Outer(_)),
            })
            .collect::<Vec<_>>()
    };
}

impl Geometry {
    /// Convert a shapefile shape, dropping M and Z. Null shapes become None.
    pub fn from_shape(shape: Shape) -> Result<Option<Self>> {
        let geometry = match shape {
            Shape::NullShape => return Ok(None),
            Shape::Point(p) => Geometry::Point(Coord::new(p.x, p.y)),
            Shape::PointM(p) => Geometry::Point(Coord::new(p.x, p.y)),
            Shape::PointZ(p) => Geometry::Point(Coord::new(p.x, p.y)),
            Shape::Multipoint(m) => Geometry::MultiPoint(coords!(m.points())),
            Shape::MultipointM(m) => Geometry::MultiPoint(coords!(m.points())),
            Shape::MultipointZ(m) => Geometry::MultiPoint(coords!(m.points())),
            Shape::Polyline(l) => Geometry::Polyline(l.parts().iter().map(|p| coords!(p)).collect()),
            Shape::PolylineM(l) => Geometry::Polyline(l.parts().iter().map(|p| coords!(p)).collect()),
            Shape::PolylineZ(l) => Geometry::Polyline(l.parts().iter().map(|p| coords!(p)).collect()),
            Shape::Polygon(p) => Geometry::Polygon(rings!(p)),
            Shape::PolygonM(p) => Geometry::Polygon(rings!(p)),
            Shape::PolygonZ(p) => Geometry::Polygon(rings!(p)),
            Shape::Multipatch(_) => {
                return Err(VectorError::UnsupportedGeometry("multipatch".to_string()))
            }
        };
        Ok(Some(geometry))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "point",
            Geometry::MultiPoint(_) => "multipoint",
            Geometry::Polyline(_) => "polyline",
            Geometry::Polygon(_) => "polygon",
        }
    }

    /// Apply `f` to every vertex.
    pub fn map_coords(&self, f: &impl Fn(Coord) -> Coord) -> Geometry {
        let map = |pts: &[Coord]| pts.iter().map(|&c| f(c)).collect::<Vec<_>>();
        match self {
            Geometry::Point(c) => Geometry::Point(f(*c)),
            Geometry::MultiPoint(pts) => Geometry::MultiPoint(map(pts)),
            Geometry::Polyline(parts) => {
                Geometry::Polyline(parts.iter().map(|p| map(p)).collect())
            }
            Geometry::Polygon(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|r| Ring {
                        points: map(&r.points),
                        outer: r.outer,
                    })
                    .collect(),
            ),
        }
    }

    pub fn coords(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            Geometry::Point(c) => Box::new(std::iter::once(*c)),
            Geometry::MultiPoint(pts) => Box::new(pts.iter().copied()),
            Geometry::Polyline(parts) => Box::new(parts.iter().flatten().copied()),
            Geometry::Polygon(rings) => Box::new(rings.iter().flat_map(|r| r.points.iter().copied())),
        }
    }

    /// Vertex bounds, or None for a geometry without vertices.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut bbox = BoundingBox::empty();
        for c in self.coords() {
            bbox.expand_to_include(c.x, c.y);
        }
        bbox.is_valid().then_some(bbox)
    }
}

fn points(coords: &[Coord]) -> Vec<Point> {
    coords.iter().map(|c| Point::new(c.x, c.y)).collect()
}

/// Concrete shapefile shapes for one layer; a shapefile holds a single type.
pub(crate) enum ShapeBuffer {
    Points(Vec<Point>),
    Multipoints(Vec<Multipoint>),
    Polylines(Vec<Polyline>),
    Polygons(Vec<Polygon>),
}

impl ShapeBuffer {
    pub(crate) fn for_geometry(first: &Geometry) -> Self {
        match first {
            Geometry::Point(_) => ShapeBuffer::Points(Vec::new()),
            Geometry::MultiPoint(_) => ShapeBuffer::Multipoints(Vec::new()),
            Geometry::Polyline(_) => ShapeBuffer::Polylines(Vec::new()),
            Geometry::Polygon(_) => ShapeBuffer::Polygons(Vec::new()),
        }
    }

    pub(crate) fn push(&mut self, geometry: &Geometry) -> Result<()> {
        match (self, geometry) {
            (ShapeBuffer::Points(v), Geometry::Point(c)) => v.push(Point::new(c.x, c.y)),
            (ShapeBuffer::Multipoints(v), Geometry::MultiPoint(pts)) => {
                v.push(Multipoint::new(points(pts)))
            }
            (ShapeBuffer::Polylines(v), Geometry::Polyline(parts)) => {
                v.push(Polyline::with_parts(parts.iter().map(|p| points(p)).collect()))
            }
            (ShapeBuffer::Polygons(v), Geometry::Polygon(rings)) => {
                let rings = rings
                    .iter()
                    .map(|r| {
                        if r.outer {
                            PolygonRing::Outer(points(&r.points))
                        } else {
                            PolygonRing::Inner(points(&r.points))
                        }
                    })
                    .collect();
                v.push(Polygon::with_rings(rings))
            }
            (_, other) => {
                return Err(VectorError::UnsupportedGeometry(format!(
                    "mixed geometry kinds ({} in a layer of another kind)",
                    other.kind()
                )))
            }
        }
        Ok(())
    }
}
