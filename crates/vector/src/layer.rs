//! Shapefile layers with their CRS.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use bioma_common::{BoundingBox, CrsCode};
use projection::{wkt, Projection, Transformer};
use shapefile::dbase::{Record, TableInfo};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, VectorError};
use crate::geometry::{Coord, Geometry, ShapeBuffer};

/// One shape and its attribute row. Null shapes have no geometry.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub record: Record,
}

/// The features of a shapefile, in the CRS given by `projection`.
pub struct Layer {
    pub path: PathBuf,
    /// EPSG code, when the `.prj` names a supported one.
    pub crs: Option<CrsCode>,
    pub projection: Projection,
    pub features: Vec<Feature>,
    table_info: TableInfo,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("path", &self.path)
            .field("crs", &self.crs)
            .field("projection", &self.projection)
            .field("features", &self.features.len())
            .finish()
    }
}

impl Layer {
    /// Read shapes, attributes and the `.prj` next to the `.shp`.
    ///
    /// Without a `.prj` the layer is assumed to be EPSG:4326.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = shapefile::Reader::from_path(path)?;
        let mut features = Vec::new();
        for result in reader.iter_shapes_and_records() {
            let (shape, record) = result?;
            features.push(Feature {
                geometry: Geometry::from_shape(shape)?,
                record,
            });
        }
        let table_info = reader.into_table_info();

        let (crs, projection) = match find_prj(path) {
            Some(prj) => {
                let text = fs::read_to_string(&prj)?;
                let root = wkt::parse(&text)?;
                let projection = Projection::from_wkt_node(&root)?;
                let crs = wkt::identify(&root);
                if crs.is_none() {
                    debug!(prj = %prj.display(), "CRS has no supported EPSG code");
                }
                (crs, projection)
            }
            None => {
                warn!("No .prj found, assuming EPSG:4326");
                (Some(CrsCode::Epsg4326), Projection::Geographic)
            }
        };

        info!(features = features.len(), crs = ?crs, "Read shapefile");
        Ok(Self {
            path: path.to_path_buf(),
            crs,
            projection,
            features,
            table_info,
        })
    }

    /// Reproject every vertex into `crs`.
    pub fn to_crs(mut self, crs: CrsCode) -> Self {
        let dst = Projection::from_crs(crs);
        let transformer = Transformer::new(self.projection.clone(), dst.clone());
        if !transformer.is_identity() {
            let f = |c: Coord| {
                let (x, y) = transformer.transform(c.x, c.y);
                Coord::new(x, y)
            };
            for feature in &mut self.features {
                if let Some(g) = &feature.geometry {
                    feature.geometry = Some(g.map_coords(&f));
                }
            }
        }
        debug!(from = ?self.crs, to = %crs, "Reprojected layer");
        self.crs = Some(crs);
        self.projection = dst;
        self
    }

    /// Bounds of all vertices, or None when the layer has none.
    pub fn total_bounds(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// Write `.shp/.shx/.dbf` with the original attribute table, plus a
    /// `.prj` when the CRS is known. Null shapes are skipped.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn write(self, path: &Path) -> Result<()> {
        let Some(first) = self.features.iter().find_map(|f| f.geometry.as_ref()) else {
            return Err(VectorError::Empty(self.path.clone()));
        };
        let mut shapes = ShapeBuffer::for_geometry(first);
        let mut records = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            match &feature.geometry {
                Some(g) => {
                    shapes.push(g)?;
                    records.push(&feature.record);
                }
                None => warn!("Skipping null shape"),
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = shapefile::Writer::from_path_with_info(path, self.table_info)?;

        macro_rules! write_all {
            ($shapes:expr) => {
                for (shape, record) in $shapes.iter().zip(&records) {
                    writer.write_shape_and_record(shape, *record)?;
                }
            };
        }
        match &shapes {
            ShapeBuffer::Points(v) => write_all!(v),
            ShapeBuffer::Multipoints(v) => write_all!(v),
            ShapeBuffer::Polylines(v) => write_all!(v),
            ShapeBuffer::Polygons(v) => write_all!(v),
        }
        drop(writer);

        match self.crs {
            Some(crs) => fs::write(path.with_extension("prj"), wkt::to_wkt(crs))?,
            None => warn!("CRS unknown, no .prj written"),
        }
        info!(features = records.len(), "Wrote shapefile");
        Ok(())
    }
}

/// The sibling `.prj` (or `.PRJ`) of a `.shp`.
fn find_prj(shp: &Path) -> Option<PathBuf> {
    ["prj", "PRJ"]
        .iter()
        .map(|ext| shp.with_extension(ext))
        .find(|p| p.is_file())
}
