// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Spatial module - geo layer cache for impact analysis.
//!
//! Layers are read once at startup, reprojected into the working metric CRS
//! and indexed by bounding box. A layer that fails to load stays absent for
//! the rest of the run.

pub mod projection;
pub mod wkb;
pub mod gpkg;

#[cfg(test)]
#[path = "../../tests/common/gpkg.rs"]
pub(crate) mod fixture;

pub use projection::{Crs, ProjectionError, Transform};

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use geo::{BoundingRect, Coord, Geometry, LineString, MapCoords, MultiLineString, MultiPolygon, Polygon, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GeoConfig;

/// The three layers impact analysis works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Buildings,
    Roads,
    Rivers,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Buildings, LayerKind::Roads, LayerKind::Rivers];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Buildings => "buildings",
            LayerKind::Roads => "roads",
            LayerKind::Rivers => "rivers",
        }
    }

    /// Attribute columns read for this layer when present
    pub fn tag_columns(&self) -> &'static [&'static str] {
        match self {
            LayerKind::Buildings => &["amenity", "building", "shop", "office"],
            LayerKind::Roads => &["highway", "name", "bridge", "tunnel"],
            LayerKind::Rivers => &["name", "intermittent", "tunnel"],
        }
    }

    fn is_areal(&self) -> bool {
        matches!(self, LayerKind::Buildings)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum GeoLoadError {
    #[error("geo source {0:?} not found")]
    SourceMissing(PathBuf),

    #[error("geo source error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("layer '{0}' not found")]
    LayerNotFound(String),

    #[error("layer '{0}' is empty")]
    Empty(String),

    #[error("layer '{0}' has no valid geometries")]
    NoValidGeometries(String),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Attribute values of one feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTags {
    values: HashMap<String, String>,
}

impl FeatureTags {
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// True when the tag equals `yes`
    pub fn is_yes(&self, key: &str) -> bool {
        self.get(key) == Some("yes")
    }
}

impl<const N: usize> From<[(&str, &str); N]> for FeatureTags {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut tags = FeatureTags::default();
        for (key, value) in pairs {
            tags.insert(key, value);
        }
        tags
    }
}

/// Normalized geometry of a feature, in the layer's CRS
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureShape {
    Areal(MultiPolygon<f64>),
    Lineal(MultiLineString<f64>),
}

impl FeatureShape {
    /// Keep only the parts of `geometry` that fit `kind`; `None` when nothing
    /// usable remains
    pub fn normalize(geometry: Geometry<f64>, kind: LayerKind) -> Option<Self> {
        let mut polygons = Vec::new();
        let mut lines = Vec::new();
        collect_parts(geometry, &mut polygons, &mut lines);

        if kind.is_areal() {
            let polygons: Vec<Polygon<f64>> = polygons.into_iter().filter(valid_polygon).collect();
            (!polygons.is_empty()).then(|| FeatureShape::Areal(MultiPolygon::new(polygons)))
        } else {
            let lines: Vec<LineString<f64>> = lines.into_iter().filter(valid_line).collect();
            (!lines.is_empty()).then(|| FeatureShape::Lineal(MultiLineString::new(lines)))
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            FeatureShape::Areal(mp) => mp.bounding_rect(),
            FeatureShape::Lineal(ml) => ml.bounding_rect(),
        }
    }

    fn reproject(&self, transform: &Transform) -> Result<Self, ProjectionError> {
        let apply = |c: Coord<f64>| transform.apply(c);
        Ok(match self {
            FeatureShape::Areal(mp) => FeatureShape::Areal(mp.try_map_coords(apply)?),
            FeatureShape::Lineal(ml) => FeatureShape::Lineal(ml.try_map_coords(apply)?),
        })
    }
}

fn collect_parts(geometry: Geometry<f64>, polygons: &mut Vec<Polygon<f64>>, lines: &mut Vec<LineString<f64>>) {
    match geometry {
        Geometry::Polygon(p) => polygons.push(p),
        Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
        Geometry::LineString(l) => lines.push(l),
        Geometry::MultiLineString(ml) => lines.extend(ml.0),
        Geometry::Line(l) => lines.push(LineString::from(vec![l.start, l.end])),
        Geometry::GeometryCollection(gc) => {
            for member in gc.0 {
                collect_parts(member, polygons, lines);
            }
        }
        _ => {}
    }
}

fn finite(c: &Coord<f64>) -> bool {
    c.x.is_finite() && c.y.is_finite()
}

fn valid_line(line: &LineString<f64>) -> bool {
    line.0.len() >= 2 && line.0.iter().all(finite)
}

fn valid_polygon(polygon: &Polygon<f64>) -> bool {
    let ring_ok = |ring: &LineString<f64>| ring.0.len() >= 4 && ring.0.iter().all(finite);
    ring_ok(polygon.exterior()) && polygon.interiors().iter().all(ring_ok)
}

/// One layer feature
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub shape: FeatureShape,
    pub tags: FeatureTags,
}

type IndexEntry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// A loaded, reprojected and indexed layer
pub struct GeoLayer {
    kind: LayerKind,
    epsg: u32,
    features: Vec<Feature>,
    index: RTree<IndexEntry>,
}

impl fmt::Debug for GeoLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoLayer")
            .field("kind", &self.kind)
            .field("epsg", &self.epsg)
            .field("features", &self.features.len())
            .finish()
    }
}

impl GeoLayer {
    /// Index features already in `epsg`
    pub fn new(kind: LayerKind, epsg: u32, features: Vec<Feature>) -> Self {
        let entries: Vec<IndexEntry> = features
            .iter()
            .enumerate()
            .filter_map(|(i, feature)| {
                let rect = feature.shape.bounding_rect()?;
                let (min, max) = (rect.min(), rect.max());
                Some(GeomWithData::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), i))
            })
            .collect();

        Self {
            kind,
            epsg,
            features,
            index: RTree::bulk_load(entries),
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features whose bounding box touches `envelope`, in layer order
    pub fn candidates(&self, envelope: Rect<f64>) -> Vec<&Feature> {
        let (min, max) = (envelope.min(), envelope.max());
        let query = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        let mut hits: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|i| &self.features[i]).collect()
    }
}

/// Load one layer, reprojected into `target_epsg`, which must be metric
pub fn load_layer(path: &Path, layer: &str, kind: LayerKind, target_epsg: u32) -> Result<GeoLayer, GeoLoadError> {
    Crs::metric(target_epsg)?;
    let source = gpkg::read_layer(path, layer, kind)?;
    if source.features.is_empty() && source.skipped == 0 {
        return Err(GeoLoadError::Empty(layer.to_string()));
    }

    let transform = Transform::new(source.epsg, target_epsg)?;
    if !transform.is_identity() {
        info!("Reprojecting {} from EPSG:{} to EPSG:{}", kind, source.epsg, target_epsg);
    }

    let mut features = Vec::with_capacity(source.features.len());
    let mut dropped = source.skipped;
    for raw in source.features {
        let Some(shape) = FeatureShape::normalize(raw.geometry, kind) else {
            dropped += 1;
            continue;
        };
        match shape.reproject(&transform) {
            Ok(shape) => features.push(Feature { shape, tags: raw.tags }),
            Err(_) => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("Dropped {} invalid {} feature(s) from layer '{}'", dropped, kind, layer);
    }
    if features.is_empty() {
        return Err(GeoLoadError::NoValidGeometries(layer.to_string()));
    }

    info!("{} {} features loaded (EPSG:{})", features.len(), kind, target_epsg);
    Ok(GeoLayer::new(kind, target_epsg, features))
}

/// Building, road and river layers; each may be absent for the whole run
#[derive(Debug, Default)]
pub struct GeoLayers {
    pub buildings: Option<GeoLayer>,
    pub roads: Option<GeoLayer>,
    pub rivers: Option<GeoLayer>,
}

impl GeoLayers {
    /// Load all three layers. Failures are logged once and leave the layer absent.
    pub fn load(config: &GeoConfig) -> Self {
        let load = |kind: LayerKind, name: &str| match load_layer(&config.source_path, name, kind, config.target_epsg) {
            Ok(layer) => Some(layer),
            Err(e) => {
                warn!("Impact analysis for {} disabled: {}", kind, e);
                None
            }
        };

        Self {
            buildings: load(LayerKind::Buildings, &config.buildings_layer),
            roads: load(LayerKind::Roads, &config.roads_layer),
            rivers: load(LayerKind::Rivers, &config.rivers_layer),
        }
    }

    pub fn get(&self, kind: LayerKind) -> Option<&GeoLayer> {
        match kind {
            LayerKind::Buildings => self.buildings.as_ref(),
            LayerKind::Roads => self.roads.as_ref(),
            LayerKind::Rivers => self.rivers.as_ref(),
        }
    }

    pub fn loaded_count(&self) -> usize {
        LayerKind::ALL.iter().filter(|k| self.get(**k).is_some()).count()
    }
}
