// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Impact assessment - what lies within a buffer around a POI.
//!
//! The buffer is an exact disc in the layer's metric CRS. Candidates come from
//! the layer's R-tree, then each is tested against the disc itself.

mod buildings;
mod roads;
mod rivers;

pub use buildings::BuildingImpact;
pub use roads::RoadImpact;
pub use rivers::RiverImpact;

use std::fmt;
use std::sync::Arc;
use geo::{Coord, EuclideanDistance, LineString, MultiLineString, MultiPolygon, Point, Rect};
use thiserror::Error;
use tracing::error;

use crate::poi::PointOfInterest;
use crate::spatial::{Feature, FeatureShape, GeoLayer, GeoLayers, LayerKind, ProjectionError, Transform};

#[derive(Debug, Error)]
pub enum ImpactError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("invalid buffer radius {0}")]
    InvalidRadius(f64),
}

/// Circular buffer around a projected point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disc {
    pub center: Coord<f64>,
    pub radius: f64,
}

impl Disc {
    pub fn new(center: Coord<f64>, radius: f64) -> Result<Self, ImpactError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ImpactError::InvalidRadius(radius));
        }
        Ok(Self { center, radius })
    }

    pub fn envelope(&self) -> Rect<f64> {
        let r = self.radius;
        Rect::new(
            Coord { x: self.center.x - r, y: self.center.y - r },
            Coord { x: self.center.x + r, y: self.center.y + r },
        )
    }

    /// Areas count when any part of them (including the interior) is within the disc
    pub fn touches_area(&self, area: &MultiPolygon<f64>) -> bool {
        Point::from(self.center).euclidean_distance(area) <= self.radius
    }

    pub fn touches_lines(&self, lines: &MultiLineString<f64>) -> bool {
        lines.0.iter().any(|line| self.touches_line(line))
    }

    fn touches_line(&self, line: &LineString<f64>) -> bool {
        let center = Point::from(self.center);
        line.lines().any(|seg| center.euclidean_distance(&seg) <= self.radius)
    }

    pub fn touches(&self, shape: &FeatureShape) -> bool {
        match shape {
            FeatureShape::Areal(area) => self.touches_area(area),
            FeatureShape::Lineal(lines) => self.touches_lines(lines),
        }
    }

    /// Length of `lines` inside the disc
    pub fn clipped_length(&self, lines: &MultiLineString<f64>) -> f64 {
        lines
            .0
            .iter()
            .flat_map(|line| line.lines())
            .map(|seg| self.clipped_segment(seg.start, seg.end))
            .sum()
    }

    /// Segment/circle intersection: solve |p0 + t(p1 - p0) - c|² = r² for t
    fn clipped_segment(&self, p0: Coord<f64>, p1: Coord<f64>) -> f64 {
        let d = p1 - p0;
        let f = p0 - self.center;
        let a = d.x * d.x + d.y * d.y;
        if a == 0.0 {
            return 0.0;
        }
        let b = 2.0 * (f.x * d.x + f.y * d.y);
        let c = f.x * f.x + f.y * f.y - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant <= 0.0 {
            return 0.0;
        }

        let root = discriminant.sqrt();
        let t0 = ((-b - root) / (2.0 * a)).max(0.0);
        let t1 = ((-b + root) / (2.0 * a)).min(1.0);
        if t1 <= t0 {
            return 0.0;
        }
        (t1 - t0) * a.sqrt()
    }
}

/// Outcome of one POI against one layer
#[derive(Debug, Clone, PartialEq)]
pub enum ImpactSummary {
    /// Layer never loaded
    Unavailable(LayerKind),
    /// Computation for this POI/layer pair failed
    Failed(LayerKind),
    /// Nothing within the radius
    Clear { kind: LayerKind, radius_m: f64 },
    Buildings(BuildingImpact),
    Roads(RoadImpact),
    Rivers(RiverImpact),
}

impl ImpactSummary {
    pub fn kind(&self) -> LayerKind {
        match self {
            ImpactSummary::Unavailable(kind) | ImpactSummary::Failed(kind) => *kind,
            ImpactSummary::Clear { kind, .. } => *kind,
            ImpactSummary::Buildings(_) => LayerKind::Buildings,
            ImpactSummary::Roads(_) => LayerKind::Roads,
            ImpactSummary::Rivers(_) => LayerKind::Rivers,
        }
    }
}

impl fmt::Display for ImpactSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactSummary::Unavailable(kind) => match kind {
                LayerKind::Buildings => f.write_str("Building data unavailable."),
                LayerKind::Roads => f.write_str("Road data unavailable."),
                LayerKind::Rivers => f.write_str("River data unavailable."),
            },
            ImpactSummary::Failed(kind) => match kind {
                LayerKind::Buildings => f.write_str("Failed to assess building impact."),
                LayerKind::Roads => f.write_str("Failed to assess road impact."),
                LayerKind::Rivers => f.write_str("Failed to assess river impact."),
            },
            ImpactSummary::Clear { kind, radius_m } => match kind {
                LayerKind::Buildings => write!(f, "No buildings within {}m.", radius_m),
                LayerKind::Roads => write!(f, "No roads within {}m.", radius_m),
                LayerKind::Rivers => write!(f, "No rivers/canals within {}m.", radius_m),
            },
            ImpactSummary::Buildings(impact) => impact.fmt(f),
            ImpactSummary::Roads(impact) => impact.fmt(f),
            ImpactSummary::Rivers(impact) => impact.fmt(f),
        }
    }
}

/// All three layers for one POI
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactReport {
    pub radius_m: f64,
    pub buildings: ImpactSummary,
    pub roads: ImpactSummary,
    pub rivers: ImpactSummary,
}

/// Runs buffer queries against the loaded layers
pub struct ImpactAssessor {
    layers: Arc<GeoLayers>,
}

impl ImpactAssessor {
    pub fn new(layers: Arc<GeoLayers>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &GeoLayers {
        &self.layers
    }

    /// Assess one layer. Never fails: errors become [`ImpactSummary::Failed`].
    pub fn assess(&self, poi: &PointOfInterest, kind: LayerKind, radius_m: f64) -> ImpactSummary {
        let Some(layer) = self.layers.get(kind) else {
            return ImpactSummary::Unavailable(kind);
        };

        match self.try_assess(poi, layer, radius_m) {
            Ok(summary) => summary,
            Err(e) => {
                error!("POI {} - failed to assess {} impact: {}", poi.name, kind, e);
                ImpactSummary::Failed(kind)
            }
        }
    }

    pub fn assess_all(&self, poi: &PointOfInterest, radius_m: f64) -> ImpactReport {
        ImpactReport {
            radius_m,
            buildings: self.assess(poi, LayerKind::Buildings, radius_m),
            roads: self.assess(poi, LayerKind::Roads, radius_m),
            rivers: self.assess(poi, LayerKind::Rivers, radius_m),
        }
    }

    fn try_assess(&self, poi: &PointOfInterest, layer: &GeoLayer, radius_m: f64) -> Result<ImpactSummary, ImpactError> {
        let transform = Transform::from_wgs84(layer.epsg())?;
        let center = transform.apply(Coord { x: poi.longitude, y: poi.latitude })?;
        let disc = Disc::new(center, radius_m)?;

        let hits: Vec<&Feature> = layer
            .candidates(disc.envelope())
            .into_iter()
            .filter(|feature| disc.touches(&feature.shape))
            .collect();

        if hits.is_empty() {
            return Ok(ImpactSummary::Clear { kind: layer.kind(), radius_m });
        }

        Ok(match layer.kind() {
            LayerKind::Buildings => ImpactSummary::Buildings(BuildingImpact::summarize(&hits, radius_m)),
            LayerKind::Roads => ImpactSummary::Roads(RoadImpact::summarize(&hits, &disc)),
            LayerKind::Rivers => ImpactSummary::Rivers(RiverImpact::summarize(&hits, radius_m)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::FeatureTags;
    use geo::{line_string, polygon};

    fn disc(radius: f64) -> Disc {
        Disc::new(Coord { x: 0.0, y: 0.0 }, radius).unwrap()
    }

    #[test]
    fn test_clip_through_center() {
        let line = MultiLineString::new(vec![line_string![(x: -500.0, y: 0.0), (x: 500.0, y: 0.0)]]);
        assert!((disc(200.0).clipped_length(&line) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_chord_and_inside() {
        // Chord at y = 120 of a 200 m circle is 2 * 160 m long.
        let chord = MultiLineString::new(vec![line_string![(x: -300.0, y: 120.0), (x: 300.0, y: 120.0)]]);
        assert!((disc(200.0).clipped_length(&chord) - 320.0).abs() < 1e-9);

        // Fully inside, two segments.
        let inside = MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 30.0, y: 0.0), (x: 30.0, y: 40.0)]]);
        assert!((disc(200.0).clipped_length(&inside) - 70.0).abs() < 1e-9);

        // Starts inside, leaves the disc.
        let leaving = MultiLineString::new(vec![line_string![(x: 100.0, y: 0.0), (x: 900.0, y: 0.0)]]);
        assert!((disc(200.0).clipped_length(&leaving) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_touch_tests() {
        let d = disc(200.0);
        let miss = MultiLineString::new(vec![line_string![(x: -300.0, y: 250.0), (x: 300.0, y: 250.0)]]);
        assert!(!d.touches_lines(&miss));
        assert_eq!(d.clipped_length(&miss), 0.0);

        // Nearest point is the segment's end, about 212 m away
        let diagonal = MultiLineString::new(vec![line_string![(x: 150.0, y: 150.0), (x: 400.0, y: 400.0)]]);
        assert!(!d.touches_lines(&diagonal));
        assert!(disc(250.0).touches_lines(&diagonal));

        // Second segment of a polyline passes 100 m from the center
        let bend = MultiLineString::new(vec![line_string![
            (x: -900.0, y: 900.0), (x: -900.0, y: 100.0), (x: 900.0, y: 100.0)
        ]]);
        assert!(d.touches_lines(&bend));

        // A big polygon that contains the disc
        let around = MultiPolygon::new(vec![polygon![
            (x: -1000.0, y: -1000.0), (x: 1000.0, y: -1000.0), (x: 1000.0, y: 1000.0), (x: -1000.0, y: 1000.0)
        ]]);
        assert!(d.touches_area(&around));

        // Corner of the envelope, outside the disc
        let corner = MultiPolygon::new(vec![polygon![
            (x: 150.0, y: 150.0), (x: 199.0, y: 150.0), (x: 199.0, y: 199.0), (x: 150.0, y: 199.0)
        ]]);
        assert!(!d.touches_area(&corner));
        assert!(disc(250.0).touches_area(&corner));
    }

    #[test]
    fn test_rejects_bad_radius() {
        assert!(Disc::new(Coord { x: 0.0, y: 0.0 }, 0.0).is_err());
        assert!(Disc::new(Coord { x: 0.0, y: 0.0 }, f64::NAN).is_err());
    }

    #[test]
    fn test_absent_layer_is_unavailable() {
        let assessor = ImpactAssessor::new(Arc::new(GeoLayers::default()));
        let poi = crate::poi::default_pois().remove(0);
        let report = assessor.assess_all(&poi, 500.0);
        assert_eq!(report.buildings.to_string(), "Building data unavailable.");
        assert_eq!(report.roads.to_string(), "Road data unavailable.");
        assert_eq!(report.rivers.to_string(), "River data unavailable.");
    }

    #[test]
    fn test_out_of_domain_poi_fails_only_that_pair() {
        let feature = Feature {
            shape: FeatureShape::Lineal(MultiLineString::new(vec![
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            ])),
            tags: FeatureTags::default(),
        };
        let layers = GeoLayers {
            roads: Some(GeoLayer::new(LayerKind::Roads, 31982, vec![feature])),
            ..GeoLayers::default()
        };
        let assessor = ImpactAssessor::new(Arc::new(layers));

        let mut poi = crate::poi::default_pois().remove(0);
        poi.longitude = 120.0;
        let report = assessor.assess_all(&poi, 200.0);
        assert_eq!(report.roads, ImpactSummary::Failed(LayerKind::Roads));
        assert_eq!(report.rivers, ImpactSummary::Unavailable(LayerKind::Rivers));
    }

    #[test]
    fn test_poi_far_from_layer_is_clear() {
        let feature = Feature {
            shape: FeatureShape::Lineal(MultiLineString::new(vec![
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            ])),
            tags: FeatureTags::default(),
        };
        let layers = GeoLayers {
            rivers: Some(GeoLayer::new(LayerKind::Rivers, 31982, vec![feature])),
            ..GeoLayers::default()
        };
        let assessor = ImpactAssessor::new(Arc::new(layers));
        let poi = crate::poi::default_pois().remove(0);

        let summary = assessor.assess(&poi, LayerKind::Rivers, 300.0);
        assert_eq!(summary, ImpactSummary::Clear { kind: LayerKind::Rivers, radius_m: 300.0 });
        assert_eq!(summary.to_string(), "No rivers/canals within 300m.");
    }
}
