// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Coordinate reference systems the hub can work with.
//!
//! Geographic coordinates on the WGS84/SIRGAS 2000 ellipsoid (the two agree to
//! well under a meter), spherical web mercator, and transverse Mercator for
//! UTM zones. Coordinates are `x = easting/longitude`, `y = northing/latitude`.

use geo::Coord;
use thiserror::Error;

/// WGS84 semi-major axis
const A: f64 = 6_378_137.0;
/// WGS84 flattening
const F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

pub const EPSG_WGS84: u32 = 4326;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("unsupported CRS EPSG:{0}")]
    Unsupported(u32),

    #[error("coordinate ({x}, {y}) outside the domain of EPSG:{epsg}")]
    OutOfDomain { epsg: u32, x: f64, y: f64 },

    #[error("EPSG:{0} is not a metric CRS")]
    NotMetric(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Geographic,
    WebMercator,
    TransverseMercator { central_meridian: f64, false_northing: f64 },
}

/// A supported CRS, identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crs {
    epsg: u32,
    kind: Kind,
}

impl Crs {
    pub fn from_epsg(epsg: u32) -> Result<Self, ProjectionError> {
        let kind = match epsg {
            // WGS 84, SIRGAS 2000
            4326 | 4674 => Kind::Geographic,
            3857 => Kind::WebMercator,
            // WGS 84 / UTM zone N
            32601..=32660 => utm(epsg - 32600, false),
            // WGS 84 / UTM zone S
            32701..=32760 => utm(epsg - 32700, true),
            // SIRGAS 2000 / UTM zones 18S..25S
            31978..=31985 => utm(epsg - 31978 + 18, true),
            _ => return Err(ProjectionError::Unsupported(epsg)),
        };
        Ok(Self { epsg, kind })
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn is_metric(&self) -> bool {
        !matches!(self.kind, Kind::Geographic)
    }

    /// A CRS with metre units, suitable for buffering and measuring
    pub fn metric(epsg: u32) -> Result<Self, ProjectionError> {
        let crs = Self::from_epsg(epsg)?;
        if !crs.is_metric() {
            return Err(ProjectionError::NotMetric(epsg));
        }
        Ok(crs)
    }

    /// Degrees to this CRS
    pub fn from_lonlat(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let out_of_domain = || ProjectionError::OutOfDomain { epsg: self.epsg, x: c.x, y: c.y };
        if !(c.x.is_finite() && c.y.is_finite()) || c.y.abs() > 90.0 {
            return Err(out_of_domain());
        }

        match self.kind {
            Kind::Geographic => Ok(c),
            Kind::WebMercator => {
                if c.y.abs() > WEB_MERCATOR_MAX_LAT {
                    return Err(out_of_domain());
                }
                let lat = c.y.to_radians();
                Ok(Coord {
                    x: A * c.x.to_radians(),
                    y: A * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
                })
            }
            Kind::TransverseMercator { central_meridian, false_northing } => {
                if (c.x - central_meridian).abs() > 45.0 || c.y.abs() > 89.9 {
                    return Err(out_of_domain());
                }
                Ok(tm_forward(c, central_meridian, false_northing))
            }
        }
    }

    /// This CRS to degrees
    pub fn to_lonlat(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if !(c.x.is_finite() && c.y.is_finite()) {
            return Err(ProjectionError::OutOfDomain { epsg: self.epsg, x: c.x, y: c.y });
        }

        match self.kind {
            Kind::Geographic => Ok(c),
            Kind::WebMercator => Ok(Coord {
                x: (c.x / A).to_degrees(),
                y: (2.0 * (c.y / A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees(),
            }),
            Kind::TransverseMercator { central_meridian, false_northing } => {
                Ok(tm_inverse(c, central_meridian, false_northing))
            }
        }
    }
}

fn utm(zone: u32, south: bool) -> Kind {
    Kind::TransverseMercator {
        central_meridian: -183.0 + 6.0 * zone as f64,
        false_northing: if south { UTM_FALSE_NORTHING_SOUTH } else { 0.0 },
    }
}

/// Ellipsoid constants shared by the forward and inverse series
struct Ellipsoid {
    e2: f64,
    ep2: f64,
}

impl Ellipsoid {
    fn wgs84() -> Self {
        let e2 = F * (2.0 - F);
        Self { e2, ep2: e2 / (1.0 - e2) }
    }

    /// Meridian arc length from the equator to `phi`
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

fn tm_forward(c: Coord<f64>, central_meridian: f64, false_northing: f64) -> Coord<f64> {
    let el = Ellipsoid::wgs84();
    let phi = c.y.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();

    let n = A / (1.0 - el.e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let cc = el.ep2 * cos_phi * cos_phi;
    let a = (c.x - central_meridian).to_radians() * cos_phi;
    let m = el.meridian_arc(phi);

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let x = UTM_K0
        * n
        * (a + (1.0 - t + cc) * a3 / 6.0 + (5.0 - 18.0 * t + t * t + 72.0 * cc - 58.0 * el.ep2) * a5 / 120.0);
    let y = UTM_K0
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * cc + 4.0 * cc * cc) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * cc - 330.0 * el.ep2) * a6 / 720.0));

    Coord { x: UTM_FALSE_EASTING + x, y: false_northing + y }
}

fn tm_inverse(c: Coord<f64>, central_meridian: f64, false_northing: f64) -> Coord<f64> {
    let el = Ellipsoid::wgs84();
    let e2 = el.e2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    let m = (c.y - false_northing) / UTM_K0;
    let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let sqrt_1_e2 = (1.0 - e2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let (sin1, cos1) = phi1.sin_cos();
    let tan1 = phi1.tan();
    let c1 = el.ep2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let w = 1.0 - e2 * sin1 * sin1;
    let n1 = A / w.sqrt();
    let r1 = A * (1.0 - e2) / w.powf(1.5);
    let d = (c.x - UTM_FALSE_EASTING) / (n1 * UTM_K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let phi = phi1
        - (n1 * tan1 / r1)
            * (d2 / 2.0 - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * el.ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * el.ep2 - 3.0 * c1 * c1) * d6 / 720.0);
    let lambda = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * el.ep2 + 24.0 * t1 * t1) * d5 / 120.0)
        / cos1;

    Coord { x: central_meridian + lambda.to_degrees(), y: phi.to_degrees() }
}

/// Source-to-target coordinate transform through geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    source: Crs,
    target: Crs,
}

impl Transform {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, ProjectionError> {
        Ok(Self {
            source: Crs::from_epsg(source_epsg)?,
            target: Crs::from_epsg(target_epsg)?,
        })
    }

    /// Geographic WGS84 into `target_epsg`
    pub fn from_wgs84(target_epsg: u32) -> Result<Self, ProjectionError> {
        Self::new(EPSG_WGS84, target_epsg)
    }

    pub fn is_identity(&self) -> bool {
        self.source.epsg() == self.target.epsg()
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    pub fn apply(&self, c: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        if self.is_identity() {
            return Ok(c);
        }
        let lonlat = self.source.to_lonlat(c)?;
        self.target.from_lonlat(lonlat)
    }
}
