// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! GeoPackage geometry blobs and the WKB inside them

use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use thiserror::Error;

const MAX_DEPTH: usize = 16;

#[derive(Debug, Error, PartialEq)]
pub enum WkbError {
    #[error("geometry blob ends early")]
    UnexpectedEnd,

    #[error("invalid byte order marker {0}")]
    BadByteOrder(u8),

    #[error("unsupported geometry type {0}")]
    UnsupportedType(u32),

    #[error("invalid GeoPackage envelope indicator {0}")]
    BadEnvelope(u8),

    #[error("collection member of type {found} inside a {expected} collection")]
    MemberMismatch { expected: &'static str, found: &'static str },

    #[error("geometry nesting too deep")]
    TooDeep,
}

/// Decode a GeoPackage geometry blob. Returns `None` for the empty geometry.
///
/// Blobs without the `GP` magic are read as plain WKB.
pub fn decode_gpkg_geometry(blob: &[u8]) -> Result<Option<Geometry<f64>>, WkbError> {
    if blob.len() < 2 || &blob[..2] != b"GP" {
        return read_wkb(blob).map(Some);
    }
    if blob.len() < 8 {
        return Err(WkbError::UnexpectedEnd);
    }

    let flags = blob[3];
    let envelope_len = match (flags >> 1) & 0x07 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => return Err(WkbError::BadEnvelope(other)),
    };
    if flags & 0x10 != 0 {
        return Ok(None);
    }

    let start = 8 + envelope_len;
    if blob.len() <= start {
        return Err(WkbError::UnexpectedEnd);
    }
    read_wkb(&blob[start..]).map(Some)
}

/// Decode ISO or extended (EWKB) well-known binary
pub fn read_wkb(bytes: &[u8]) -> Result<Geometry<f64>, WkbError> {
    let mut reader = Reader { buf: bytes, pos: 0, little_endian: true };
    reader.geometry(0)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    little_endian: bool,
}

#[derive(Clone, Copy)]
struct Header {
    base: u32,
    dims: usize,
}

impl<'a> Reader<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], WkbError> {
        let end = self.pos.checked_add(N).ok_or(WkbError::UnexpectedEnd)?;
        let slice = self.buf.get(self.pos..end).ok_or(WkbError::UnexpectedEnd)?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, WkbError> {
        let bytes = self.take::<4>()?;
        Ok(if self.little_endian { u32::from_le_bytes(bytes) } else { u32::from_be_bytes(bytes) })
    }

    fn f64(&mut self) -> Result<f64, WkbError> {
        let bytes = self.take::<8>()?;
        Ok(if self.little_endian { f64::from_le_bytes(bytes) } else { f64::from_be_bytes(bytes) })
    }

    /// Element count, checked against the bytes left so a corrupt count
    /// cannot trigger a huge allocation
    fn count(&mut self, min_item_len: usize) -> Result<usize, WkbError> {
        let n = self.u32()? as usize;
        let remaining = self.buf.len().saturating_sub(self.pos);
        if n.saturating_mul(min_item_len) > remaining {
            return Err(WkbError::UnexpectedEnd);
        }
        Ok(n)
    }

    fn header(&mut self) -> Result<Header, WkbError> {
        self.little_endian = match self.take::<1>()?[0] {
            0 => false,
            1 => true,
            other => return Err(WkbError::BadByteOrder(other)),
        };

        let raw = self.u32()?;
        let mut has_z = raw & 0x8000_0000 != 0;
        let mut has_m = raw & 0x4000_0000 != 0;
        let has_srid = raw & 0x2000_0000 != 0;
        let code = raw & 0x0FFF_FFFF;

        match code / 1000 {
            0 => {}
            1 => has_z = true,
            2 => has_m = true,
            3 => {
                has_z = true;
                has_m = true;
            }
            _ => return Err(WkbError::UnsupportedType(raw)),
        }
        if has_srid {
            self.u32()?;
        }

        Ok(Header {
            base: code % 1000,
            dims: 2 + has_z as usize + has_m as usize,
        })
    }

    fn coord(&mut self, dims: usize) -> Result<Coord<f64>, WkbError> {
        let x = self.f64()?;
        let y = self.f64()?;
        for _ in 2..dims {
            self.f64()?;
        }
        Ok(Coord { x, y })
    }

    fn line(&mut self, dims: usize) -> Result<LineString<f64>, WkbError> {
        let n = self.count(dims * 8)?;
        let mut coords = Vec::with_capacity(n);
        for _ in 0..n {
            coords.push(self.coord(dims)?);
        }
        Ok(LineString::new(coords))
    }

    fn polygon(&mut self, dims: usize) -> Result<Polygon<f64>, WkbError> {
        let rings = self.count(4)?;
        if rings == 0 {
            return Ok(Polygon::new(LineString::new(vec![]), vec![]));
        }
        let exterior = self.line(dims)?;
        let mut interiors = Vec::with_capacity(rings - 1);
        for _ in 1..rings {
            interiors.push(self.line(dims)?);
        }
        Ok(Polygon::new(exterior, interiors))
    }

    fn geometry(&mut self, depth: usize) -> Result<Geometry<f64>, WkbError> {
        if depth > MAX_DEPTH {
            return Err(WkbError::TooDeep);
        }
        let header = self.header()?;
        let dims = header.dims;

        let geometry = match header.base {
            1 => Geometry::Point(Point::from(self.coord(dims)?)),
            2 => Geometry::LineString(self.line(dims)?),
            3 => Geometry::Polygon(self.polygon(dims)?),
            4 => {
                let n = self.count(5)?;
                let mut points = Vec::with_capacity(n);
                for _ in 0..n {
                    match self.geometry(depth + 1)? {
                        Geometry::Point(p) => points.push(p),
                        other => return Err(mismatch("MultiPoint", &other)),
                    }
                }
                Geometry::MultiPoint(MultiPoint::new(points))
            }
            5 => {
                let n = self.count(5)?;
                let mut lines = Vec::with_capacity(n);
                for _ in 0..n {
                    match self.geometry(depth + 1)? {
                        Geometry::LineString(l) => lines.push(l),
                        other => return Err(mismatch("MultiLineString", &other)),
                    }
                }
                Geometry::MultiLineString(MultiLineString::new(lines))
            }
            6 => {
                let n = self.count(5)?;
                let mut polygons = Vec::with_capacity(n);
                for _ in 0..n {
                    match self.geometry(depth + 1)? {
                        Geometry::Polygon(p) => polygons.push(p),
                        other => return Err(mismatch("MultiPolygon", &other)),
                    }
                }
                Geometry::MultiPolygon(MultiPolygon::new(polygons))
            }
            7 => {
                let n = self.count(5)?;
                let mut members = Vec::with_capacity(n);
                for _ in 0..n {
                    members.push(self.geometry(depth + 1)?);
                }
                Geometry::GeometryCollection(GeometryCollection::new_from(members))
            }
            _ => return Err(WkbError::UnsupportedType(header.base)),
        };

        Ok(geometry)
    }
}

fn mismatch(expected: &'static str, found: &Geometry<f64>) -> WkbError {
    let found = match found {
        Geometry::Point(_) => "Point",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        _ => "other",
    };
    WkbError::MemberMismatch { expected, found }
}
