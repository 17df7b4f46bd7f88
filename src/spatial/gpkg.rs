// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Read-only GeoPackage layer access

use std::path::Path;
use geo::Geometry;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, warn};

use super::wkb::decode_gpkg_geometry;
use super::{FeatureTags, GeoLoadError, LayerKind};
use super::projection::EPSG_WGS84;

/// Feature as stored, before normalization and reprojection
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub geometry: Geometry<f64>,
    pub tags: FeatureTags,
}

/// Everything read from one layer table
#[derive(Debug)]
pub struct LayerSource {
    pub epsg: u32,
    pub features: Vec<RawFeature>,
    /// Rows with empty or undecodable geometry
    pub skipped: usize,
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::Text(s) if !s.trim().is_empty() => Some(s),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        _ => None,
    }
}

/// Read one feature table of a GeoPackage
pub fn read_layer(path: &Path, layer: &str, kind: LayerKind) -> Result<LayerSource, GeoLoadError> {
    if !path.exists() {
        return Err(GeoLoadError::SourceMissing(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let (geometry_column, srs_id): (String, i64) = conn
        .query_row(
            "SELECT column_name, srs_id FROM gpkg_geometry_columns WHERE table_name = ?1",
            params![layer],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| GeoLoadError::LayerNotFound(layer.to_string()))?;

    let epsg = resolve_epsg(&conn, srs_id, layer)?;

    let mut columns = Vec::new();
    {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote(layer)))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            columns.push(name?);
        }
    }
    let tag_columns: Vec<&'static str> = kind
        .tag_columns()
        .iter()
        .copied()
        .filter(|tag| columns.iter().any(|c| c == tag))
        .collect();
    debug!("Layer '{}' geometry column '{}', tags {:?}", layer, geometry_column, tag_columns);

    let mut select = vec![quote(&geometry_column)];
    select.extend(tag_columns.iter().map(|c| quote(c)));
    let sql = format!("SELECT {} FROM {}", select.join(", "), quote(layer));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut features = Vec::new();
    let mut skipped = 0;

    while let Some(row) = rows.next()? {
        let blob: Option<Vec<u8>> = row.get(0)?;
        let geometry = match blob.as_deref().map(decode_gpkg_geometry) {
            Some(Ok(Some(geometry))) => geometry,
            Some(Err(e)) => {
                debug!("Skipping undecodable geometry in '{}': {}", layer, e);
                skipped += 1;
                continue;
            }
            Some(Ok(None)) | None => {
                skipped += 1;
                continue;
            }
        };

        let mut tags = FeatureTags::default();
        for (i, column) in tag_columns.iter().enumerate() {
            if let Some(value) = text(row.get(i + 1)?) {
                tags.insert(column, value);
            }
        }

        features.push(RawFeature { geometry, tags });
    }

    Ok(LayerSource { epsg, features, skipped })
}

/// Map a GeoPackage `srs_id` to an EPSG code
fn resolve_epsg(conn: &Connection, srs_id: i64, layer: &str) -> Result<u32, GeoLoadError> {
    let defined: Option<(String, i64)> = conn
        .query_row(
            "SELECT organization, organization_coordsys_id FROM gpkg_spatial_ref_sys WHERE srs_id = ?1",
            params![srs_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match defined {
        Some((organization, code)) if organization.eq_ignore_ascii_case("EPSG") && code > 0 => Ok(code as u32),
        _ if srs_id > 0 => Ok(srs_id as u32),
        _ => {
            warn!("Layer '{}' has no defined CRS, assuming EPSG:{}", layer, EPSG_WGS84);
            Ok(EPSG_WGS84)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::fixture::{self, wkb as write};
    use geo::line_string;

    fn temp_path() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layers.gpkg");
        (dir, path)
    }

    #[test]
    fn test_read_layer_with_tags() {
        let (_dir, path) = temp_path();
        let conn = fixture::create(&path).unwrap();
        fixture::add_layer(&conn, "roads", 4326, "LINESTRING", &["highway", "name"]).unwrap();

        let line = line_string![(x: -51.2, y: -30.0), (x: -51.1, y: -30.0)];
        let blob = write::gpkg(4326, &write::line_string(&line));
        fixture::insert(&conn, "roads", &blob, &["highway", "name"], &[Some("primary"), Some("Av. Ipiranga")]).unwrap();
        fixture::insert(&conn, "roads", b"GP\x00\x11\xe6\x10\x00\x00", &["highway", "name"], &[None, None]).unwrap();
        drop(conn);

        let source = read_layer(&path, "roads", LayerKind::Roads).unwrap();
        assert_eq!(source.epsg, 4326);
        assert_eq!(source.features.len(), 1);
        assert_eq!(source.skipped, 1);
        assert_eq!(source.features[0].tags.get("highway"), Some("primary"));
        assert_eq!(source.features[0].tags.get("name"), Some("Av. Ipiranga"));
        assert_eq!(source.features[0].tags.get("bridge"), None);
    }

    #[test]
    fn test_missing_source_and_layer() {
        let (_dir, path) = temp_path();
        assert!(matches!(
            read_layer(&path, "roads", LayerKind::Roads),
            Err(GeoLoadError::SourceMissing(_))
        ));

        let conn = fixture::create(&path).unwrap();
        drop(conn);
        assert!(matches!(
            read_layer(&path, "rivers", LayerKind::Rivers),
            Err(GeoLoadError::LayerNotFound(_))
        ));
    }

    #[test]
    fn test_undefined_crs_assumes_wgs84() {
        let (_dir, path) = temp_path();
        let conn = fixture::create(&path).unwrap();
        fixture::add_layer(&conn, "rivers", 0, "LINESTRING", &["name"]).unwrap();
        drop(conn);

        let source = read_layer(&path, "rivers", LayerKind::Rivers).unwrap();
        assert_eq!(source.epsg, EPSG_WGS84);
        assert!(source.features.is_empty());
    }
}
