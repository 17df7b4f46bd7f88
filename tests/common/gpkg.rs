// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! GeoPackage writer for test fixtures

use rusqlite::{params, Connection};
use std::path::Path;

/// Create a GeoPackage with the core metadata tables
pub fn create(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        r#"
        PRAGMA application_id = 1196444487;
        CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        );
        CREATE TABLE gpkg_contents (
            table_name TEXT NOT NULL PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT UNIQUE,
            srs_id INTEGER
        );
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL,
            PRIMARY KEY (table_name, column_name)
        );
        INSERT INTO gpkg_spatial_ref_sys VALUES
            ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', NULL),
            ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', NULL),
            ('WGS 84', 4326, 'EPSG', 4326, 'GEOGCS["WGS 84"]', NULL),
            ('SIRGAS 2000 / UTM zone 22S', 31982, 'EPSG', 31982, 'PROJCS["SIRGAS 2000 / UTM zone 22S"]', NULL);
        "#,
    )?;
    Ok(conn)
}

/// Create a feature table with a `geom` column and the given text columns
pub fn add_layer(conn: &Connection, name: &str, srs_id: i64, kind: &str, columns: &[&str]) -> rusqlite::Result<()> {
    let mut ddl = format!("CREATE TABLE \"{}\" (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB", name);
    for column in columns {
        ddl.push_str(&format!(", \"{}\" TEXT", column));
    }
    ddl.push(')');
    conn.execute(&ddl, [])?;
    conn.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES (?1, 'features', ?1, ?2)",
        params![name, srs_id],
    )?;
    conn.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', ?2, ?3, 0, 0)",
        params![name, kind, srs_id],
    )?;
    Ok(())
}

/// Insert one feature; `values` pair up with `columns`
pub fn insert(
    conn: &Connection,
    name: &str,
    geometry: &[u8],
    columns: &[&str],
    values: &[Option<&str>],
) -> rusqlite::Result<()> {
    let mut names = vec!["geom".to_string()];
    names.extend(columns.iter().map(|c| format!("\"{}\"", c)));
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        name,
        names.join(", "),
        placeholders.join(", ")
    );

    let mut params: Vec<&dyn rusqlite::ToSql> = vec![&geometry];
    for value in values {
        params.push(value);
    }
    conn.execute(&sql, params.as_slice())?;
    Ok(())
}

/// Little-endian ISO WKB writers
pub mod wkb {
    use geo::{Coord, LineString, Polygon};

    fn header(out: &mut Vec<u8>, code: u32) {
        out.push(1);
        out.extend_from_slice(&code.to_le_bytes());
    }

    fn coords(out: &mut Vec<u8>, coords: &[Coord<f64>]) {
        out.extend_from_slice(&(coords.len() as u32).to_le_bytes());
        for c in coords {
            out.extend_from_slice(&c.x.to_le_bytes());
            out.extend_from_slice(&c.y.to_le_bytes());
        }
    }

    pub fn line_string(line: &LineString<f64>) -> Vec<u8> {
        let mut out = Vec::new();
        header(&mut out, 2);
        coords(&mut out, &line.0);
        out
    }

    pub fn polygon(polygon: &Polygon<f64>) -> Vec<u8> {
        let mut out = Vec::new();
        header(&mut out, 3);
        out.extend_from_slice(&(1 + polygon.interiors().len() as u32).to_le_bytes());
        coords(&mut out, &polygon.exterior().0);
        for ring in polygon.interiors() {
            coords(&mut out, &ring.0);
        }
        out
    }

    /// Wrap WKB in a GeoPackage header with no envelope
    pub fn gpkg(srs_id: i32, wkb: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + wkb.len());
        out.extend_from_slice(b"GP");
        out.push(0);
        out.push(0x01);
        out.extend_from_slice(&srs_id.to_le_bytes());
        out.extend_from_slice(wkb);
        out
    }
}
