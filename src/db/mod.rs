// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Database module for persistent storage

mod journal;
mod records;

pub use journal::*;
pub use records::*;

use anyhow::Result;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::poi::PointOfInterest;

/// Database manager.
///
/// One long-lived connection; every call takes the lock, runs one statement or
/// one transaction and releases it.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;

        conn.execute_batch(r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        "#)?;

        let db = Self { conn: Mutex::new(conn) };
        db.create_tables()?;

        info!("Database opened at {:?}", config.path);
        Ok(db)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.create_tables()?;
        Ok(db)
    }

    /// Create database tables
    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(r#"
            -- Raw sensor readings
            CREATE TABLE IF NOT EXISTS sensor_readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                sensor_kind TEXT NOT NULL,
                category TEXT,
                extra_json TEXT,
                raw_json TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_readings_timestamp ON sensor_readings(timestamp);

            -- Per-cycle POI analyses
            CREATE TABLE IF NOT EXISTS poi_analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cycle_timestamp TEXT NOT NULL,
                poi_name TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                geo_probability REAL,
                geo_risk_high INTEGER,
                water_category TEXT,
                rain_category TEXT,
                combined_status TEXT,
                buffer_radius_m REAL,
                impact_buildings TEXT,
                impact_roads TEXT,
                impact_rivers TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_analyses_cycle ON poi_analyses(cycle_timestamp);

            -- System events and alerts
            CREATE TABLE IF NOT EXISTS system_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                origin TEXT,
                level TEXT,
                detail_json TEXT
            );

            -- Training dataset (written by the training pipeline)
            CREATE TABLE IF NOT EXISTS training_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                longitude REAL NOT NULL,
                latitude REAL NOT NULL,
                elevation REAL,
                distance_to_river REAL,
                slope REAL,
                curvature REAL,
                is_flooded INTEGER NOT NULL
            );

            -- Training runs (written by the training pipeline)
            CREATE TABLE IF NOT EXISTS training_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                model_file TEXT,
                scaler_file TEXT,
                parameters_json TEXT,
                threshold REAL,
                metrics_json TEXT
            );

            -- Hub status snapshots
            CREATE TABLE IF NOT EXISTS hub_status (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                uptime_secs REAL,
                cycles_executed INTEGER,
                messages_received INTEGER,
                alerts_sent INTEGER
            );

            -- POI feature table
            CREATE TABLE IF NOT EXISTS points_of_interest (
                name TEXT PRIMARY KEY,
                longitude REAL,
                latitude REAL,
                slope REAL,
                curvature REAL,
                updated_at TEXT
            );
        "#)?;

        Ok(())
    }

    /// Store a raw sensor reading
    pub fn insert_reading(&self, reading: &SensorReadingRecord) -> Result<i64> {
        let conn = self.conn.lock();

        let extra = reading.extra.as_ref().map(serde_json::to_string).transpose()?;
        let raw = serde_json::to_string(&reading.raw)?;

        conn.execute(
            "INSERT INTO sensor_readings (timestamp, sensor_kind, category, extra_json, raw_json) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reading.timestamp.to_rfc3339(),
                reading.kind.as_str(),
                reading.category,
                extra,
                raw
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Store a system event
    pub fn insert_event(&self, event: &SystemEvent) -> Result<i64> {
        let conn = self.conn.lock();

        let detail = event.detail.as_ref().map(serde_json::to_string).transpose()?;

        conn.execute(
            "INSERT INTO system_events (timestamp, event_type, origin, level, detail_json) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.origin,
                event.level,
                detail
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Store every POI record of one cycle in a single transaction
    pub fn insert_cycle_records(&self, records: &[DecisionCycleRecord]) -> Result<usize> {
        let conn = self.conn.lock();

        let tx = conn.unchecked_transaction()?;
        let mut count = 0;

        for record in records {
            tx.execute(
                r#"INSERT INTO poi_analyses
                   (cycle_timestamp, poi_name, latitude, longitude, geo_probability, geo_risk_high,
                    water_category, rain_category, combined_status, buffer_radius_m,
                    impact_buildings, impact_roads, impact_rivers)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
                params![
                    record.timestamp.to_rfc3339(),
                    record.poi_name,
                    record.latitude,
                    record.longitude,
                    record.geo_probability,
                    record.geo_risk_high,
                    record.water_category,
                    record.rain_category,
                    record.combined_status,
                    record.buffer_radius_m,
                    record.impact_buildings,
                    record.impact_roads,
                    record.impact_rivers
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }

    /// Store a hub status snapshot
    pub fn insert_status(&self, status: &HubStatus) -> Result<i64> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO hub_status (timestamp, uptime_secs, cycles_executed, messages_received, alerts_sent) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                status.timestamp.to_rfc3339(),
                status.uptime_secs,
                status.cycles_executed as i64,
                status.messages_received as i64,
                status.alerts_sent as i64
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Insert or refresh the POI feature table
    pub fn upsert_pois(&self, pois: &[PointOfInterest]) -> Result<usize> {
        let conn = self.conn.lock();

        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        for poi in pois {
            tx.execute(
                r#"INSERT INTO points_of_interest (name, longitude, latitude, slope, curvature, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                   ON CONFLICT(name) DO UPDATE SET
                       longitude = excluded.longitude,
                       latitude = excluded.latitude,
                       slope = excluded.slope,
                       curvature = excluded.curvature,
                       updated_at = excluded.updated_at"#,
                params![poi.name, poi.longitude, poi.latitude, poi.slope, poi.curvature, now],
            )?;
        }

        tx.commit()?;
        Ok(pois.len())
    }

    /// Most recent training run recorded by the training pipeline
    pub fn latest_training_run(&self) -> Result<Option<TrainingRun>> {
        let conn = self.conn.lock();

        let run = conn
            .query_row(
                "SELECT timestamp, model_file, scaler_file, threshold, metrics_json
                 FROM training_runs ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                |row| {
                    Ok(TrainingRun {
                        timestamp: row.get(0)?,
                        model_file: row.get(1)?,
                        scaler_file: row.get(2)?,
                        threshold: row.get(3)?,
                        metrics_json: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(run)
    }

    /// Write one journal entry
    pub fn apply(&self, entry: &JournalEntry) -> Result<()> {
        match entry {
            JournalEntry::Reading(reading) => {
                self.insert_reading(reading)?;
            }
            JournalEntry::Event(event) => {
                self.insert_event(event)?;
            }
            JournalEntry::Cycle(records) => {
                self.insert_cycle_records(records)?;
            }
            JournalEntry::Status(status) => {
                self.insert_status(status)?;
            }
        }
        Ok(())
    }

    /// Stored analyses of the most recent cycles, newest first
    pub fn recent_analyses(&self, limit: usize) -> Result<Vec<StoredAnalysis>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT cycle_timestamp, poi_name, geo_probability, geo_risk_high, combined_status, buffer_radius_m
             FROM poi_analyses ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredAnalysis {
                cycle_timestamp: row.get(0)?,
                poi_name: row.get(1)?,
                geo_probability: row.get(2)?,
                geo_risk_high: row.get(3)?,
                combined_status: row.get(4)?,
                buffer_radius_m: row.get(5)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.conn.lock();

        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            reading_count: count("sensor_readings")?,
            analysis_count: count("poi_analyses")?,
            event_count: count("system_events")?,
            status_count: count("hub_status")?,
            poi_count: count("points_of_interest")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub timestamp: String,
    pub model_file: Option<String>,
    pub scaler_file: Option<String>,
    pub threshold: Option<f64>,
    pub metrics_json: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    pub cycle_timestamp: String,
    pub poi_name: String,
    pub geo_probability: Option<f64>,
    pub geo_risk_high: Option<bool>,
    pub combined_status: String,
    pub buffer_radius_m: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub reading_count: usize,
    pub analysis_count: usize,
    pub event_count: usize,
    pub status_count: usize,
    pub poi_count: usize,
}
