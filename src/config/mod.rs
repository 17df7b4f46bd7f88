// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Configuration module

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level used when no CLI override is given
    pub log_level: String,

    /// Points-of-interest feature table (TOML, `[[poi]]` entries)
    pub pois_path: PathBuf,

    /// Broker connection and topics
    pub mqtt: MqttConfig,

    /// Classifier/scaler artifact files
    pub artifacts: ArtifactConfig,

    /// Vector layers used for impact analysis
    pub geo: GeoConfig,

    /// Decision cycle tuning
    pub decision: DecisionConfig,

    /// Database configuration
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "FloodHub".to_string(),
            log_level: "info".to_string(),
            pois_path: PathBuf::from("./data/pois.toml"),
            mqtt: MqttConfig::default(),
            artifacts: ArtifactConfig::default(),
            geo: GeoConfig::default(),
            decision: DecisionConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing configuration {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("floodhub"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// MQTT broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,

    /// Left empty, a unique id is generated per run
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Startup connection attempts before giving up
    pub connect_attempts: u32,

    /// Pause between startup connection attempts
    pub connect_retry_delay_secs: u64,

    /// Upper bound for a single connection attempt
    pub connect_timeout_secs: u64,

    /// Back-off used by the event loop after a transport error
    pub reconnect_delay_secs: u64,

    pub topics: TopicConfig,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "test.mosquitto.org".to_string(),
            port: 1883,
            client_id: String::new(),
            keep_alive_secs: 60,
            username: None,
            password: None,
            connect_attempts: 3,
            connect_retry_delay_secs: 10,
            connect_timeout_secs: 15,
            reconnect_delay_secs: 5,
            topics: TopicConfig::default(),
        }
    }
}

impl MqttConfig {
    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// Inbound and outbound topic names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub water_level: String,
    pub rainfall: String,
    pub critical_alert: String,
    pub command: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            water_level: "floodsentry/sensor/water_level".to_string(),
            rainfall: "floodsentry/sensor/rainfall".to_string(),
            critical_alert: "floodsentry/alert/critical_status".to_string(),
            command: "floodsentry/command/alert_status".to_string(),
        }
    }
}

impl TopicConfig {
    /// Topics the hub subscribes to
    pub fn inbound(&self) -> [&str; 3] {
        [&self.water_level, &self.rainfall, &self.critical_alert]
    }
}

/// Classifier artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,

    /// How often the model file's modification time is compared
    pub check_interval_secs: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./output/model/flood_model.json"),
            scaler_path: PathBuf::from("./output/model/feature_scaler.json"),
            check_interval_secs: 60,
        }
    }
}

impl ArtifactConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

/// Geo layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// GeoPackage holding the three vector layers
    pub source_path: PathBuf,
    pub buildings_layer: String,
    pub roads_layer: String,
    pub rivers_layer: String,

    /// Metric CRS every layer is reprojected into
    pub target_epsg: u32,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("./data/raw/osm_layers.gpkg"),
            buildings_layer: "buildings".to_string(),
            roads_layer: "roads".to_string(),
            rivers_layer: "rivers".to_string(),
            target_epsg: 31982,
        }
    }
}

/// Decision cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub cycle_interval_secs: u64,

    /// Maximum age of a sensor reading still treated as fresh
    pub staleness_window_secs: u64,

    /// Geo probability at or above which a POI is geo-risk high
    pub prediction_threshold: f64,

    pub buffer_radii: BufferRadii,

    pub telemetry_interval_secs: u64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: 15,
            staleness_window_secs: 35,
            prediction_threshold: 0.028,
            buffer_radii: BufferRadii::default(),
            telemetry_interval_secs: 300,
        }
    }
}

/// Upper bound for the staleness window (one year)
const MAX_STALENESS_WINDOW_SECS: u64 = 365 * 24 * 3600;

impl DecisionConfig {
    /// At least one second; a timer cannot tick with a zero period
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs.max(1))
    }

    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.staleness_window_secs.min(MAX_STALENESS_WINDOW_SECS) as i64)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry_interval_secs.max(1))
    }
}

/// Impact buffer radii in meters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufferRadii {
    pub default_m: f64,
    pub water_medium_m: f64,
    pub water_high_m: f64,
}

impl Default for BufferRadii {
    fn default() -> Self {
        Self {
            default_m: 200.0,
            water_medium_m: 300.0,
            water_high_m: 500.0,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Enable database storage
    pub enabled: bool,

    /// Database path
    pub path: PathBuf,

    /// Pending writes held before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("./output/database/floodhub.db"),
            queue_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_field_deployment() {
        let config = Config::default();
        assert_eq!(config.mqtt.connect_attempts, 3);
        assert_eq!(config.mqtt.connect_retry_delay_secs, 10);
        assert_eq!(config.decision.cycle_interval_secs, 15);
        assert_eq!(config.decision.staleness_window_secs, 35);
        assert_eq!(config.decision.prediction_threshold, 0.028);
        assert_eq!(config.decision.buffer_radii.water_high_m, 500.0);
        assert_eq!(config.artifacts.check_interval_secs, 60);
        assert_eq!(config.geo.target_epsg, 31982);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            log_level = "debug"

            [mqtt]
            host = "broker.local"

            [decision]
            staleness_window_secs = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.decision.staleness_window_secs, 20);
        assert_eq!(config.decision.cycle_interval_secs, 15);
        assert_eq!(config.mqtt.topics.command, "floodsentry/command/alert_status");
    }

    #[test]
    fn test_decision_durations_are_bounded() {
        let decision = DecisionConfig {
            cycle_interval_secs: 0,
            staleness_window_secs: u64::MAX,
            telemetry_interval_secs: 0,
            ..DecisionConfig::default()
        };
        assert_eq!(decision.cycle_interval(), Duration::from_secs(1));
        assert_eq!(decision.telemetry_interval(), Duration::from_secs(1));
        assert_eq!(decision.staleness_window(), chrono::Duration::days(365));

        let parsed: Config = toml::from_str("[decision]\ncycle_interval_secs = 0\n").unwrap();
        assert_eq!(parsed.decision.cycle_interval(), Duration::from_secs(1));
        assert_eq!(DecisionConfig::default().staleness_window(), chrono::Duration::seconds(35));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let created = Config::load_or_create(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(created.geo.rivers_layer, loaded.geo.rivers_layer);
        assert_eq!(created.database.path, loaded.database.path);
    }
}
