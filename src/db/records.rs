// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Rows written for audit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sensors::SensorKind;

/// Raw sensor reading as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReadingRecord {
    pub timestamp: DateTime<Utc>,
    pub kind: SensorKind,
    pub category: String,
    pub extra: Option<Value>,
    pub raw: Value,
}

/// Event origin for things the field unit reports
pub const ORIGIN_FIELD_UNIT: &str = "FIELD_UNIT";

/// Event origin for things the hub decides
pub const ORIGIN_HUB: &str = "HUB";

pub const EVENT_CRITICAL_ALERT: &str = "CRITICAL_ALERT_RECEIVED";
pub const EVENT_RISK_COMMAND: &str = "SYSTEM_RISK_COMMAND";

/// System event or alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub origin: String,
    pub level: String,
    pub detail: Option<Value>,
}

/// Outcome of one POI in one decision cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionCycleRecord {
    pub timestamp: DateTime<Utc>,
    pub poi_name: String,
    pub longitude: f64,
    pub latitude: f64,

    /// Absent when the cycle only produced a simplified status
    pub geo_probability: Option<f64>,
    pub geo_risk_high: Option<bool>,

    pub water_category: String,
    pub rain_category: String,
    pub combined_status: String,

    /// Present only when an impact query ran
    pub buffer_radius_m: Option<f64>,
    pub impact_buildings: Option<String>,
    pub impact_roads: Option<String>,
    pub impact_rivers: Option<String>,
}

/// Snapshot of hub counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HubStatus {
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: f64,
    pub cycles_executed: u64,
    pub messages_received: u64,
    pub alerts_sent: u64,
}
