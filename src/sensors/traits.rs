// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Sensor traits and common types

use std::fmt;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Discrete category reported by a field sensor.
///
/// Labels are the exact strings the field firmware puts on the wire.
pub trait Category: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Parse a wire label; unknown labels yield `None`
    fn from_label(label: &str) -> Option<Self>;

    /// Wire label
    fn label(&self) -> &'static str;
}

/// Water level category, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WaterLevel {
    #[serde(rename = "Baixo")]
    Low,
    #[serde(rename = "Medio")]
    Medium,
    #[serde(rename = "Alto")]
    High,
}

impl WaterLevel {
    /// Medium and high water both count as a sensor alert
    pub fn is_alerting(&self) -> bool {
        *self >= WaterLevel::Medium
    }
}

impl Category for WaterLevel {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Baixo" => Some(WaterLevel::Low),
            "Medio" => Some(WaterLevel::Medium),
            "Alto" => Some(WaterLevel::High),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            WaterLevel::Low => "Baixo",
            WaterLevel::Medium => "Medio",
            WaterLevel::High => "Alto",
        }
    }
}

/// Rainfall intensity category, ordered from none to heavy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RainIntensity {
    #[serde(rename = "Nenhuma")]
    None,
    #[serde(rename = "Leve")]
    Light,
    #[serde(rename = "Moderada")]
    Moderate,
    #[serde(rename = "Pesada")]
    Heavy,
}

impl RainIntensity {
    /// Any actual rain justifies detailed per-POI analysis
    pub fn is_significant(&self) -> bool {
        *self >= RainIntensity::Light
    }

    /// Moderate or heavy rain counts as a sensor alert
    pub fn is_alerting(&self) -> bool {
        *self >= RainIntensity::Moderate
    }
}

impl Category for RainIntensity {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Nenhuma" => Some(RainIntensity::None),
            "Leve" => Some(RainIntensity::Light),
            "Moderada" => Some(RainIntensity::Moderate),
            "Pesada" => Some(RainIntensity::Heavy),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RainIntensity::None => "Nenhuma",
            RainIntensity::Light => "Leve",
            RainIntensity::Moderate => "Moderada",
            RainIntensity::Heavy => "Pesada",
        }
    }
}

/// Kind of reading, as stored in the readings table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    WaterLevel,
    Rainfall,
    CriticalAlert,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::WaterLevel => "water_level",
            SensorKind::Rainfall => "rainfall",
            SensorKind::CriticalAlert => "critical_alert",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest reading of one sensor kind
#[derive(Debug, Clone, PartialEq)]
pub struct SensorState<C> {
    /// `None` when the payload carried a missing or unrecognized label
    pub category: Option<C>,
    pub label: String,
    pub raw_payload: serde_json::Value,
    pub last_seen: DateTime<Utc>,
}

/// Freshness of a sensor as seen by one decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    /// Nothing was ever received
    NoCommunication,
    Stale,
    Fresh,
}

impl Freshness {
    /// `now - last_seen < window` is fresh; a reading never received is its own state
    pub fn classify(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> Self {
        match last_seen {
            None => Freshness::NoCommunication,
            Some(seen) if now - seen < window => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::NoCommunication => "no communication",
            Freshness::Stale => "stale",
            Freshness::Fresh => "fresh",
        }
    }
}

/// Per-cycle view of a sensor: freshness plus whatever was last reported
#[derive(Debug, Clone, PartialEq)]
pub struct SensorView<C> {
    pub freshness: Freshness,
    pub category: Option<C>,
    pub label: Option<String>,
}

impl<C: Category> SensorView<C> {
    pub fn from_state(state: Option<&SensorState<C>>, now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            freshness: Freshness::classify(state.map(|s| s.last_seen), now, window),
            category: state.and_then(|s| s.category),
            label: state.map(|s| s.label.clone()),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }

    /// Category usable for decisions: only a fresh, recognized reading counts
    pub fn fresh_category(&self) -> Option<C> {
        if self.is_fresh() {
            self.category
        } else {
            None
        }
    }

    /// Last received label, or `N/A` when nothing arrived yet
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("N/A")
    }

    /// Label when fresh, otherwise the freshness state
    pub fn status_label(&self) -> String {
        match self.freshness {
            Freshness::Fresh => self.display_label().to_string(),
            other => other.as_str().to_string(),
        }
    }
}

/// Critical-distance alarm raised by the field unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriticalAlertState {
    pub active: bool,
    pub distance_cm: Option<f64>,
    pub details: Option<serde_json::Value>,
}
