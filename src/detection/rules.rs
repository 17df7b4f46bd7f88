// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Pure decision rules

use crate::config::BufferRadii;
use crate::sensors::{Freshness, RainIntensity, SensorView, WaterLevel};

/// Geo risk is high at or above the threshold
pub fn is_geo_risk_high(probability: f64, threshold: f64) -> bool {
    probability >= threshold
}

/// Live sensor alert from fresh categories only
pub fn sensor_alert(water: Option<WaterLevel>, rain: Option<RainIntensity>) -> bool {
    water.is_some_and(|w| w.is_alerting()) || rain.is_some_and(|r| r.is_alerting())
}

pub fn combined_high(geo_risk_high: bool, sensor_alert: bool) -> bool {
    geo_risk_high && sensor_alert
}

/// Buffer radius for impact queries. Only the water level widens it.
pub fn buffer_radius(water: Option<WaterLevel>, radii: &BufferRadii) -> f64 {
    match water {
        Some(WaterLevel::High) => radii.water_high_m,
        Some(WaterLevel::Medium) => radii.water_medium_m,
        _ => radii.default_m,
    }
}

/// Depth of analysis for one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPlan {
    /// Per-POI classification and impact queries
    Detailed,
    /// No per-POI work; the status explains why
    Simplified(String),
}

impl AnalysisPlan {
    pub fn is_detailed(&self) -> bool {
        matches!(self, AnalysisPlan::Detailed)
    }
}

/// Detailed analysis needs fresh, significant rainfall. A critical alert does
/// not change that; it only forces the system decision.
pub fn plan_analysis(critical_active: bool, rain: &SensorView<RainIntensity>) -> AnalysisPlan {
    let skipped = match (rain.freshness, rain.category) {
        (Freshness::Fresh, Some(r)) if r.is_significant() => return AnalysisPlan::Detailed,
        (Freshness::Fresh, Some(_)) => "no rain".to_string(),
        (Freshness::Fresh, None) => format!("unrecognized rainfall category '{}'", rain.display_label()),
        (Freshness::Stale, _) => "rainfall data stale".to_string(),
        (Freshness::NoCommunication, _) => "no rainfall data".to_string(),
    };

    if critical_active {
        AnalysisPlan::Simplified(format!("CRITICAL ALERT ACTIVE ({}, detailed analysis skipped)", skipped))
    } else {
        AnalysisPlan::Simplified(format!("Simplified status: {}, detailed analysis skipped", skipped))
    }
}

/// Per-POI status text
pub fn poi_status(geo_risk_high: bool, sensor_alert: bool) -> &'static str {
    match (geo_risk_high, sensor_alert) {
        (true, true) => "HIGH RISK",
        (true, false) => "GEO RISK HIGH, CURRENT CONDITIONS OK",
        (false, _) => "LOW RISK",
    }
}
