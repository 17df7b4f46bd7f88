// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Inbound payload decoding

use serde_json::{Map, Value};
use thiserror::Error;

use super::Category;

/// Field carrying the water level category
pub const WATER_LEVEL_FIELD: &str = "level_category";

/// Field carrying the rainfall intensity category
pub const RAINFALL_FIELD: &str = "intensity_category";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Decode a UTF-8 JSON object payload
pub fn decode_object(payload: &[u8]) -> Result<Map<String, Value>, IngestError> {
    let text = std::str::from_utf8(payload)?;
    match serde_json::from_str(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(IngestError::NotAnObject),
    }
}

/// A decoded category reading
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPayload<C> {
    pub category: Option<C>,
    pub label: String,
    pub raw: Value,
}

/// Decode a payload whose category lives under `field`.
///
/// A missing or non-string field is kept as label `N/A`.
pub fn decode_category<C: Category>(payload: &[u8], field: &str) -> Result<CategoryPayload<C>, IngestError> {
    let object = decode_object(payload)?;
    let label = object
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string();

    Ok(CategoryPayload {
        category: C::from_label(&label),
        label,
        raw: Value::Object(object),
    })
}

/// Status carried by a critical-alert message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Active,
    Cleared,
    Unknown,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Cleared => "CLEARED",
            AlertStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriticalAlertPayload {
    pub status: AlertStatus,
    pub distance_cm: Option<f64>,
    pub raw: Value,
}

/// Decode `{status: "ACTIVE"|"CLEARED", distance_cm?}`; status matching ignores case
pub fn decode_critical_alert(payload: &[u8]) -> Result<CriticalAlertPayload, IngestError> {
    let object = decode_object(payload)?;
    let status = match object
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_ascii_uppercase)
        .as_deref()
    {
        Some("ACTIVE") => AlertStatus::Active,
        Some("CLEARED") => AlertStatus::Cleared,
        _ => AlertStatus::Unknown,
    };
    let distance_cm = object.get("distance_cm").and_then(Value::as_f64);

    Ok(CriticalAlertPayload {
        status,
        distance_cm,
        raw: Value::Object(object),
    })
}
