// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Inbound message handlers.
//!
//! Runs on the transport's event-loop task, so every path here is a decode, a
//! short lock and a non-blocking journal submit.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::payload::{
    decode_category, decode_critical_alert, AlertStatus, IngestError, RAINFALL_FIELD, WATER_LEVEL_FIELD,
};
use super::traits::{CriticalAlertState, RainIntensity, SensorKind, SensorState, WaterLevel};
use crate::config::TopicConfig;
use crate::core::HubContext;
use crate::db::{
    Journal, JournalEntry, SensorReadingRecord, SystemEvent, EVENT_CRITICAL_ALERT, ORIGIN_FIELD_UNIT,
};

/// Routes inbound messages to the shared sensor snapshot
pub struct Ingestor {
    context: Arc<HubContext>,
    journal: Arc<dyn Journal>,
    topics: TopicConfig,
}

impl Ingestor {
    pub fn new(context: Arc<HubContext>, journal: Arc<dyn Journal>, topics: TopicConfig) -> Self {
        Self { context, journal, topics }
    }

    /// Handle one message received now
    pub fn handle(&self, topic: &str, payload: &[u8]) {
        if let Err(e) = self.handle_at(topic, payload, Utc::now()) {
            warn!("Dropping message on {}: {}", topic, e);
        }
    }

    /// Handle one message received at `now`.
    ///
    /// The message counter moves for every message, decodable or not. Returns
    /// the kind of state that was touched, or `None` for a topic the hub does
    /// not listen to.
    pub fn handle_at(
        &self,
        topic: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<SensorKind>, IngestError> {
        self.context.counters().record_message();

        if topic == self.topics.water_level {
            self.on_water_level(payload, now)?;
            Ok(Some(SensorKind::WaterLevel))
        } else if topic == self.topics.rainfall {
            self.on_rainfall(payload, now)?;
            Ok(Some(SensorKind::Rainfall))
        } else if topic == self.topics.critical_alert {
            self.on_critical_alert(payload, now)?;
            Ok(Some(SensorKind::CriticalAlert))
        } else {
            debug!("Ignoring message on unexpected topic {}", topic);
            Ok(None)
        }
    }

    fn on_water_level(&self, payload: &[u8], now: DateTime<Utc>) -> Result<(), IngestError> {
        let decoded = decode_category::<WaterLevel>(payload, WATER_LEVEL_FIELD)?;
        if decoded.category.is_none() {
            warn!("Unrecognized water level category '{}'", decoded.label);
        }
        debug!("Water level: {}", decoded.label);

        self.persist_reading(SensorKind::WaterLevel, &decoded.label, None, &decoded.raw, now);
        self.context.update_water(SensorState {
            category: decoded.category,
            label: decoded.label,
            raw_payload: decoded.raw,
            last_seen: now,
        });
        Ok(())
    }

    fn on_rainfall(&self, payload: &[u8], now: DateTime<Utc>) -> Result<(), IngestError> {
        let decoded = decode_category::<RainIntensity>(payload, RAINFALL_FIELD)?;
        if decoded.category.is_none() {
            warn!("Unrecognized rainfall category '{}'", decoded.label);
        }
        debug!("Rainfall: {}", decoded.label);

        self.persist_reading(SensorKind::Rainfall, &decoded.label, None, &decoded.raw, now);
        self.context.update_rain(SensorState {
            category: decoded.category,
            label: decoded.label,
            raw_payload: decoded.raw,
            last_seen: now,
        });
        Ok(())
    }

    fn on_critical_alert(&self, payload: &[u8], now: DateTime<Utc>) -> Result<(), IngestError> {
        let alert = decode_critical_alert(payload)?;
        let extra = json!({ "distance_cm": alert.distance_cm });

        match alert.status {
            AlertStatus::Active => {
                error!(
                    "CRITICAL ALERT from field unit, distance {}",
                    alert.distance_cm.map(|d| format!("{:.1} cm", d)).unwrap_or_else(|| "unknown".into())
                );
                self.context.set_critical(CriticalAlertState {
                    active: true,
                    distance_cm: alert.distance_cm,
                    details: Some(alert.raw.clone()),
                });
            }
            AlertStatus::Cleared => {
                let was_active = self.context.set_critical(CriticalAlertState {
                    active: false,
                    distance_cm: alert.distance_cm,
                    details: Some(alert.raw.clone()),
                });
                if was_active {
                    info!("Critical alert cleared by field unit");
                } else {
                    debug!("Critical alert cleared (was not active)");
                }
            }
            AlertStatus::Unknown => {
                warn!("Critical alert message with unknown status: {}", alert.raw);
            }
        }

        let level = alert.status.as_str();
        self.persist_reading(SensorKind::CriticalAlert, level, Some(extra), &alert.raw, now);
        self.journal.submit(JournalEntry::Event(SystemEvent {
            timestamp: now,
            event_type: EVENT_CRITICAL_ALERT.to_string(),
            origin: ORIGIN_FIELD_UNIT.to_string(),
            level: level.to_string(),
            detail: Some(alert.raw),
        }));
        Ok(())
    }

    fn persist_reading(
        &self,
        kind: SensorKind,
        category: &str,
        extra: Option<serde_json::Value>,
        raw: &serde_json::Value,
        now: DateTime<Utc>,
    ) {
        self.journal.submit(JournalEntry::Reading(SensorReadingRecord {
            timestamp: now,
            kind,
            category: category.to_string(),
            extra,
            raw: raw.clone(),
        }));
    }
}
