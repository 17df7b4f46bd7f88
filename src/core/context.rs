// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Shared hub state

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::db::HubStatus;
use crate::sensors::{CriticalAlertState, RainIntensity, SensorState, WaterLevel};

/// Everything the ingestion handlers know about the field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    pub water: Option<SensorState<WaterLevel>>,
    pub rain: Option<SensorState<RainIntensity>>,
    pub critical: CriticalAlertState,
}

/// Monotonic hub counters
#[derive(Debug)]
pub struct HubCounters {
    started: Instant,
    cycles_executed: AtomicU64,
    messages_received: AtomicU64,
    alerts_sent: AtomicU64,
}

impl HubCounters {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            cycles_executed: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            alerts_sent: AtomicU64::new(0),
        }
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of the cycle just started
    pub fn record_cycle(&self) -> u64 {
        self.cycles_executed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_alert(&self) {
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn cycles_executed(&self) -> u64 {
        self.cycles_executed.load(Ordering::Relaxed)
    }

    pub fn alerts_sent(&self) -> u64 {
        self.alerts_sent.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn status(&self, timestamp: DateTime<Utc>) -> HubStatus {
        HubStatus {
            timestamp,
            uptime_secs: self.uptime_secs(),
            cycles_executed: self.cycles_executed(),
            messages_received: self.messages_received(),
            alerts_sent: self.alerts_sent(),
        }
    }
}

/// State shared by the ingestion handlers, the decision loop and telemetry.
///
/// Sensor fields live behind one lock so a cycle always reads a consistent
/// snapshot; counters are atomics.
#[derive(Debug)]
pub struct HubContext {
    sensors: RwLock<SensorSnapshot>,
    counters: HubCounters,
}

impl Default for HubContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HubContext {
    pub fn new() -> Self {
        Self {
            sensors: RwLock::new(SensorSnapshot::default()),
            counters: HubCounters::new(),
        }
    }

    /// Copy of the current sensor state
    pub fn snapshot(&self) -> SensorSnapshot {
        self.sensors.read().clone()
    }

    pub fn update_water(&self, state: SensorState<WaterLevel>) {
        self.sensors.write().water = Some(state);
    }

    pub fn update_rain(&self, state: SensorState<RainIntensity>) {
        self.sensors.write().rain = Some(state);
    }

    /// Replace the critical-alert state, returning whether it was active before
    pub fn set_critical(&self, state: CriticalAlertState) -> bool {
        let mut sensors = self.sensors.write();
        std::mem::replace(&mut sensors.critical, state).active
    }

    pub fn counters(&self) -> &HubCounters {
        &self.counters
    }
}
