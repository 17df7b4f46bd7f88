// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! FloodHub - Flood Early-Warning Decision Hub
//!
//! Collects water-level, rainfall and critical-distance telemetry from a field
//! unit over MQTT, combines it with a per-location flood susceptibility
//! classifier, and sends one system risk command back every cycle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       FloodHub Engine                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐   │
//! │  │  MQTT   │→ │ Ingestor │→ │ Decision  │→ │   Alert    │   │
//! │  │  Link   │  │          │  │  Engine   │  │ Publisher  │   │
//! │  └─────────┘  └──────────┘  └───────────┘  └────────────┘   │
//! │                    ↓          ↑    ↑    ↑        ↓          │
//! │              ┌──────────┐  ┌────┐ ┌─────┐ ┌──────────┐      │
//! │              │   Hub    │  │ ML │ │ POI │ │  Impact  │      │
//! │              │ Context  │  └────┘ └─────┘ │ (spatial)│      │
//! │              └──────────┘                 └──────────┘      │
//! │                    ↓                                        │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │            Journal → SQLite (audit trail)           │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod db;
pub mod detection;
pub mod impact;
pub mod ml;
pub mod poi;
pub mod sensors;
pub mod spatial;
pub mod streaming;

// Re-exports for convenience
pub use config::Config;
pub use core::{Engine, HubContext};
pub use db::{Database, Journal};
pub use detection::{CycleOutcome, CycleReport, DecisionEngine};
pub use ml::ArtifactManager;
pub use poi::PointOfInterest;
pub use sensors::Ingestor;
pub use streaming::{AlertPublisher, MqttClient, SystemRisk};

/// FloodHub version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FloodHub name
pub const NAME: &str = "FloodHub";
