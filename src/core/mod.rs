//! Core engine module - shared state, telemetry and task orchestration

mod context;
mod engine;
mod telemetry;

pub use context::{HubContext, HubCounters, SensorSnapshot};
pub use engine::Engine;
pub use telemetry::TelemetryRecorder;
