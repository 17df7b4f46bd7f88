//! Sensor module - field categories, payload decoding and ingestion

mod traits;
mod payload;
mod ingest;

pub use traits::*;
pub use payload::*;
pub use ingest::Ingestor;
