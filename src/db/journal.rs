// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Fire-and-forget persistence.
//!
//! Producers (message handlers, the decision loop, telemetry) hand entries to a
//! [`Journal`] and never wait on storage. The [`Recorder`] drains a bounded
//! queue on a blocking worker and writes each entry with its own statement or
//! transaction, so one failed write only loses that entry.

use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::records::{DecisionCycleRecord, HubStatus, SensorReadingRecord, SystemEvent};
use super::Database;

/// One unit of persistence work
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    Reading(SensorReadingRecord),
    Event(SystemEvent),
    /// All records of one decision cycle, written atomically
    Cycle(Vec<DecisionCycleRecord>),
    Status(HubStatus),
}

impl JournalEntry {
    pub fn label(&self) -> &'static str {
        match self {
            JournalEntry::Reading(_) => "sensor reading",
            JournalEntry::Event(_) => "system event",
            JournalEntry::Cycle(_) => "cycle analyses",
            JournalEntry::Status(_) => "hub status",
        }
    }
}

/// Sink for audit records. Submitting never blocks and never fails.
pub trait Journal: Send + Sync {
    fn submit(&self, entry: JournalEntry);
}

/// Queue in front of the database
#[derive(Clone)]
pub struct Recorder {
    tx: mpsc::Sender<JournalEntry>,
}

impl Recorder {
    /// Start the writer. It exits once every `Recorder` clone is dropped and the
    /// queue is drained.
    pub fn spawn(db: Arc<Database>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<JournalEntry>(capacity.max(1));

        let worker = tokio::task::spawn_blocking(move || {
            while let Some(entry) = rx.blocking_recv() {
                if let Err(e) = db.apply(&entry) {
                    warn!("Failed to persist {}: {:#}", entry.label(), e);
                }
            }
            debug!("Journal writer drained");
        });

        (Self { tx }, worker)
    }
}

impl Journal for Recorder {
    fn submit(&self, entry: JournalEntry) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                warn!("Journal queue full, dropping {}", entry.label());
            }
            Err(TrySendError::Closed(entry)) => {
                debug!("Journal closed, dropping {}", entry.label());
            }
        }
    }
}

/// Journal used when storage is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl Journal for NullJournal {
    fn submit(&self, entry: JournalEntry) {
        debug!("Storage disabled, discarding {}", entry.label());
    }
}

/// Journal that keeps everything in memory; used for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    pub fn readings(&self) -> Vec<SensorReadingRecord> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Reading(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<SystemEvent> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Event(ev) => Some(ev.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn cycle_records(&self) -> Vec<DecisionCycleRecord> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                JournalEntry::Cycle(records) => Some(records.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Journal for MemoryJournal {
    fn submit(&self, entry: JournalEntry) {
        self.entries.lock().push(entry);
    }
}
