// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Periodic hub status snapshots

use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::HubContext;
use crate::db::{HubStatus, Journal, JournalEntry};

/// Persists `HubCounters` on its own timer
pub struct TelemetryRecorder {
    context: Arc<HubContext>,
    journal: Arc<dyn Journal>,
    period: Duration,
}

impl TelemetryRecorder {
    pub fn new(context: Arc<HubContext>, journal: Arc<dyn Journal>, period: Duration) -> Self {
        Self { context, journal, period }
    }

    /// Take and persist one snapshot
    pub fn record(&self) -> HubStatus {
        let status = self.context.counters().status(Utc::now());
        info!(
            "Hub status: up {:.0}s, {} cycles, {} messages, {} alerts",
            status.uptime_secs, status.cycles_executed, status.messages_received, status.alerts_sent
        );
        self.journal.submit(JournalEntry::Status(status));
        status
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.period.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the first snapshot is one period in.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.record();
                }
                _ = shutdown.recv() => {
                    debug!("Telemetry recorder stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryJournal;

    #[test]
    fn test_record_submits_status() {
        let context = Arc::new(HubContext::new());
        let journal = Arc::new(MemoryJournal::new());
        context.counters().record_cycle();
        context.counters().record_message();

        let recorder = TelemetryRecorder::new(context, journal.clone(), Duration::from_secs(300));
        let status = recorder.record();

        assert_eq!(status.cycles_executed, 1);
        assert_eq!(status.messages_received, 1);
        assert!(matches!(journal.entries()[0], JournalEntry::Status(s) if s == status));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_one_period_then_stops() {
        let context = Arc::new(HubContext::new());
        let journal = Arc::new(MemoryJournal::new());
        let (tx, rx) = broadcast::channel(1);

        let recorder = TelemetryRecorder::new(context, journal.clone(), Duration::from_secs(300));
        let task = tokio::spawn(recorder.run(rx));

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(journal.entries().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(journal.entries().len(), 1);

        tx.send(()).unwrap();
        task.await.unwrap();
    }
}
