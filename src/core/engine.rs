// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Hub engine - startup, task wiring and shutdown

use std::future::Future;
use std::sync::Arc;
use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{HubContext, TelemetryRecorder};
use crate::config::{Config, DatabaseConfig};
use crate::db::{Database, Journal, NullJournal, Recorder};
use crate::detection::DecisionEngine;
use crate::impact::ImpactAssessor;
use crate::ml::ArtifactManager;
use crate::poi::load_pois;
use crate::sensors::Ingestor;
use crate::spatial::GeoLayers;
use crate::streaming::{AlertPublisher, CommandSink, MqttClient};

/// Persistence as seen by the rest of the hub
struct Storage {
    journal: Arc<dyn Journal>,
    db: Option<Arc<Database>>,
    worker: Option<JoinHandle<()>>,
}

impl Storage {
    /// Storage problems never stop the hub; it runs without persistence instead
    fn open(config: &DatabaseConfig) -> Self {
        if !config.enabled {
            info!("Database disabled, records will not be persisted");
            return Self::disabled();
        }

        match Database::open(config) {
            Ok(db) => {
                let db = Arc::new(db);
                let (recorder, worker) = Recorder::spawn(db.clone(), config.queue_capacity);
                Self {
                    journal: Arc::new(recorder),
                    db: Some(db),
                    worker: Some(worker),
                }
            }
            Err(e) => {
                warn!("Could not open database {:?}, continuing without persistence: {:#}", config.path, e);
                Self::disabled()
            }
        }
    }

    fn disabled() -> Self {
        Self {
            journal: Arc::new(NullJournal),
            db: None,
            worker: None,
        }
    }
}

/// Main FloodHub engine
pub struct Engine {
    config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until Ctrl+C
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Start every task, wait for `stop`, then shut down in order
    pub async fn run_until<F>(self, stop: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let config = self.config;
        info!("Starting FloodHub engine...");

        let storage = Storage::open(&config.database);
        if let Some(db) = &storage.db {
            match db.latest_training_run() {
                Ok(Some(run)) => info!(
                    "Latest training run {} (model: {}, threshold: {})",
                    run.timestamp,
                    run.model_file.as_deref().unwrap_or("N/A"),
                    run.threshold.map_or("N/A".to_string(), |t| t.to_string())
                ),
                Ok(None) => info!("No training runs recorded"),
                Err(e) => warn!("Could not read training runs: {:#}", e),
            }
        }

        let artifacts = Arc::new(ArtifactManager::new(config.artifacts.clone()));
        artifacts.load().context("loading classifier artifacts")?;

        let geo_config = config.geo.clone();
        let layers = tokio::task::spawn_blocking(move || GeoLayers::load(&geo_config))
            .await
            .context("geo layer loader panicked")?;
        info!("{} of 3 geo layers loaded", layers.loaded_count());

        let pois = load_pois(&config.pois_path)?;
        if let Some(db) = &storage.db {
            if let Err(e) = db.upsert_pois(&pois) {
                warn!("Could not store POI table: {:#}", e);
            }
        }

        let context = Arc::new(HubContext::new());

        let (mqtt, eventloop) = MqttClient::connect(&config.mqtt)
            .await
            .context("connecting to MQTT broker")?;
        mqtt.subscribe_all().await.context("subscribing to sensor topics")?;
        let mqtt = Arc::new(mqtt);

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let mut tasks: Vec<(&str, JoinHandle<()>)> = Vec::new();

        let ingestor = Ingestor::new(context.clone(), storage.journal.clone(), config.mqtt.topics.clone());
        tasks.push((
            "mqtt",
            mqtt.spawn_event_loop(eventloop, ingestor, config.mqtt.reconnect_delay(), shutdown_tx.subscribe()),
        ));

        let sink: Arc<dyn CommandSink> = mqtt.clone();
        let publisher = AlertPublisher::new(
            sink,
            config.mqtt.topics.command.clone(),
            context.clone(),
            storage.journal.clone(),
        );
        let decision = DecisionEngine::new(
            config.decision.clone(),
            context.clone(),
            artifacts,
            ImpactAssessor::new(Arc::new(layers)),
            pois,
            publisher,
            storage.journal.clone(),
        );
        tasks.push(("decision", tokio::spawn(decision.run(shutdown_tx.subscribe()))));

        let telemetry = TelemetryRecorder::new(
            context.clone(),
            storage.journal.clone(),
            config.decision.telemetry_interval(),
        );
        tasks.push(("telemetry", tokio::spawn(telemetry.run(shutdown_tx.subscribe()))));

        info!("FloodHub running, press Ctrl+C to shut down");
        stop.await;

        info!("Shutdown signal received, cleaning up...");
        let _ = shutdown_tx.send(());
        for (name, task) in tasks {
            if let Err(e) = task.await {
                warn!("{} task ended abnormally: {}", name, e);
            }
        }

        let Storage { journal, db, worker } = storage;
        drop(journal);
        drop(mqtt);
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Journal writer ended abnormally: {}", e);
            }
        }
        drop(db);

        let counters = context.counters();
        info!(
            "FloodHub stopped after {} cycles, {} messages, {} alerts",
            counters.cycles_executed(),
            counters.messages_received(),
            counters.alerts_sent()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{JournalEntry, SystemEvent};
    use chrono::Utc;

    #[test]
    fn test_disabled_storage_uses_null_journal() {
        let config = DatabaseConfig { enabled: false, ..DatabaseConfig::default() };
        let storage = Storage::open(&config);
        assert!(storage.db.is_none());
        assert!(storage.worker.is_none());
        storage.journal.submit(JournalEntry::Event(SystemEvent {
            timestamp: Utc::now(),
            event_type: "TEST".into(),
            origin: "HUB".into(),
            level: "info".into(),
            detail: None,
        }));
    }

    #[tokio::test]
    async fn test_storage_opens_and_drains() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            enabled: true,
            path: dir.path().join("hub.db"),
            queue_capacity: 16,
        };

        let Storage { journal, db, worker } = Storage::open(&config);
        let db = db.unwrap();
        journal.submit(JournalEntry::Status(HubContext::new().counters().status(Utc::now())));
        drop(journal);
        worker.unwrap().await.unwrap();

        assert_eq!(db.get_stats().unwrap().status_count, 1);
    }

    #[tokio::test]
    async fn test_missing_artifacts_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.enabled = false;
        config.artifacts.model_path = dir.path().join("missing-model.json");
        config.artifacts.scaler_path = dir.path().join("missing-scaler.json");

        let result = Engine::new(config).run_until(async {}).await;
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("loading classifier artifacts"));
    }
}
