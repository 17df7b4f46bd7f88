// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Detection module - periodic flood risk decision cycle

pub mod rules;

pub use rules::AnalysisPlan;

use std::sync::Arc;
use std::time::Instant;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::DecisionConfig;
use crate::core::HubContext;
use crate::db::{DecisionCycleRecord, Journal, JournalEntry};
use crate::impact::{ImpactAssessor, ImpactReport};
use crate::ml::{ArtifactManager, ReloadOutcome, RiskArtifacts};
use crate::poi::PointOfInterest;
use crate::sensors::{RainIntensity, SensorView, WaterLevel};
use crate::streaming::{AlertPublisher, PublishOutcome, SystemRisk};

/// Result of one POI in a detailed cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PoiAssessment {
    pub poi_name: String,
    pub geo_probability: f64,
    pub geo_risk_high: bool,
    pub sensor_alert: bool,
    pub combined_high: bool,
    pub status: String,
    /// Present only for combined-high POIs
    pub impact: Option<ImpactReport>,
}

/// Decision reached in one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleDecision {
    pub critical_override: bool,
    pub plan: AnalysisPlan,
    pub assessments: Vec<PoiAssessment>,
    pub system_risk: SystemRisk,
    pub publish: PublishOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No classifier loaded; nothing was decided or published
    Skipped,
    Decided(CycleDecision),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub outcome: CycleOutcome,
}

/// Fuses sensor state, geo risk and impact into one command per cycle
pub struct DecisionEngine {
    config: DecisionConfig,
    context: Arc<HubContext>,
    artifacts: Arc<ArtifactManager>,
    assessor: ImpactAssessor,
    pois: Vec<PointOfInterest>,
    publisher: AlertPublisher,
    journal: Arc<dyn Journal>,
    reload: Option<JoinHandle<ReloadOutcome>>,
    empty_pois_logged: bool,
}

impl DecisionEngine {
    pub fn new(
        config: DecisionConfig,
        context: Arc<HubContext>,
        artifacts: Arc<ArtifactManager>,
        assessor: ImpactAssessor,
        pois: Vec<PointOfInterest>,
        publisher: AlertPublisher,
        journal: Arc<dyn Journal>,
    ) -> Self {
        Self {
            config,
            context,
            artifacts,
            assessor,
            pois,
            publisher,
            journal,
            reload: None,
            empty_pois_logged: false,
        }
    }

    /// Run cycles on a fixed timer until shutdown. A cycle interrupted by
    /// shutdown is abandoned without persisting anything.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.config.cycle_interval();
        info!("Decision loop started ({:?} cycle)", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }

            tokio::select! {
                _ = self.run_cycle(Utc::now()) => {}
                _ = shutdown.recv() => {
                    info!("Shutdown during cycle, discarding partial results");
                    break;
                }
            }
        }

        if let Some(reload) = self.reload.take() {
            reload.abort();
        }
        info!("Decision loop stopped");
    }

    /// One full decision cycle at `now`
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        let cycle = self.context.counters().record_cycle();
        debug!("Cycle {} started", cycle);

        self.schedule_reload();

        let Some(artifacts) = self.artifacts.current() else {
            error!("Cycle {}: classifier not loaded, skipping", cycle);
            return CycleReport { cycle, timestamp: now, outcome: CycleOutcome::Skipped };
        };

        let snapshot = self.context.snapshot();
        let window = self.config.staleness_window();
        let water: SensorView<WaterLevel> = SensorView::from_state(snapshot.water.as_ref(), now, window);
        let rain: SensorView<RainIntensity> = SensorView::from_state(snapshot.rain.as_ref(), now, window);
        let critical = snapshot.critical.active;

        if critical {
            warn!(
                "Cycle {}: critical alert active (distance: {})",
                cycle,
                snapshot.critical.distance_cm.map_or("N/A".to_string(), |d| format!("{} cm", d))
            );
        }

        let mut plan = rules::plan_analysis(critical, &rain);
        if plan.is_detailed() && self.pois.is_empty() {
            if !self.empty_pois_logged {
                warn!("No points of interest configured, per-POI analysis disabled");
                self.empty_pois_logged = true;
            }
            plan = AnalysisPlan::Simplified("Simplified status: no points of interest".to_string());
        }

        let water_label = water.status_label();
        let rain_label = rain.status_label();

        let (assessments, records) = match &plan {
            AnalysisPlan::Detailed => self.assess_pois(&artifacts, &water, &rain, now),
            AnalysisPlan::Simplified(status) => {
                info!("Cycle {}: {}", cycle, status);
                let records = self
                    .pois
                    .iter()
                    .map(|poi| DecisionCycleRecord {
                        timestamp: now,
                        poi_name: poi.name.clone(),
                        longitude: poi.longitude,
                        latitude: poi.latitude,
                        geo_probability: None,
                        geo_risk_high: None,
                        water_category: water_label.clone(),
                        rain_category: rain_label.clone(),
                        combined_status: status.clone(),
                        buffer_radius_m: None,
                        impact_buildings: None,
                        impact_roads: None,
                        impact_rivers: None,
                    })
                    .collect();
                (Vec::new(), records)
            }
        };

        let any_combined = assessments.iter().any(|a| a.combined_high);
        let system_risk = SystemRisk::from_high(critical || any_combined);

        let publish = self.publisher.publish(system_risk, now).await;

        if !records.is_empty() {
            self.journal.submit(JournalEntry::Cycle(records));
        }

        let high_pois = assessments.iter().filter(|a| a.combined_high).count();
        let sensors = format!(
            "water: {} [{}], rain: {} [{}]",
            water.freshness.as_str(),
            water.display_label(),
            rain.freshness.as_str(),
            rain.display_label()
        );
        match system_risk {
            SystemRisk::High => warn!(
                "Cycle {} decision HIGH (critical: {}, high-risk POIs: {}; {})",
                cycle, critical, high_pois, sensors
            ),
            SystemRisk::Normal => info!("Cycle {} decision normal ({})", cycle, sensors),
        }

        CycleReport {
            cycle,
            timestamp: now,
            outcome: CycleOutcome::Decided(CycleDecision {
                critical_override: critical,
                plan,
                assessments,
                system_risk,
                publish,
            }),
        }
    }

    fn assess_pois(
        &self,
        artifacts: &RiskArtifacts,
        water: &SensorView<WaterLevel>,
        rain: &SensorView<RainIntensity>,
        now: DateTime<Utc>,
    ) -> (Vec<PoiAssessment>, Vec<DecisionCycleRecord>) {
        let water_fresh = water.fresh_category();
        let sensor_alert = rules::sensor_alert(water_fresh, rain.fresh_category());
        let radius = rules::buffer_radius(water_fresh, &self.config.buffer_radii);
        let conditions = format!("water: {}, rain: {}", water.status_label(), rain.status_label());

        let mut assessments = Vec::with_capacity(self.pois.len());
        let mut records = Vec::with_capacity(self.pois.len());

        for poi in &self.pois {
            let probability = artifacts.predict(&poi.features());
            let geo_risk_high = rules::is_geo_risk_high(probability, self.config.prediction_threshold);
            let combined_high = rules::combined_high(geo_risk_high, sensor_alert);
            let status = format!("{} ({})", rules::poi_status(geo_risk_high, sensor_alert), conditions);

            let impact = if combined_high {
                let report = self.assessor.assess_all(poi, radius);
                warn!(
                    "{}: HIGH RISK (p={:.4}); {}; {}; {}",
                    poi.name, probability, report.buildings, report.roads, report.rivers
                );
                Some(report)
            } else {
                debug!("{}: {} (p={:.4})", poi.name, status, probability);
                None
            };

            records.push(DecisionCycleRecord {
                timestamp: now,
                poi_name: poi.name.clone(),
                longitude: poi.longitude,
                latitude: poi.latitude,
                geo_probability: Some(probability),
                geo_risk_high: Some(geo_risk_high),
                water_category: water.status_label(),
                rain_category: rain.status_label(),
                combined_status: status.clone(),
                buffer_radius_m: impact.as_ref().map(|r| r.radius_m),
                impact_buildings: impact.as_ref().map(|r| r.buildings.to_string()),
                impact_roads: impact.as_ref().map(|r| r.roads.to_string()),
                impact_rivers: impact.as_ref().map(|r| r.rivers.to_string()),
            });

            assessments.push(PoiAssessment {
                poi_name: poi.name.clone(),
                geo_probability: probability,
                geo_risk_high,
                sensor_alert,
                combined_high,
                status,
                impact,
            });
        }

        (assessments, records)
    }

    /// Start a background freshness check when one is due. A check still
    /// running from an earlier cycle suppresses a new one.
    fn schedule_reload(&mut self) {
        if let Some(handle) = &self.reload {
            if !handle.is_finished() {
                return;
            }
        }
        if !self.artifacts.check_due(Instant::now()) {
            return;
        }

        let artifacts = self.artifacts.clone();
        self.reload = Some(tokio::task::spawn_blocking(move || artifacts.reload_if_newer()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactConfig;
    use crate::db::MemoryJournal;
    use crate::poi::default_pois;
    use crate::sensors::{CriticalAlertState, SensorState};
    use crate::spatial::GeoLayers;
    use crate::streaming::{CommandSink, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CapturingSink {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl CommandSink for CapturingSink {
        fn is_connected(&self) -> bool {
            true
        }

        async fn publish(&self, _topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
            self.sent.lock().push(payload);
            Ok(())
        }
    }

    struct Harness {
        engine: DecisionEngine,
        context: Arc<HubContext>,
        journal: Arc<MemoryJournal>,
        sink: Arc<CapturingSink>,
        dir: TempDir,
    }

    fn write_artifacts(dir: &Path, probability: f64) -> ArtifactConfig {
        let intercept = (probability / (1.0 - probability)).ln();
        let model_path = dir.join("model.json");
        let scaler_path = dir.join("scaler.json");
        std::fs::write(
            &model_path,
            format!(
                r#"{{"format_version":1,"kind":"logistic","intercept":{},"coefficients":[0,0,0,0,0,0]}}"#,
                intercept
            ),
        )
        .unwrap();
        std::fs::write(&scaler_path, r#"{"format_version":1,"mean":[0,0,0,0,0,0],"scale":[1,1,1,1,1,1]}"#)
            .unwrap();
        ArtifactConfig { model_path, scaler_path, check_interval_secs: 3600 }
    }

    fn harness(probability: f64, pois: Vec<PointOfInterest>) -> Harness {
        let dir = TempDir::new().unwrap();
        let artifacts = Arc::new(ArtifactManager::new(write_artifacts(dir.path(), probability)));
        artifacts.load().unwrap();

        let context = Arc::new(HubContext::new());
        let journal = Arc::new(MemoryJournal::new());
        let sink = Arc::new(CapturingSink::default());
        let publisher = AlertPublisher::new(sink.clone(), "cmd", context.clone(), journal.clone());

        let engine = DecisionEngine::new(
            DecisionConfig::default(),
            context.clone(),
            artifacts,
            ImpactAssessor::new(Arc::new(GeoLayers::default())),
            pois,
            publisher,
            journal.clone(),
        );

        Harness { engine, context, journal, sink, dir }
    }

    fn set_sensors(context: &HubContext, water: &str, rain: &str, at: DateTime<Utc>) {
        use crate::sensors::Category;
        context.update_water(SensorState {
            category: WaterLevel::from_label(water),
            label: water.to_string(),
            raw_payload: serde_json::json!({ "level_category": water }),
            last_seen: at,
        });
        context.update_rain(SensorState {
            category: RainIntensity::from_label(rain),
            label: rain.to_string(),
            raw_payload: serde_json::json!({ "intensity_category": rain }),
            last_seen: at,
        });
    }

    fn decision(report: &CycleReport) -> &CycleDecision {
        match &report.outcome {
            CycleOutcome::Decided(d) => d,
            CycleOutcome::Skipped => panic!("cycle was skipped"),
        }
    }

    #[tokio::test]
    async fn test_high_risk_cycle() {
        let mut h = harness(0.05, default_pois());
        let now = Utc::now();
        set_sensors(&h.context, "Alto", "Pesada", now);

        let report = h.engine.run_cycle(now).await;
        let d = decision(&report);

        assert_eq!(report.cycle, 1);
        assert!(d.plan.is_detailed());
        assert_eq!(d.system_risk, SystemRisk::High);
        assert_eq!(d.assessments.len(), 4);
        for a in &d.assessments {
            assert!(a.combined_high);
            assert!(a.status.starts_with("HIGH RISK"));
            let impact = a.impact.as_ref().unwrap();
            assert_eq!(impact.radius_m, 500.0);
            assert_eq!(impact.buildings.to_string(), "Building data unavailable.");
        }

        assert_eq!(h.sink.sent.lock()[0], br#"{"system_risk":"high"}"#.to_vec());
        let records = h.journal.cycle_records();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].buffer_radius_m, Some(500.0));
        assert_eq!(records[0].water_category, "Alto");
        assert_eq!(h.context.counters().alerts_sent(), 1);
    }

    #[tokio::test]
    async fn test_geo_high_without_sensor_alert() {
        let mut h = harness(0.05, default_pois());
        let now = Utc::now();
        set_sensors(&h.context, "Baixo", "Leve", now);

        let report = h.engine.run_cycle(now).await;
        let d = decision(&report);
        assert_eq!(d.system_risk, SystemRisk::Normal);
        assert!(d.assessments.iter().all(|a| a.geo_risk_high && !a.combined_high));
        assert!(d.assessments[0].status.starts_with("GEO RISK HIGH, CURRENT CONDITIONS OK"));
        assert!(d.assessments.iter().all(|a| a.impact.is_none()));
    }

    #[tokio::test]
    async fn test_low_geo_risk() {
        let mut h = harness(0.01, default_pois());
        let now = Utc::now();
        set_sensors(&h.context, "Alto", "Pesada", now);

        let report = h.engine.run_cycle(now).await;
        let d = decision(&report);
        assert_eq!(d.system_risk, SystemRisk::Normal);
        assert!(d.assessments.iter().all(|a| a.status.starts_with("LOW RISK")));
        assert_eq!(h.context.counters().alerts_sent(), 0);
    }

    #[tokio::test]
    async fn test_stale_water_ignored() {
        let mut h = harness(0.05, default_pois());
        let now = Utc::now();
        set_sensors(&h.context, "Alto", "Leve", now - chrono::Duration::seconds(60));
        // Fresh rain, stale water.
        h.context.update_rain(SensorState {
            category: Some(RainIntensity::Light),
            label: "Leve".into(),
            raw_payload: serde_json::json!({}),
            last_seen: now,
        });

        let report = h.engine.run_cycle(now).await;
        let d = decision(&report);
        assert!(d.plan.is_detailed());
        assert_eq!(d.system_risk, SystemRisk::Normal);
        assert_eq!(h.journal.cycle_records()[0].water_category, "stale");
    }

    #[tokio::test]
    async fn test_no_rain_is_simplified() {
        let mut h = harness(0.05, default_pois());
        let now = Utc::now();
        set_sensors(&h.context, "Alto", "Nenhuma", now);

        let report = h.engine.run_cycle(now).await;
        let d = decision(&report);
        assert!(!d.plan.is_detailed());
        assert!(d.assessments.is_empty());
        assert_eq!(d.system_risk, SystemRisk::Normal);

        let records = h.journal.cycle_records();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.geo_probability.is_none()));
    }

    #[tokio::test]
    async fn test_critical_forces_high() {
        let mut h = harness(0.01, default_pois());
        let now = Utc::now();
        h.context.set_critical(CriticalAlertState {
            active: true,
            distance_cm: Some(12.0),
            details: None,
        });

        let report = h.engine.run_cycle(now).await;
        let d = decision(&report);
        assert!(d.critical_override);
        assert_eq!(d.system_risk, SystemRisk::High);
        match &d.plan {
            AnalysisPlan::Simplified(msg) => assert!(msg.starts_with("CRITICAL ALERT ACTIVE")),
            AnalysisPlan::Detailed => panic!("no rain data, detail must be skipped"),
        }
    }

    #[tokio::test]
    async fn test_repeated_cycle_is_stable() {
        let mut h = harness(0.05, default_pois());
        let now = Utc::now();
        set_sensors(&h.context, "Medio", "Moderada", now);

        let first = h.engine.run_cycle(now).await;
        let second = h.engine.run_cycle(now).await;
        let probabilities = |r: &CycleReport| -> Vec<(f64, bool)> {
            decision(r).assessments.iter().map(|a| (a.geo_probability, a.geo_risk_high)).collect()
        };
        assert_eq!(probabilities(&first), probabilities(&second));
        assert_eq!(second.cycle, 2);
    }

    #[tokio::test]
    async fn test_missing_artifacts_skip_cycle() {
        let mut h = harness(0.05, default_pois());
        std::fs::remove_file(h.dir.path().join("model.json")).unwrap();
        assert_eq!(h.engine.artifacts.reload_if_newer(), ReloadOutcome::Invalidated);

        let report = h.engine.run_cycle(Utc::now()).await;
        assert_eq!(report.outcome, CycleOutcome::Skipped);
        assert!(h.sink.sent.lock().is_empty());
        assert!(h.journal.entries().is_empty());
        assert_eq!(h.context.counters().cycles_executed(), 1);
    }

    #[tokio::test]
    async fn test_artifact_directory_removed_with_harness() {
        let h = harness(0.05, default_pois());
        let root = h.dir.path().to_path_buf();
        assert!(root.join("scaler.json").exists());
        drop(h);
        assert!(!root.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_cycle_interval_keeps_deciding() {
        let mut h = harness(0.05, default_pois());
        h.engine.config.cycle_interval_secs = 0;
        let (tx, rx) = broadcast::channel(1);

        let task = tokio::spawn(h.engine.run(rx));
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        tx.send(()).unwrap();

        task.await.unwrap();
        assert!(h.context.counters().cycles_executed() >= 2);
    }

    #[tokio::test]
    async fn test_empty_poi_set() {
        let mut h = harness(0.05, Vec::new());
        let now = Utc::now();
        set_sensors(&h.context, "Alto", "Pesada", now);

        let report = h.engine.run_cycle(now).await;
        let d = decision(&report);
        assert!(!d.plan.is_detailed());
        assert_eq!(d.system_risk, SystemRisk::Normal);
        assert!(h.engine.empty_pois_logged);
        assert!(h.journal.cycle_records().is_empty());
    }
}
