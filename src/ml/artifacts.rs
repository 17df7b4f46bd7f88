// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Classifier + scaler pair with modification-time hot reload

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use super::{parse_model, ArtifactError, FeatureScaler, FeatureVector, FloodClassifier};
use crate::config::ArtifactConfig;

/// A loaded, mutually consistent (classifier, scaler) pair
#[derive(Debug)]
pub struct RiskArtifacts {
    classifier: Box<dyn FloodClassifier>,
    scaler: FeatureScaler,
    model_mtime: SystemTime,
}

impl RiskArtifacts {
    /// Read both files; either both load or neither does
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ArtifactError> {
        for path in [model_path, scaler_path] {
            if !path.exists() {
                return Err(ArtifactError::Missing(path.to_path_buf()));
            }
        }

        let model_mtime = modified(model_path)?;
        let classifier = parse_model(&read(model_path)?, model_path)?;
        let scaler = FeatureScaler::parse(&read(scaler_path)?, scaler_path)?;

        Ok(Self { classifier, scaler, model_mtime })
    }

    /// Scale raw features and return the flood probability
    pub fn predict(&self, raw: &FeatureVector) -> f64 {
        self.classifier.predict(&self.scaler.transform(raw))
    }

    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    pub fn model_mtime(&self) -> SystemTime {
        self.model_mtime
    }
}

fn read(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| ArtifactError::Io { path: path.to_path_buf(), source })
}

fn modified(path: &Path) -> Result<SystemTime, ArtifactError> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ArtifactError::Io { path: path.to_path_buf(), source })
}

/// Result of a freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Loaded pair is still current
    Unchanged,
    Reloaded,
    /// Reload failed; no pair is loaded now
    Invalidated,
}

/// Owns the current artifact pair.
///
/// The pair is swapped as one `Arc`, so a cycle that already holds it keeps a
/// consistent model even while a reload runs.
pub struct ArtifactManager {
    config: ArtifactConfig,
    current: RwLock<Option<Arc<RiskArtifacts>>>,
    last_check: Mutex<Option<Instant>>,
}

impl ArtifactManager {
    pub fn new(config: ArtifactConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
            last_check: Mutex::new(None),
        }
    }

    /// Initial load; the caller treats failure as fatal
    pub fn load(&self) -> Result<(), ArtifactError> {
        *self.last_check.lock() = Some(Instant::now());

        let artifacts = RiskArtifacts::load(&self.config.model_path, &self.config.scaler_path)?;
        info!(
            "Loaded {} classifier from {:?} and scaler from {:?}",
            artifacts.classifier_kind(),
            self.config.model_path,
            self.config.scaler_path
        );
        *self.current.write() = Some(Arc::new(artifacts));
        Ok(())
    }

    /// Currently loaded pair, if any
    pub fn current(&self) -> Option<Arc<RiskArtifacts>> {
        self.current.read().clone()
    }

    /// True (and resets the timer) when the check interval has elapsed at `now`
    pub fn check_due(&self, now: Instant) -> bool {
        let mut last = self.last_check.lock();
        let due = match *last {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.config.check_interval(),
        };
        if due {
            *last = Some(now);
        }
        due
    }

    /// Reload both files if the model file is newer than the loaded pair, or
    /// if nothing is loaded. Any failure clears the pair.
    pub fn reload_if_newer(&self) -> ReloadOutcome {
        debug!("Checking artifacts for updates");

        let disk_mtime = match modified(&self.config.model_path) {
            Ok(mtime) if self.config.scaler_path.exists() => mtime,
            Ok(_) => {
                return self.invalidate(ArtifactError::Missing(self.config.scaler_path.clone()));
            }
            Err(_) => {
                return self.invalidate(ArtifactError::Missing(self.config.model_path.clone()));
            }
        };

        let stale = match self.current() {
            None => true,
            Some(loaded) => disk_mtime > loaded.model_mtime(),
        };
        if !stale {
            return ReloadOutcome::Unchanged;
        }

        match RiskArtifacts::load(&self.config.model_path, &self.config.scaler_path) {
            Ok(artifacts) => {
                info!("Artifacts reloaded ({} classifier)", artifacts.classifier_kind());
                *self.current.write() = Some(Arc::new(artifacts));
                ReloadOutcome::Reloaded
            }
            Err(e) => self.invalidate(e),
        }
    }

    fn invalidate(&self, reason: ArtifactError) -> ReloadOutcome {
        error!("Artifact reload failed, classification disabled until next good reload: {}", reason);
        *self.current.write() = None;
        ReloadOutcome::Invalidated
    }
}
