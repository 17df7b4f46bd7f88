// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Points of interest and their precomputed terrain features

use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ml::FeatureVector;

/// A monitored location. Coordinates are WGS84 degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: f64,
    pub distance_to_river: f64,
    pub slope: f64,
    pub curvature: f64,
}

impl PointOfInterest {
    /// Model inputs in training order
    pub fn features(&self) -> FeatureVector {
        FeatureVector::from([
            self.longitude,
            self.latitude,
            self.elevation,
            self.distance_to_river,
            self.slope,
            self.curvature,
        ])
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PoiFile {
    #[serde(default)]
    poi: Vec<PointOfInterest>,
}

/// Porto Alegre monitoring points used when no table is configured
pub fn default_pois() -> Vec<PointOfInterest> {
    let poi = |name: &str, lon, lat, elevation, distance_to_river, slope, curvature| PointOfInterest {
        name: name.to_string(),
        longitude: lon,
        latitude: lat,
        elevation,
        distance_to_river,
        slope,
        curvature,
    };

    vec![
        poi("POI 1 (Praça da Alfândega - downtown)", -51.230, -30.030, 10.0, 100.0, 9.1909, -0.004756),
        poi("POI 2 (Morro Santana - east)", -51.130, -30.050, 150.0, 5000.0, 35.0807, -0.004866),
        poi("POI 3 (Gasômetro - riverside)", -51.240, -30.025, 5.0, 20.0, 0.0, 0.0),
        poi("POI 4 (PUCRS Events Center - higher ground)", -51.180, -30.058, 40.0, 1500.0, 6.7170, 0.002717),
    ]
}

/// Load the POI table; a missing file yields the built-in set
pub fn load_pois(path: &Path) -> Result<Vec<PointOfInterest>> {
    if !path.exists() {
        info!("POI table {:?} not found, using built-in points", path);
        return Ok(default_pois());
    }

    let content = std::fs::read_to_string(path).with_context(|| format!("reading POI table {:?}", path))?;
    let file: PoiFile = toml::from_str(&content).with_context(|| format!("parsing POI table {:?}", path))?;

    let total = file.poi.len();
    let pois: Vec<PointOfInterest> = file
        .poi
        .into_iter()
        .filter(|p| {
            let ok = p.features().iter().all(|v| v.is_finite());
            if !ok {
                warn!("Skipping POI '{}' with non-finite features", p.name);
            }
            ok
        })
        .collect();

    info!("Loaded {} of {} POIs from {:?}", pois.len(), total, path);
    Ok(pois)
}
