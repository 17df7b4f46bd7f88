// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

use std::fmt;

use super::Disc;
use crate::spatial::{Feature, FeatureShape};

const MAX_ROAD_TYPES: usize = 3;
const MAX_ROAD_NAMES: usize = 2;

/// Display name for an OSM `highway` value
fn highway_label(value: &str) -> String {
    let label = match value.to_ascii_lowercase().as_str() {
        "motorway" => "Motorway",
        "trunk" => "Trunk",
        "primary" => "Primary",
        "secondary" => "Secondary",
        "tertiary" => "Tertiary",
        "unclassified" => "Unclassified",
        "residential" => "Residential",
        "living_street" => "Living street",
        "service" => "Service",
        "track" => "Track",
        "path" => "Path",
        "cycleway" => "Cycleway",
        "footway" => "Footway",
        _ => return value.to_string(),
    };
    label.to_string()
}

/// Roads within the buffer
#[derive(Debug, Clone, PartialEq)]
pub struct RoadImpact {
    pub radius_m: f64,
    /// Length clipped to the buffer
    pub length_km: f64,
    /// Most frequent road types as (display name, segment count)
    pub top_types: Vec<(String, usize)>,
    pub named: Vec<String>,
    /// More distinct names exist than are listed
    pub more_named: bool,
    pub bridges: usize,
    pub tunnels: usize,
}

impl RoadImpact {
    pub fn summarize(hits: &[&Feature], disc: &Disc) -> Self {
        let mut length_m = 0.0;
        let mut type_counts: Vec<(String, usize)> = Vec::new();
        let mut names: Vec<&str> = Vec::new();
        let mut bridges = 0;
        let mut tunnels = 0;

        for feature in hits {
            if let FeatureShape::Lineal(lines) = &feature.shape {
                length_m += disc.clipped_length(lines);
            }

            if let Some(highway) = feature.tags.get("highway") {
                match type_counts.iter_mut().find(|(t, _)| t == highway) {
                    Some((_, n)) => *n += 1,
                    None => type_counts.push((highway.to_string(), 1)),
                }
            }
            if let Some(name) = feature.tags.get("name") {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            if feature.tags.is_yes("bridge") {
                bridges += 1;
            }
            if feature.tags.is_yes("tunnel") {
                tunnels += 1;
            }
        }

        // Stable: ties keep first-seen order
        type_counts.sort_by(|a, b| b.1.cmp(&a.1));
        let top_types = type_counts
            .into_iter()
            .take(MAX_ROAD_TYPES)
            .map(|(t, n)| (highway_label(&t), n))
            .collect();

        Self {
            radius_m: disc.radius,
            length_km: length_m / 1000.0,
            top_types,
            more_named: names.len() > MAX_ROAD_NAMES,
            named: names.into_iter().take(MAX_ROAD_NAMES).map(str::to_string).collect(),
            bridges,
            tunnels,
        }
    }
}

impl fmt::Display for RoadImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!("~{:.2} km of roads", self.length_km)];

        if !self.top_types.is_empty() {
            let types: Vec<String> = self.top_types.iter().map(|(t, n)| format!("{}({})", t, n)).collect();
            parts.push(format!("Types: {}", types.join(", ")));
        }
        if !self.named.is_empty() {
            parts.push(format!(
                "Named roads: {}{}",
                self.named.join(", "),
                if self.more_named { "..." } else { "" }
            ));
        }
        if self.bridges > 0 {
            parts.push(format!("{} bridge(s)", self.bridges));
        }
        if self.tunnels > 0 {
            parts.push(format!("{} tunnel(s)", self.tunnels));
        }

        write!(f, "{} (radius: {}m)", parts.join(", "), self.radius_m)
    }
}
