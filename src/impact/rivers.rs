// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

use std::fmt;

use crate::spatial::Feature;

const MAX_RIVER_NAMES: usize = 3;

/// Rivers and canals within the buffer
#[derive(Debug, Clone, PartialEq)]
pub struct RiverImpact {
    pub radius_m: f64,
    pub names: Vec<String>,
    pub more_names: bool,
    pub segments: usize,
    pub intermittent: bool,
    pub tunnel: bool,
}

impl RiverImpact {
    pub fn summarize(hits: &[&Feature], radius_m: f64) -> Self {
        let mut names: Vec<&str> = Vec::new();
        for feature in hits {
            if let Some(name) = feature.tags.get("name") {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        Self {
            radius_m,
            more_names: names.len() > MAX_RIVER_NAMES,
            names: names.into_iter().take(MAX_RIVER_NAMES).map(str::to_string).collect(),
            segments: hits.len(),
            intermittent: hits.iter().any(|f| f.tags.is_yes("intermittent")),
            tunnel: hits.iter().any(|f| f.tags.is_yes("tunnel")),
        }
    }
}

impl fmt::Display for RiverImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.names.is_empty() {
            parts.push(format!("{} unnamed river/canal segment(s)", self.segments));
        } else {
            parts.push(format!(
                "Stretches of: {}{}",
                self.names.join(", "),
                if self.more_names { "..." } else { "" }
            ));
        }
        if self.intermittent {
            parts.push("Contains intermittent stretch(es)".to_string());
        }
        if self.tunnel {
            parts.push("Contains culverted/tunnel stretch(es)".to_string());
        }

        write!(f, "{} affected (radius: {}m)", parts.join(", "), self.radius_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{FeatureShape, FeatureTags};
    use geo::{line_string, MultiLineString};

    fn river(tags: FeatureTags) -> Feature {
        Feature {
            shape: FeatureShape::Lineal(MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]])),
            tags,
        }
    }

    #[test]
    fn test_named_rivers() {
        let features = vec![
            river(FeatureTags::from([("name", "Arroio Dilúvio")])),
            river(FeatureTags::from([("name", "Arroio Dilúvio"), ("tunnel", "yes")])),
            river(FeatureTags::from([("name", "Guaíba")])),
        ];
        let hits: Vec<&Feature> = features.iter().collect();
        let impact = RiverImpact::summarize(&hits, 300.0);

        assert_eq!(impact.names.len(), 2);
        assert!(!impact.more_names);
        assert_eq!(
            impact.to_string(),
            "Stretches of: Arroio Dilúvio, Guaíba, Contains culverted/tunnel stretch(es) affected (radius: 300m)"
        );
    }

    #[test]
    fn test_unnamed_segments() {
        let features = vec![
            river(FeatureTags::from([("intermittent", "yes")])),
            river(FeatureTags::default()),
        ];
        let hits: Vec<&Feature> = features.iter().collect();
        assert_eq!(
            RiverImpact::summarize(&hits, 200.0).to_string(),
            "2 unnamed river/canal segment(s), Contains intermittent stretch(es) affected (radius: 200m)"
        );
    }

    #[test]
    fn test_name_limit() {
        let features: Vec<Feature> = ["A", "B", "C", "D"]
            .iter()
            .map(|n| river(FeatureTags::from([("name", *n)])))
            .collect();
        let hits: Vec<&Feature> = features.iter().collect();
        let impact = RiverImpact::summarize(&hits, 500.0);
        assert_eq!(impact.names, vec!["A", "B", "C"]);
        assert!(impact.to_string().starts_with("Stretches of: A, B, C..."));
    }
}
