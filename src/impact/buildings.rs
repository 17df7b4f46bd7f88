// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

use std::fmt;

use crate::spatial::Feature;

const SCHOOL_AMENITIES: [&str; 4] = ["school", "kindergarten", "college", "university"];
const RESIDENTIAL_BUILDINGS: [&str; 8] = [
    "house",
    "apartments",
    "residential",
    "detached",
    "semidetached_house",
    "terrace",
    "bungalow",
    "cabin",
];
const COMMERCIAL_BUILDINGS: [&str; 3] = ["commercial", "retail", "office"];

/// Buildings within the buffer. Category tallies overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingImpact {
    pub radius_m: f64,
    pub count: usize,
    pub hospitals: usize,
    pub schools: usize,
    pub residential: usize,
    pub commercial: usize,
}

impl BuildingImpact {
    pub fn summarize(hits: &[&Feature], radius_m: f64) -> Self {
        let mut impact = Self {
            radius_m,
            count: hits.len(),
            hospitals: 0,
            schools: 0,
            residential: 0,
            commercial: 0,
        };

        for feature in hits {
            let amenity = feature.tags.get("amenity");
            let building = feature.tags.get("building");

            if amenity == Some("hospital") {
                impact.hospitals += 1;
            }
            if amenity.is_some_and(|a| SCHOOL_AMENITIES.contains(&a)) {
                impact.schools += 1;
            }
            if building.is_some_and(|b| RESIDENTIAL_BUILDINGS.contains(&b)) {
                impact.residential += 1;
            }
            if building.is_some_and(|b| COMMERCIAL_BUILDINGS.contains(&b))
                || feature.tags.get("shop").is_some()
                || feature.tags.get("office").is_some()
            {
                impact.commercial += 1;
            }
        }

        impact
    }
}

impl fmt::Display for BuildingImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = [
            ("Hospitals", self.hospitals),
            ("Schools", self.schools),
            ("Residential", self.residential),
            ("Commercial/Services", self.commercial),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{}: {}", label, n))
        .collect();

        let types = if types.is_empty() {
            "no specific types counted".to_string()
        } else {
            types.join(", ")
        };
        write!(f, "~{} buildings (radius: {}m) ({})", self.count, self.radius_m, types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{FeatureShape, FeatureTags};
    use geo::{polygon, MultiPolygon};

    fn building(tags: FeatureTags) -> Feature {
        Feature {
            shape: FeatureShape::Areal(MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)
            ]])),
            tags,
        }
    }

    #[test]
    fn test_categories_overlap() {
        let features = vec![
            building(FeatureTags::from([("amenity", "hospital"), ("building", "commercial")])),
            building(FeatureTags::from([("amenity", "school")])),
            building(FeatureTags::from([("building", "house"), ("shop", "bakery")])),
            building(FeatureTags::from([("building", "yes")])),
        ];
        let hits: Vec<&Feature> = features.iter().collect();
        let impact = BuildingImpact::summarize(&hits, 500.0);

        assert_eq!(impact.count, 4);
        assert_eq!(impact.hospitals, 1);
        assert_eq!(impact.schools, 1);
        assert_eq!(impact.residential, 1);
        assert_eq!(impact.commercial, 2);
        assert_eq!(
            impact.to_string(),
            "~4 buildings (radius: 500m) (Hospitals: 1, Schools: 1, Residential: 1, Commercial/Services: 2)"
        );
    }

    #[test]
    fn test_untyped_buildings() {
        let features = vec![building(FeatureTags::default())];
        let hits: Vec<&Feature> = features.iter().collect();
        assert_eq!(
            BuildingImpact::summarize(&hits, 200.0).to_string(),
            "~1 buildings (radius: 200m) (no specific types counted)"
        );
    }
}
