// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Feature standardization

use std::path::Path;
use serde::Deserialize;

use super::{ArtifactError, FeatureVector, FEATURE_COUNT, FORMAT_VERSION};

/// Per-feature `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    mean: FeatureVector,
    scale: FeatureVector,
}

#[derive(Debug, Deserialize)]
struct ScalerDocument {
    format_version: u32,
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl FeatureScaler {
    pub fn new(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Result<Self, ArtifactError> {
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(ArtifactError::Invalid("scaler mean must be finite".into()));
        }
        if let Some(i) = scale.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ArtifactError::Invalid(format!(
                "scaler scale[{}] must be finite and positive, got {}",
                i, scale[i]
            )));
        }

        Ok(Self {
            mean: FeatureVector::from(mean),
            scale: FeatureVector::from(scale),
        })
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, ArtifactError> {
        let document: ScalerDocument = serde_json::from_str(text).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if document.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(document.format_version));
        }

        Self::new(document.mean, document.scale)
    }

    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        (features - self.mean).component_div(&self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_standardizes() {
        let scaler = FeatureScaler::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [1.0, 2.0, 0.5, 1.0, 1.0, 10.0]).unwrap();
        let scaled = scaler.transform(&FeatureVector::from([2.0, 2.0, 4.0, 4.0, 5.0, 26.0]));
        assert_eq!(scaled, FeatureVector::from([1.0, 0.0, 2.0, 0.0, 0.0, 2.0]));
    }

    #[test]
    fn test_rejects_zero_scale() {
        let err = FeatureScaler::new([0.0; 6], [1.0, 1.0, 0.0, 1.0, 1.0, 1.0]).unwrap_err();
        assert!(err.to_string().contains("scale[2]"));
    }

    #[test]
    fn test_parse_document() {
        let scaler = FeatureScaler::parse(
            r#"{"format_version":1,"mean":[0,0,0,0,0,0],"scale":[1,1,1,1,1,1]}"#,
            Path::new("scaler.json"),
        )
        .unwrap();
        let x = FeatureVector::from([1.0, -2.0, 3.0, 0.5, 0.0, 7.0]);
        assert_eq!(scaler.transform(&x), x);

        assert!(FeatureScaler::parse(r#"{"format_version":1,"mean":[0,0],"scale":[1,1]}"#, Path::new("s")).is_err());
    }
}
