// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

use serde::Deserialize;

use super::{sigmoid, ArtifactError, FeatureVector, FloodClassifier, FEATURE_COUNT};

/// Linear model with logistic link
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: [f64; FEATURE_COUNT],
}

impl LogisticModel {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactError::Invalid("logistic model has non-finite weights".into()));
        }
        Ok(())
    }
}

impl FloodClassifier for LogisticModel {
    fn predict(&self, features: &FeatureVector) -> f64 {
        let weights = FeatureVector::from(self.coefficients);
        sigmoid(self.intercept + weights.dot(features))
    }

    fn kind(&self) -> &'static str {
        "logistic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intercept_only_probability() {
        let p: f64 = 0.05;
        let model = LogisticModel { intercept: (p / (1.0 - p)).ln(), coefficients: [0.0; 6] };
        let features = FeatureVector::from([-51.2, -30.0, 5.0, 120.0, 2.0, 0.1]);
        assert!((model.predict(&features) - p).abs() < 1e-12);
    }

    #[test]
    fn test_weights_apply_in_feature_order() {
        let model = LogisticModel { intercept: 0.0, coefficients: [0.0, 0.0, 0.0, -1.0, 0.0, 0.0] };
        let near = FeatureVector::from([0.0, 0.0, 0.0, -2.0, 0.0, 0.0]);
        let far = FeatureVector::from([0.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        assert!(model.predict(&near) > 0.5);
        assert!(model.predict(&far) < 0.5);
    }
}
