// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Geo-risk classification.
//!
//! The hub never trains anything; it loads a (classifier, scaler) pair exported
//! by the training pipeline as JSON and evaluates it per POI.

mod scaler;
mod tree;
mod logistic;
mod artifacts;

pub use scaler::FeatureScaler;
pub use tree::{TreeEnsemble, TreeNode, DecisionTree};
pub use logistic::LogisticModel;
pub use artifacts::{ArtifactManager, ReloadOutcome, RiskArtifacts};

use std::fmt;
use std::path::PathBuf;
use nalgebra::SVector;
use serde::Deserialize;
use thiserror::Error;

/// Number of model inputs
pub const FEATURE_COUNT: usize = 6;

/// Model inputs, in the order the classifier was trained on
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "longitude",
    "latitude",
    "elevation",
    "distance_to_river",
    "slope",
    "curvature",
];

/// Artifact format understood by this build
pub const FORMAT_VERSION: u32 = 1;

/// One POI's model inputs
pub type FeatureVector = SVector<f64, FEATURE_COUNT>;

/// Something that turns scaled features into a flood probability
pub trait FloodClassifier: fmt::Debug + Send + Sync {
    /// Probability of the positive (flooded) class, in `[0, 1]`
    fn predict(&self, features: &FeatureVector) -> f64;

    /// Short name for logs
    fn kind(&self) -> &'static str;
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact file {0:?} not found")]
    Missing(PathBuf),

    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported artifact format version {0} (expected {FORMAT_VERSION})")]
    UnsupportedVersion(u32),

    #[error("invalid artifact: {0}")]
    Invalid(String),
}

/// Model file: a version tag plus one model kind
#[derive(Debug, Deserialize)]
struct ModelDocument {
    format_version: u32,
    #[serde(flatten)]
    model: ModelSpec,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelSpec {
    TreeEnsemble(TreeEnsemble),
    Logistic(LogisticModel),
}

/// Parse and validate a model document
pub fn parse_model(text: &str, path: &std::path::Path) -> Result<Box<dyn FloodClassifier>, ArtifactError> {
    let document: ModelDocument = serde_json::from_str(text).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if document.format_version != FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedVersion(document.format_version));
    }

    match document.model {
        ModelSpec::TreeEnsemble(model) => {
            model.validate()?;
            Ok(Box::new(model))
        }
        ModelSpec::Logistic(model) => {
            model.validate()?;
            Ok(Box::new(model))
        }
    }
}

pub(crate) fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_logistic_document() {
        let model = parse_model(
            r#"{"format_version":1,"kind":"logistic","intercept":0.0,"coefficients":[0,0,0,0,0,0]}"#,
            Path::new("model.json"),
        )
        .unwrap();
        assert_eq!(model.kind(), "logistic");
        assert!((model.predict(&FeatureVector::zeros()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unknown_version_and_kind() {
        let err = parse_model(
            r#"{"format_version":2,"kind":"logistic","intercept":0.0,"coefficients":[0,0,0,0,0,0]}"#,
            Path::new("model.json"),
        )
        .unwrap_err();
        assert!(matches!(err, ArtifactError::UnsupportedVersion(2)));

        let err = parse_model(r#"{"format_version":1,"kind":"svm"}"#, Path::new("model.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
    }
}
