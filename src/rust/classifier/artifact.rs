use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::ClassifierError;
use super::features::{FeatureExtractor, TfidfVectorizer};
use super::model::{LogisticRegression, ProbabilisticClassifier};
use crate::text::NormalizedText;
use crate::training::EvaluationMetrics;

/// Feature extractor and classifier produced by one training run.
///
/// Immutable once built. The constructor refuses unfitted components and
/// components whose dimensions disagree, so a torn pair cannot exist.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifactPair {
    version: String,
    trained_at: DateTime<Utc>,
    feature_extractor: TfidfVectorizer,
    classifier: LogisticRegression,
    metrics: EvaluationMetrics,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ModelArtifactPair>();
    }
};

impl ModelArtifactPair {
    pub fn new(
        version: impl Into<String>,
        trained_at: DateTime<Utc>,
        feature_extractor: TfidfVectorizer,
        classifier: LogisticRegression,
        metrics: EvaluationMetrics,
    ) -> Result<Self, ClassifierError> {
        let version = version.into();
        if version.is_empty() {
            return Err(ClassifierError::ValidationError("Artifact version cannot be empty".into()));
        }
        if !feature_extractor.is_fitted() || !classifier.is_fitted() {
            return Err(ClassifierError::NotFitted);
        }
        feature_extractor.validate()?;
        if feature_extractor.dimension() != classifier.input_dimension() {
            return Err(ClassifierError::ArtifactMismatch {
                extractor_dim: feature_extractor.dimension(),
                classifier_dim: classifier.input_dimension(),
            });
        }
        Ok(Self {
            version,
            trained_at,
            feature_extractor,
            classifier,
            metrics,
        })
    }

    /// Builds a unique version tag such as `20260116T093012.048213Z-4f1c2a9b`.
    /// Tags sort lexicographically in training order down to the
    /// microsecond.
    pub fn generate_version(trained_at: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", trained_at.format("%Y%m%dT%H%M%S%.6fZ"), &suffix[..8])
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn feature_extractor(&self) -> &TfidfVectorizer {
        &self.feature_extractor
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    pub fn metrics(&self) -> &EvaluationMetrics {
        &self.metrics
    }

    pub fn dimension(&self) -> usize {
        self.feature_extractor.dimension()
    }

    /// Fraud probability for already normalized text.
    pub fn predict_proba(&self, text: &NormalizedText) -> Result<f64, ClassifierError> {
        let features = self.feature_extractor.transform(text)?;
        self.classifier.predict_proba(&features)
    }
}
