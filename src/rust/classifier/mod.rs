use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::training::EvaluationMetrics;

mod artifact;
pub mod builder;
mod error;
mod features;
mod model;
mod service;
mod utils;

pub use artifact::ModelArtifactPair;
pub use builder::ClassificationServiceBuilder;
pub use error::ClassifierError;
pub use features::{FeatureExtractor, FeatureVector, TfidfVectorizer};
pub use model::{LogisticRegression, LogisticRegressionParams, ProbabilisticClassifier};
pub use service::ClassificationService;

use utils::round_to;

/// Outcome label of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Real,
    Fake,
    /// Input too short to classify reliably.
    Invalid,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "Real Job"),
            Self::Fake => write!(f, "Fake Job"),
            Self::Invalid => write!(f, "Invalid Input"),
        }
    }
}

/// Label plus confidence in percent, serialized as `{label, confidence}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,
    /// `max(p, 1 - p) * 100`, rounded to two decimals; 0.0 for `Invalid`.
    pub confidence: f64,
}

impl PredictionResult {
    pub fn invalid() -> Self {
        Self {
            label: Label::Invalid,
            confidence: 0.0,
        }
    }

    /// Maps a fraud probability to a label using `threshold`.
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        let label = if probability >= threshold { Label::Fake } else { Label::Real };
        let confidence = round_to(probability.max(1.0 - probability) * 100.0, 2);
        Self {
            label,
            confidence: confidence.clamp(0.0, 100.0),
        }
    }

    /// True for a fake prediction held with at least `min_confidence` percent.
    /// Reporting thresholds belong to the caller.
    pub fn is_flagged(&self, min_confidence: f64) -> bool {
        self.label == Label::Fake && self.confidence >= min_confidence
    }
}

/// A single posting submitted for classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Text(String),
    Image {
        bytes: Vec<u8>,
        format: Option<image::ImageFormat>,
    },
}

impl RawInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Wraps encoded image bytes, sniffing the format from the header.
    pub fn image(bytes: Vec<u8>) -> Self {
        let format = image::guess_format(&bytes).ok();
        Self::Image { bytes, format }
    }

    /// Resolves a form submission that may carry both a text field and an
    /// uploaded image. A non-empty image wins; otherwise the text is used.
    pub fn from_submission(text: Option<String>, image: Option<Vec<u8>>) -> Self {
        match image {
            Some(bytes) if !bytes.is_empty() => Self::image(bytes),
            _ => Self::Text(text.unwrap_or_default()),
        }
    }

    pub fn source(&self) -> InputSource {
        match self {
            Self::Text(_) => InputSource::Text,
            Self::Image { .. } => InputSource::Ocr,
        }
    }
}

/// Where the classified text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Text,
    Ocr,
}

/// A prediction together with the details a history store records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub result: PredictionResult,
    pub source: InputSource,
    /// Tokens left after normalization.
    pub token_count: usize,
    /// Version of the artifact pair that produced the prediction; `None`
    /// when the input was rejected before a model was needed.
    pub model_version: Option<String>,
}

/// Information about a classification service's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierInfo {
    pub model_version: Option<String>,
    pub trained_at: Option<DateTime<Utc>>,
    /// Vocabulary size of the active pair; 0 when none is active.
    pub vocabulary_size: usize,
    pub metrics: Option<EvaluationMetrics>,
    pub ocr_engine: String,
    pub min_token_threshold: usize,
    pub decision_threshold: f64,
}
