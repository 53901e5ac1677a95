use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierError;

/// Settings for the OCR front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Grayscale cut-off; pixels above it become white, the rest black.
    pub binarize_threshold: u8,
    /// Images larger than this are rejected before decoding.
    pub max_image_bytes: usize,
    /// Tesseract executable, looked up on `PATH` when not absolute.
    pub tesseract_command: String,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binarize_threshold: 150,
            max_image_bytes: 10 * 1024 * 1024,
            tesseract_command: "tesseract".to_string(),
            language: "eng".to_string(),
        }
    }
}

/// Every tunable policy of the pipeline, selected once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of terms kept by the TF-IDF vocabulary.
    pub vocabulary_size: usize,
    /// Inputs with fewer normalized tokens are reported as invalid.
    pub min_token_threshold: usize,
    /// Fraction of each class held out for evaluation.
    pub test_split_ratio: f64,
    pub random_seed: u64,
    /// Probability at or above which a posting is labelled fake.
    pub decision_threshold: f64,
    pub max_iterations: usize,
    /// Inverse L2 regularization strength.
    pub regularization: f64,
    pub tolerance: f64,
    /// Number of artifact pairs kept on disk; older ones are pruned.
    pub retain_versions: usize,
    pub ocr: OcrConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vocabulary_size: 5000,
            min_token_threshold: 10,
            test_split_ratio: 0.2,
            random_seed: 42,
            decision_threshold: 0.5,
            max_iterations: 1000,
            regularization: 1.0,
            tolerance: 1e-4,
            retain_versions: 3,
            ocr: OcrConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON config file; missing keys take their default values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ClassifierError::ValidationError(format!("Failed to read config {:?}: {}", path, e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ClassifierError::ValidationError(format!("Failed to parse config {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.vocabulary_size == 0 {
            return Err(ClassifierError::ValidationError("vocabulary_size must be positive".into()));
        }
        if !(self.test_split_ratio > 0.0 && self.test_split_ratio < 1.0) {
            return Err(ClassifierError::ValidationError(format!(
                "test_split_ratio must be in (0, 1), got {}",
                self.test_split_ratio
            )));
        }
        if !(self.decision_threshold > 0.0 && self.decision_threshold < 1.0) {
            return Err(ClassifierError::ValidationError(format!(
                "decision_threshold must be in (0, 1), got {}",
                self.decision_threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(ClassifierError::ValidationError("max_iterations must be positive".into()));
        }
        if self.regularization <= 0.0 || self.tolerance <= 0.0 {
            return Err(ClassifierError::ValidationError(
                "regularization and tolerance must be positive".into(),
            ));
        }
        if self.ocr.max_image_bytes == 0 {
            return Err(ClassifierError::ValidationError("ocr.max_image_bytes must be positive".into()));
        }
        Ok(())
    }
}
