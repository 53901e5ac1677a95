//! Retraining workflow.
//!
//! A run normalizes the labelled records, splits them with a seeded
//! stratified split, fits a fresh vectorizer on the training half only,
//! fits a fresh classifier, evaluates on the held-out half and packages the
//! result as a new [`ModelArtifactPair`]. Nothing touches the active pair
//! until [`TrainingPipeline::run`] hands the finished pair to the
//! [`ModelStore`], so a failed or cancelled run leaves the deployed model
//! exactly as it was.

mod dataset;
mod metrics;
mod split;

use std::io;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::classifier::{
    ClassifierError, FeatureExtractor, FeatureVector, LogisticRegression, LogisticRegressionParams,
    ModelArtifactPair, ProbabilisticClassifier, TfidfVectorizer,
};
use crate::config::PipelineConfig;
use crate::model_manager::ModelError;
use crate::store::ModelStore;
use crate::text::{NormalizedText, TextNormalizer};

pub use dataset::{load_dataset, load_dataset_from_reader, TrainingRecord, LABEL_COLUMN, TEXT_COLUMNS};
pub use metrics::{ClassMetrics, EvaluationMetrics};
pub use split::{stratified_split, SplitIndices};

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Insufficient training data: {0}")]
    InsufficientData(String),
    #[error("Invalid label {value:?} in data row {row}")]
    InvalidLabel { row: usize, value: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Retraining was cancelled")]
    Cancelled,
    #[error("Another retraining run is already in progress")]
    InProgress,
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Storage error: {0}")]
    Storage(#[from] ModelError),
}

/// Pair produced and activated by a successful run.
#[derive(Debug, Clone)]
pub struct RetrainOutcome {
    pub pair: Arc<ModelArtifactPair>,
    pub metrics: EvaluationMetrics,
}

/// Builds artifact pairs from labelled data. [`TrainingPipeline::run`]
/// claims the target store first, so at most one run executes per store
/// however many pipelines share it.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    normalizer: TextNormalizer,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            normalizer: TextNormalizer::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Trains a new pair and activates it in `store`.
    ///
    /// A second call while one is running is rejected with `InProgress`
    /// rather than queued. Every failure, including cancellation, leaves
    /// the store's active pair untouched.
    pub fn run(
        &self,
        records: &[TrainingRecord],
        store: &ModelStore,
        cancel: &CancellationToken,
    ) -> Result<RetrainOutcome, TrainingError> {
        let _guard = store.try_begin_retraining()?.ok_or_else(|| {
            warn!("Rejecting retraining request: another run is in progress");
            TrainingError::InProgress
        })?;

        let pair = self.build(records, cancel)?;
        Self::check_cancelled(cancel, "persist")?;

        info!("Activating artifact pair {}", pair.version());
        let metrics = pair.metrics().clone();
        let pair = store.activate(pair)?;
        info!("Retraining finished; active version is now {}", pair.version());
        Ok(RetrainOutcome { pair, metrics })
    }

    /// Trains and evaluates a new pair without activating it.
    pub fn build(
        &self,
        records: &[TrainingRecord],
        cancel: &CancellationToken,
    ) -> Result<ModelArtifactPair, TrainingError> {
        let labels = Self::validate_records(records)?;

        info!("Normalizing {} training records", records.len());
        let texts: Vec<NormalizedText> = records.iter().map(|r| self.normalizer.normalize(&r.text)).collect();
        Self::check_cancelled(cancel, "split")?;

        let split = stratified_split(&labels, self.config.test_split_ratio, self.config.random_seed);
        info!(
            "Split {} records into {} training and {} held-out (seed {})",
            records.len(),
            split.train.len(),
            split.test.len(),
            self.config.random_seed
        );
        let train_texts: Vec<NormalizedText> = split.train.iter().map(|&i| texts[i].clone()).collect();
        let train_labels: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
        let test_labels: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();
        Self::check_cancelled(cancel, "vectorizer fit")?;

        let mut vectorizer = TfidfVectorizer::new(self.config.vocabulary_size);
        let train_features = vectorizer.fit_transform(&train_texts)?;
        info!("Fitted vocabulary of {} terms on the training subset", vectorizer.dimension());
        let test_features = split
            .test
            .iter()
            .map(|&i| vectorizer.transform(&texts[i]))
            .collect::<Result<Vec<_>, _>>()?;
        Self::check_cancelled(cancel, "classifier fit")?;

        let mut classifier = LogisticRegression::new(LogisticRegressionParams {
            max_iterations: self.config.max_iterations,
            regularization: self.config.regularization,
            tolerance: self.config.tolerance,
        });
        if !classifier.fit_cancellable(&train_features, &train_labels, cancel)? {
            return Err(TrainingError::Cancelled);
        }
        info!("Fitted classifier in {} iterations", classifier.iterations_run());

        let metrics = self.evaluate(&classifier, &test_features, &test_labels, split.train.len())?;
        info!(
            "Held-out accuracy {:.4} over {} records (fake precision {:.4}, recall {:.4})",
            metrics.accuracy, metrics.test_size, metrics.fake.precision, metrics.fake.recall
        );

        let trained_at = Utc::now();
        let version = ModelArtifactPair::generate_version(trained_at);
        debug!("Packaging artifact pair {}", version);
        Ok(ModelArtifactPair::new(version, trained_at, vectorizer, classifier, metrics)?)
    }

    fn evaluate(
        &self,
        classifier: &LogisticRegression,
        features: &[FeatureVector],
        labels: &[u8],
        train_size: usize,
    ) -> Result<EvaluationMetrics, TrainingError> {
        let predicted = features
            .iter()
            .map(|x| {
                classifier
                    .predict_proba(x)
                    .map(|p| u8::from(p >= self.config.decision_threshold))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EvaluationMetrics::compute(labels, &predicted, train_size))
    }

    fn validate_records(records: &[TrainingRecord]) -> Result<Vec<u8>, TrainingError> {
        if records.is_empty() {
            return Err(TrainingError::InsufficientData("dataset is empty".into()));
        }
        let mut counts = [0usize; 2];
        for (row, record) in records.iter().enumerate() {
            match record.label {
                0 | 1 => counts[usize::from(record.label)] += 1,
                other => {
                    return Err(TrainingError::InvalidLabel {
                        row: row + 1,
                        value: other.to_string(),
                    })
                }
            }
        }
        if counts[0] == 0 || counts[1] == 0 {
            return Err(TrainingError::InsufficientData(format!(
                "need both classes, got {} real and {} fake records",
                counts[0], counts[1]
            )));
        }
        Ok(records.iter().map(|r| r.label).collect())
    }

    fn check_cancelled(cancel: &CancellationToken, next_stage: &str) -> Result<(), TrainingError> {
        if cancel.is_cancelled() {
            warn!("Retraining cancelled before {}", next_stage);
            return Err(TrainingError::Cancelled);
        }
        Ok(())
    }
}
