use std::sync::Arc;

use log::{debug, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::ClassificationServiceBuilder;
use super::error::ClassifierError;
use super::{ClassificationReport, ClassifierInfo, PredictionResult, RawInput};
use crate::config::PipelineConfig;
use crate::ocr::ImageTextExtractor;
use crate::store::ModelStore;
use crate::text::{NormalizedText, TextNormalizer};
use crate::training::{RetrainOutcome, TrainingError, TrainingPipeline, TrainingRecord};

/// Inference and retraining entry point.
///
/// Every classification reads one snapshot of the active artifact pair at
/// its start and uses it throughout, so a retraining run that swaps in a new
/// pair mid-call never produces a mixed result.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use jobcheck::{ClassificationService, RawInput};
///
/// let service = ClassificationService::builder()
///     .with_models_dir("/var/lib/jobcheck/models")
///     .build()?;
///
/// let result = service.classify(&RawInput::text("Work from home and earn $5000 a week ..."))?;
/// println!("{} ({:.2}%)", result.label, result.confidence);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClassificationService {
    store: Arc<ModelStore>,
    normalizer: TextNormalizer,
    image_extractor: ImageTextExtractor,
    pipeline: TrainingPipeline,
    config: PipelineConfig,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ClassificationService>();
    }
};

impl ClassificationService {
    /// Creates a new builder for fluent construction
    pub fn builder() -> ClassificationServiceBuilder {
        ClassificationServiceBuilder::new()
    }

    pub(crate) fn from_parts(
        store: Arc<ModelStore>,
        image_extractor: ImageTextExtractor,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            normalizer: TextNormalizer::new(),
            image_extractor,
            pipeline: TrainingPipeline::new(config.clone()),
            config,
        }
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns information about the service's current state
    pub fn info(&self) -> ClassifierInfo {
        let active = self.store.active();
        ClassifierInfo {
            model_version: active.as_ref().map(|pair| pair.version().to_string()),
            trained_at: active.as_ref().map(|pair| pair.trained_at()),
            vocabulary_size: active.as_ref().map_or(0, |pair| pair.dimension()),
            metrics: active.as_ref().map(|pair| pair.metrics().clone()),
            ocr_engine: self.image_extractor.engine_name().to_string(),
            min_token_threshold: self.config.min_token_threshold,
            decision_threshold: self.config.decision_threshold,
        }
    }

    /// Classifies one posting.
    ///
    /// Inputs that normalize to fewer than `min_token_threshold` tokens,
    /// including unreadable images, yield [`PredictionResult::invalid`].
    ///
    /// # Errors
    /// - `NoActiveModel` if the input is long enough but no pair is active
    pub fn classify(&self, input: &RawInput) -> Result<PredictionResult, ClassifierError> {
        self.classify_detailed(input).map(|report| report.result)
    }

    pub fn classify_text(&self, text: &str) -> Result<PredictionResult, ClassifierError> {
        self.classify(&RawInput::text(text))
    }

    pub fn classify_image(&self, bytes: Vec<u8>) -> Result<PredictionResult, ClassifierError> {
        self.classify(&RawInput::image(bytes))
    }

    /// Like [`ClassificationService::classify`], also reporting the input
    /// source, the token count and the version of the pair used.
    pub fn classify_detailed(&self, input: &RawInput) -> Result<ClassificationReport, ClassifierError> {
        let snapshot = self.store.active();
        let source = input.source();
        let text = self.resolve(input);
        let token_count = text.token_count();

        if token_count < self.config.min_token_threshold {
            debug!(
                "Input has {} tokens, below the minimum of {}; reporting invalid",
                token_count, self.config.min_token_threshold
            );
            return Ok(ClassificationReport {
                result: PredictionResult::invalid(),
                source,
                token_count,
                model_version: None,
            });
        }

        let pair = snapshot.ok_or(ClassifierError::NoActiveModel)?;
        let probability = pair.predict_proba(&text)?;
        let result = PredictionResult::from_probability(probability, self.config.decision_threshold);
        debug!(
            "Classified {} tokens as {} (p={:.4}, version {})",
            token_count,
            result.label,
            probability,
            pair.version()
        );

        Ok(ClassificationReport {
            result,
            source,
            token_count,
            model_version: Some(pair.version().to_string()),
        })
    }

    fn resolve(&self, input: &RawInput) -> NormalizedText {
        match input {
            RawInput::Text(text) => self.normalizer.normalize(text),
            RawInput::Image { bytes, format } => {
                debug!("Extracting text from {} byte image ({:?})", bytes.len(), format);
                self.image_extractor.extract(bytes)
            }
        }
    }

    /// Retrains on `records` and activates the result. Runs on the calling
    /// thread; see [`ClassificationService::retrain_in_background`].
    ///
    /// # Errors
    /// - `InsufficientData` if either class has no records
    /// - `InProgress` if another run, from any service sharing the store,
    ///   is in progress
    /// - `Cancelled` if `cancel` fired before activation
    pub fn retrain(
        &self,
        records: &[TrainingRecord],
        cancel: &CancellationToken,
    ) -> Result<RetrainOutcome, TrainingError> {
        info!("Retraining requested with {} records", records.len());
        self.pipeline.run(records, &self.store, cancel)
    }

    /// Runs [`ClassificationService::retrain`] on tokio's blocking pool.
    /// Classification keeps using the previous pair until the swap.
    ///
    /// Must be called from within a tokio runtime.
    pub fn retrain_in_background(
        self: &Arc<Self>,
        records: Vec<TrainingRecord>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<RetrainOutcome, TrainingError>> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || service.retrain(&records, &cancel))
    }

    /// True while any retraining run holds this service's store, including
    /// runs started by other services sharing it.
    pub fn is_retraining(&self) -> bool {
        self.store.is_retraining()
    }
}
