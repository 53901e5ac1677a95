//! A thread-safe fake job posting classifier.
//!
//! Postings arrive as text or as scanned images. Both go through the same
//! normalization, TF-IDF features and class-balanced logistic regression,
//! and come back as a [`PredictionResult`] of `Real`, `Fake` or `Invalid`
//! with a confidence in percent.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use jobcheck::{load_dataset, ClassificationService, RawInput};
//! use tokio_util::sync::CancellationToken;
//!
//! let service = ClassificationService::builder()
//!     .with_models_dir("models")
//!     .build()?;
//!
//! let records = load_dataset("fake_job_postings.csv")?;
//! let outcome = service.retrain(&records, &CancellationToken::new())?;
//! println!("accuracy {:.3}", outcome.metrics.accuracy);
//!
//! let result = service.classify(&RawInput::text("Earn $500 a day from home, no experience needed ..."))?;
//! println!("{} ({:.2}%)", result.label, result.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The service is `Send + Sync` and can be shared across threads using
//! `Arc`. Classification never blocks on retraining: every call reads one
//! immutable snapshot of the active artifact pair, and a retraining run
//! replaces that snapshot atomically when it finishes.
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use jobcheck::{ClassificationService, RawInput};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let service = Arc::new(ClassificationService::builder().with_models_dir("models").build()?);
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let service = Arc::clone(&service);
//!     handles.push(thread::spawn(move || {
//!         service.classify(&RawInput::text("some posting text")).unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod model_manager;
pub mod ocr;
pub mod store;
pub mod text;
pub mod training;

pub use classifier::{
    ClassificationReport, ClassificationService, ClassificationServiceBuilder, ClassifierError, ClassifierInfo,
    InputSource, Label, ModelArtifactPair, PredictionResult, RawInput,
};
pub use config::{OcrConfig, PipelineConfig};
pub use model_manager::{ArtifactMetadata, ArtifactStorage, ModelError, RetrainLock};
pub use ocr::{ImageTextExtractor, OcrEngine, OcrError, TesseractEngine};
pub use store::{ModelStore, RetrainingGuard};
pub use text::{NormalizedText, TextNormalizer};
pub use training::{
    load_dataset, load_dataset_from_reader, EvaluationMetrics, RetrainOutcome, TrainingError, TrainingPipeline,
    TrainingRecord,
};

pub fn init_logger() {
    env_logger::init();
}
