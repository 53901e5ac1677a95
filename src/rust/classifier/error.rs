/// Represents the different types of errors that can occur in the classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// A feature extractor or classifier was used before being fitted
    #[error("Model component used before it was fitted")]
    NotFitted,
    /// No artifact pair has been activated in the model store
    #[error("No active model artifact pair is loaded")]
    NoActiveModel,
    /// Feature extractor and classifier come from different training runs
    #[error("Artifact mismatch: feature extractor produces {extractor_dim} features, classifier expects {classifier_dim}")]
    ArtifactMismatch {
        extractor_dim: usize,
        classifier_dim: usize,
    },
    /// Error occurred due to invalid input parameters
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Error occurred while assembling a classification service
    #[error("Build error: {0}")]
    BuildError(String),
}
