use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use super::error::ClassifierError;
use super::service::ClassificationService;
use crate::config::PipelineConfig;
use crate::model_manager::{ArtifactStorage, ModelError};
use crate::ocr::{ImageTextExtractor, OcrEngine};
use crate::store::ModelStore;

/// A builder for constructing a ClassificationService with a fluent interface.
///
/// Without a models directory or an explicit store the service keeps its
/// artifact pairs in memory only.
#[derive(Default, Debug)]
pub struct ClassificationServiceBuilder {
    config: PipelineConfig,
    store: Option<Arc<ModelStore>>,
    models_dir: Option<PathBuf>,
    use_default_models_dir: bool,
    ocr_engine: Option<Arc<dyn OcrEngine>>,
}

impl ClassificationServiceBuilder {
    /// Creates a new builder with the default pipeline configuration
    ///
    /// # Example
    /// ```
    /// use jobcheck::ClassificationServiceBuilder;
    ///
    /// let builder = ClassificationServiceBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pipeline configuration
    ///
    /// # Example
    /// ```
    /// use jobcheck::{ClassificationServiceBuilder, PipelineConfig};
    ///
    /// let config = PipelineConfig {
    ///     min_token_threshold: 5,
    ///     ..PipelineConfig::default()
    /// };
    /// let builder = ClassificationServiceBuilder::new().with_config(config);
    /// ```
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing model store, e.g. one already used by another
    /// service. Takes precedence over any models directory.
    pub fn with_store(mut self, store: Arc<ModelStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Persists artifact pairs under `dir` and loads the pair recorded as
    /// active there when the service is built.
    ///
    /// # Example
    /// ```no_run
    /// use jobcheck::ClassificationServiceBuilder;
    ///
    /// let service = ClassificationServiceBuilder::new()
    ///     .with_models_dir("/var/lib/jobcheck/models")
    ///     .build();
    /// ```
    pub fn with_models_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.models_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Like [`ClassificationServiceBuilder::with_models_dir`] using
    /// [`ArtifactStorage::get_default_models_dir`].
    pub fn with_default_models_dir(mut self) -> Self {
        self.use_default_models_dir = true;
        self
    }

    /// Replaces the `tesseract` command line engine used for images.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr_engine = Some(engine);
        self
    }

    /// Builds the service.
    ///
    /// # Returns
    /// * `Result<ClassificationService, ClassifierError>` - The service if successful, or an error if:
    ///   - The configuration is invalid
    ///   - The models directory cannot be created
    ///   - A pair is recorded as active but fails to load or verify
    pub fn build(self) -> Result<ClassificationService, ClassifierError> {
        self.config.validate()?;

        let store = match (self.store, self.models_dir, self.use_default_models_dir) {
            (Some(store), _, _) => store,
            (None, Some(dir), _) => Arc::new(Self::open_store(&dir, &self.config)?),
            (None, None, true) => {
                let dir = ArtifactStorage::get_default_models_dir();
                Arc::new(Self::open_store(&dir, &self.config)?)
            }
            (None, None, false) => Arc::new(ModelStore::in_memory()),
        };

        let image_extractor = match self.ocr_engine {
            Some(engine) => ImageTextExtractor::new(engine, self.config.ocr.clone()),
            None => ImageTextExtractor::with_tesseract(self.config.ocr.clone()),
        };

        Ok(ClassificationService::from_parts(store, image_extractor, self.config))
    }

    fn open_store(dir: &Path, config: &PipelineConfig) -> Result<ModelStore, ClassifierError> {
        let storage = ArtifactStorage::new(dir)
            .map_err(|e| ClassifierError::BuildError(format!("Failed to open models directory {:?}: {}", dir, e)))?;
        let store = ModelStore::with_storage(storage, config.retain_versions);

        match store.load_from_durable_storage() {
            Ok(pair) => info!("Loaded active artifact pair {} from {:?}", pair.version(), dir),
            Err(ModelError::NotFound(_)) => warn!("No active artifact pair in {:?}; train one first", dir),
            Err(e) => {
                return Err(ClassifierError::BuildError(format!(
                    "Failed to load active artifact pair from {:?}: {}",
                    dir, e
                )))
            }
        }
        Ok(store)
    }
}
