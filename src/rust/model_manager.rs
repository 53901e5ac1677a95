use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classifier::{ClassifierError, FeatureExtractor, LogisticRegression, ModelArtifactPair, TfidfVectorizer};
use crate::training::EvaluationMetrics;

const VECTORIZER_FILE: &str = "vectorizer.json";
const CLASSIFIER_FILE: &str = "classifier.json";
const METADATA_FILE: &str = "metadata.json";
const ACTIVE_FILE: &str = "ACTIVE";
const STAGING_PREFIX: &str = ".staging-";
const RETRAIN_LOCK_FILE: &str = "RETRAINING.lock";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Artifact pair not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Hash mismatch: expected {expected}, got {actual} for {artifact} file")]
    HashMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },
    #[error("Version mismatch: metadata records {recorded}, stored under {directory}")]
    VersionMismatch { recorded: String, directory: String },
    #[error("Refusing to remove the active artifact pair {0}")]
    ActiveVersion(String),
    #[error("Invalid artifact pair: {0}")]
    Invalid(#[from] ClassifierError),
}

/// Metadata written next to the two artifact blobs of one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub vocabulary_size: usize,
    pub metrics: EvaluationMetrics,
    pub vectorizer_sha256: String,
    pub classifier_sha256: String,
}

/// On-disk home of versioned artifact pairs.
///
/// Layout:
/// ```text
/// <models_dir>/
///   ACTIVE                     name of the active version
///   <version>/vectorizer.json
///   <version>/classifier.json
///   <version>/metadata.json    digests of both blobs + evaluation metrics
///   RETRAINING.lock            present while a retraining run owns the directory
/// ```
/// A version directory is written under a staging name and renamed into
/// place, and `ACTIVE` is replaced by rename, so readers never see a
/// half-written pair.
#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    models_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ArtifactStorage {
    /// Creates storage rooted at the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("JOBCHECK_HOME") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("jobcheck").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".jobcheck").join("models");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("jobcheck").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.models_dir.join(version)
    }

    /// Writes `pair` as a new version directory. Does not activate it.
    pub fn save(&self, pair: &ModelArtifactPair) -> Result<PathBuf, ModelError> {
        let _lock = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let version = pair.version();
        let final_dir = self.version_dir(version);
        if final_dir.exists() {
            log::warn!("Version {} already stored at {:?}, replacing", version, final_dir);
            fs::remove_dir_all(&final_dir)?;
        }

        let staging_dir = self.models_dir.join(format!("{}{}", STAGING_PREFIX, version));
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir)?;
        }
        log::info!("Staging artifact pair {} at {:?}", version, staging_dir);
        fs::create_dir_all(&staging_dir)?;
        if let Err(e) = Self::write_staged(pair, &staging_dir, &final_dir) {
            log::warn!("Failed to store artifact pair {}: {}", version, e);
            if let Err(cleanup) = fs::remove_dir_all(&staging_dir) {
                log::warn!("Failed to remove staging directory {:?}: {}", staging_dir, cleanup);
            }
            return Err(e);
        }
        Ok(final_dir)
    }

    fn write_staged(pair: &ModelArtifactPair, staging_dir: &Path, final_dir: &Path) -> Result<(), ModelError> {
        let version = pair.version();
        let vectorizer_bytes = serde_json::to_vec(pair.feature_extractor())?;
        let classifier_bytes = serde_json::to_vec(pair.classifier())?;
        let metadata = ArtifactMetadata {
            version: version.to_string(),
            trained_at: pair.trained_at(),
            vocabulary_size: pair.dimension(),
            metrics: pair.metrics().clone(),
            vectorizer_sha256: sha256_hex(&vectorizer_bytes),
            classifier_sha256: sha256_hex(&classifier_bytes),
        };

        fs::write(staging_dir.join(VECTORIZER_FILE), &vectorizer_bytes)?;
        fs::write(staging_dir.join(CLASSIFIER_FILE), &classifier_bytes)?;
        fs::write(staging_dir.join(METADATA_FILE), serde_json::to_vec_pretty(&metadata)?)?;

        fs::rename(staging_dir, final_dir)?;
        log::info!("Stored artifact pair {} ({} bytes + {} bytes)", version, vectorizer_bytes.len(), classifier_bytes.len());
        Ok(())
    }

    /// Points `ACTIVE` at `version`, which must already be stored.
    pub fn set_active(&self, version: &str) -> Result<(), ModelError> {
        let _lock = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.version_dir(version).join(METADATA_FILE).exists() {
            return Err(ModelError::NotFound(version.to_string()));
        }
        let tmp = self.models_dir.join(format!("{}.tmp", ACTIVE_FILE));
        fs::write(&tmp, version)?;
        fs::rename(&tmp, self.models_dir.join(ACTIVE_FILE))?;
        log::info!("Active artifact pair is now {}", version);
        Ok(())
    }

    pub fn active_version(&self) -> Result<Option<String>, ModelError> {
        let path = self.models_dir.join(ACTIVE_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let version = fs::read_to_string(path)?.trim().to_string();
        Ok((!version.is_empty()).then_some(version))
    }

    pub fn load_active(&self) -> Result<ModelArtifactPair, ModelError> {
        let version = self
            .active_version()?
            .ok_or_else(|| ModelError::NotFound(format!("no active version in {:?}", self.models_dir)))?;
        self.load_version(&version)
    }

    /// Loads and verifies one stored version. Both blobs must match the
    /// digests recorded in its metadata.
    pub fn load_version(&self, version: &str) -> Result<ModelArtifactPair, ModelError> {
        let dir = self.version_dir(version);
        log::info!("Loading artifact pair from {:?}", dir);
        let metadata = self.read_metadata(version)?;

        let vectorizer_bytes = fs::read(dir.join(VECTORIZER_FILE))?;
        Self::check_digest("vectorizer", &vectorizer_bytes, &metadata.vectorizer_sha256)?;
        let classifier_bytes = fs::read(dir.join(CLASSIFIER_FILE))?;
        Self::check_digest("classifier", &classifier_bytes, &metadata.classifier_sha256)?;

        let vectorizer: TfidfVectorizer = serde_json::from_slice(&vectorizer_bytes)?;
        vectorizer.validate()?;
        let classifier: LogisticRegression = serde_json::from_slice(&classifier_bytes)?;
        if vectorizer.dimension() != metadata.vocabulary_size {
            log::error!(
                "Vectorizer of {} has {} terms, metadata records {}",
                version,
                vectorizer.dimension(),
                metadata.vocabulary_size
            );
            return Err(ModelError::Invalid(ClassifierError::ArtifactMismatch {
                extractor_dim: vectorizer.dimension(),
                classifier_dim: metadata.vocabulary_size,
            }));
        }

        let pair = ModelArtifactPair::new(
            metadata.version,
            metadata.trained_at,
            vectorizer,
            classifier,
            metadata.metrics,
        )?;
        Ok(pair)
    }

    /// Checks a stored version without building the pair.
    pub fn verify_version(&self, version: &str) -> Result<bool, ModelError> {
        let dir = self.version_dir(version);
        let vectorizer_path = dir.join(VECTORIZER_FILE);
        let classifier_path = dir.join(CLASSIFIER_FILE);
        if !dir.join(METADATA_FILE).exists() || !vectorizer_path.exists() || !classifier_path.exists() {
            log::info!("Version {} is incomplete", version);
            return Ok(false);
        }

        let metadata = match self.read_metadata(version) {
            Ok(metadata) => metadata,
            Err(ModelError::VersionMismatch { .. }) | Err(ModelError::Serialization(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let vectorizer_ok = self.verify_file(&vectorizer_path, &metadata.vectorizer_sha256)?;
        let classifier_ok = self.verify_file(&classifier_path, &metadata.classifier_sha256)?;
        log::info!("Verification of {}: vectorizer={}, classifier={}", version, vectorizer_ok, classifier_ok);
        Ok(vectorizer_ok && classifier_ok)
    }

    /// Stored versions, oldest first.
    pub fn versions(&self) -> Result<Vec<String>, ModelError> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.models_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.path().join(METADATA_FILE).exists() {
                continue;
            }
            versions.push(name);
        }
        versions.sort();
        Ok(versions)
    }

    pub fn read_metadata(&self, version: &str) -> Result<ArtifactMetadata, ModelError> {
        let path = self.version_dir(version).join(METADATA_FILE);
        if !path.exists() {
            return Err(ModelError::NotFound(version.to_string()));
        }
        let metadata: ArtifactMetadata = serde_json::from_slice(&fs::read(path)?)?;
        if metadata.version != version {
            return Err(ModelError::VersionMismatch {
                recorded: metadata.version,
                directory: version.to_string(),
            });
        }
        Ok(metadata)
    }

    pub fn remove_version(&self, version: &str) -> Result<(), ModelError> {
        if self.active_version()?.as_deref() == Some(version) {
            return Err(ModelError::ActiveVersion(version.to_string()));
        }
        let _lock = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let dir = self.version_dir(version);
        if !dir.exists() {
            return Err(ModelError::NotFound(version.to_string()));
        }
        fs::remove_dir_all(dir)?;
        log::info!("Removed artifact pair {}", version);
        Ok(())
    }

    /// Deletes the oldest versions so at most `keep` remain, along with
    /// staging directories left behind by interrupted saves. The active
    /// version is never removed. Returns the removed versions.
    pub fn prune(&self, keep: usize) -> Result<Vec<String>, ModelError> {
        self.sweep_staging()?;
        let active = self.active_version()?;
        let versions = self.versions()?;
        let excess = versions.len().saturating_sub(keep.max(1));

        let mut removed = Vec::new();
        for version in versions.into_iter().filter(|v| Some(v) != active.as_ref()).take(excess) {
            self.remove_version(&version)?;
            removed.push(version);
        }
        Ok(removed)
    }

    fn sweep_staging(&self) -> Result<(), ModelError> {
        let _lock = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        for entry in fs::read_dir(&self.models_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(STAGING_PREFIX) && entry.file_type()?.is_dir() {
                log::info!("Removing stale staging directory {}", name);
                fs::remove_dir_all(entry.path())?;
            }
        }
        Ok(())
    }

    /// Claims the models directory for one retraining run by creating
    /// `RETRAINING.lock` exclusively. Returns `None` when another run, in
    /// this process or another, holds it. The file is removed when the
    /// returned lock is dropped; one left by a crashed process must be
    /// deleted by hand.
    pub fn try_lock_retraining(&self) -> Result<Option<RetrainLock>, ModelError> {
        let path = self.retrain_lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let lock = RetrainLock { path };
                writeln!(file, "{}", std::process::id())?;
                log::debug!("Acquired retraining lock {:?}", lock.path);
                Ok(Some(lock))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::warn!("Retraining lock {:?} is held", path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_retraining(&self) -> bool {
        self.retrain_lock_path().exists()
    }

    fn retrain_lock_path(&self) -> PathBuf {
        self.models_dir.join(RETRAIN_LOCK_FILE)
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        log::debug!("Verifying file: {:?}", path);
        let bytes = fs::read(path)?;
        Ok(sha256_hex(&bytes) == expected_hash)
    }

    fn check_digest(artifact: &str, bytes: &[u8], expected: &str) -> Result<(), ModelError> {
        let actual = sha256_hex(bytes);
        if actual != expected {
            log::error!("{} hash mismatch: expected {}, got {}", artifact, expected, actual);
            return Err(ModelError::HashMismatch {
                artifact: artifact.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }
}

/// Exclusive claim on a models directory for retraining.
#[derive(Debug)]
pub struct RetrainLock {
    path: PathBuf,
}

impl Drop for RetrainLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to release retraining lock {:?}: {}", self.path, e);
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
