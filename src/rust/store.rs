use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use log::{info, warn};

use crate::classifier::{ClassifierError, ModelArtifactPair};
use crate::model_manager::{ArtifactStorage, ModelError, RetrainLock};

/// Holds the active artifact pair behind a single atomically replaced
/// reference.
///
/// Readers take an `Arc` snapshot with [`ModelStore::active`] and keep using
/// it for as long as they like; a concurrent [`ModelStore::swap`] only
/// changes what the next reader sees. Pairs are immutable, so a reader can
/// never observe an extractor from one training run next to a classifier
/// from another.
#[derive(Debug)]
pub struct ModelStore {
    active: ArcSwapOption<ModelArtifactPair>,
    storage: Option<ArtifactStorage>,
    retain_versions: usize,
    // serializes persist-then-swap sequences (activate, rollback)
    activation_lock: Mutex<()>,
    // at most one retraining run per store, whichever service starts it
    retraining: tokio::sync::Mutex<()>,
}

/// Held for the duration of one retraining run against a [`ModelStore`].
/// Dropping it lets the next run start.
#[derive(Debug)]
pub struct RetrainingGuard<'a> {
    _file: Option<RetrainLock>,
    _local: tokio::sync::MutexGuard<'a, ()>,
}

impl ModelStore {
    /// Store without durable storage; pairs live only in memory.
    pub fn in_memory() -> Self {
        Self {
            active: ArcSwapOption::empty(),
            storage: None,
            retain_versions: 0,
            activation_lock: Mutex::new(()),
            retraining: tokio::sync::Mutex::new(()),
        }
    }

    /// Store that persists every activated pair and keeps at most
    /// `retain_versions` of them on disk.
    pub fn with_storage(storage: ArtifactStorage, retain_versions: usize) -> Self {
        Self {
            active: ArcSwapOption::empty(),
            storage: Some(storage),
            retain_versions,
            activation_lock: Mutex::new(()),
            retraining: tokio::sync::Mutex::new(()),
        }
    }

    pub fn storage(&self) -> Option<&ArtifactStorage> {
        self.storage.as_ref()
    }

    /// Snapshot of the active pair, if any.
    pub fn active(&self) -> Option<Arc<ModelArtifactPair>> {
        self.active.load_full()
    }

    pub fn get_active(&self) -> Result<Arc<ModelArtifactPair>, ClassifierError> {
        self.active().ok_or(ClassifierError::NoActiveModel)
    }

    pub fn active_version(&self) -> Option<String> {
        self.active().map(|pair| pair.version().to_string())
    }

    /// Claims this store for a retraining run. Returns `None` while another
    /// run holds it, including a run in another process sharing the same
    /// models directory.
    pub fn try_begin_retraining(&self) -> Result<Option<RetrainingGuard<'_>>, ModelError> {
        let Ok(local) = self.retraining.try_lock() else {
            return Ok(None);
        };
        let file = match &self.storage {
            Some(storage) => match storage.try_lock_retraining()? {
                Some(lock) => Some(lock),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some(RetrainingGuard {
            _file: file,
            _local: local,
        }))
    }

    /// True while a retraining run holds this store.
    pub fn is_retraining(&self) -> bool {
        self.retraining.try_lock().is_err() || self.storage.as_ref().is_some_and(|s| s.is_retraining())
    }

    /// Atomically replaces the active pair in memory and returns the
    /// previous one. Does not touch durable storage.
    pub fn swap(&self, pair: Arc<ModelArtifactPair>) -> Option<Arc<ModelArtifactPair>> {
        info!("Swapping active artifact pair to {}", pair.version());
        self.active.swap(Some(pair))
    }

    /// Persists `pair` (when storage is configured), marks it active on
    /// disk, then swaps it in. On any storage failure the active pair is
    /// left unchanged.
    pub fn activate(&self, pair: ModelArtifactPair) -> Result<Arc<ModelArtifactPair>, ModelError> {
        let _lock = self.activation_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(storage) = &self.storage {
            storage.save(&pair)?;
            storage.set_active(pair.version())?;
            if self.retain_versions > 0 {
                match storage.prune(self.retain_versions) {
                    Ok(removed) if !removed.is_empty() => info!("Pruned old artifact pairs: {:?}", removed),
                    Ok(_) => {}
                    Err(e) => warn!("Failed to prune old artifact pairs: {}", e),
                }
            }
        }
        let pair = Arc::new(pair);
        self.swap(Arc::clone(&pair));
        Ok(pair)
    }

    /// Loads the pair recorded as active on disk and swaps it in.
    pub fn load_from_durable_storage(&self) -> Result<Arc<ModelArtifactPair>, ModelError> {
        let storage = self.require_storage()?;
        let _lock = self.activation_lock.lock().unwrap_or_else(|e| e.into_inner());
        let pair = Arc::new(storage.load_active()?);
        self.swap(Arc::clone(&pair));
        Ok(pair)
    }

    /// Re-activates a previously stored version.
    pub fn rollback(&self, version: &str) -> Result<Arc<ModelArtifactPair>, ModelError> {
        let storage = self.require_storage()?;
        let _lock = self.activation_lock.lock().unwrap_or_else(|e| e.into_inner());
        let pair = Arc::new(storage.load_version(version)?);
        storage.set_active(version)?;
        self.swap(Arc::clone(&pair));
        info!("Rolled back to artifact pair {}", version);
        Ok(pair)
    }

    fn require_storage(&self) -> Result<&ArtifactStorage, ModelError> {
        self.storage
            .as_ref()
            .ok_or_else(|| ModelError::NotFound("model store has no durable storage".into()))
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
