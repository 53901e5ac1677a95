mod common;

use std::fs;

use jobcheck::{ArtifactStorage, ClassificationService, ModelError, ModelStore, PipelineConfig};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use common::{fake_posting, init_logger, real_posting, records};

fn service_in(dir: &std::path::Path, retain_versions: usize) -> ClassificationService {
    init_logger();
    ClassificationService::builder()
        .with_config(PipelineConfig {
            retain_versions,
            ..PipelineConfig::default()
        })
        .with_models_dir(dir)
        .build()
        .unwrap()
}

#[test]
fn test_active_pair_survives_restart() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let first = service_in(dir.path(), 3);
    let outcome = first.retrain(&records(40, 10), &CancellationToken::new())?;
    let text = format!("{} {}", real_posting(2), fake_posting(3));
    let expected = first.classify_text(&text)?;

    let restarted = service_in(dir.path(), 3);
    assert_eq!(restarted.store().active_version().as_deref(), Some(outcome.pair.version()));
    assert_eq!(restarted.store().get_active()?.as_ref(), outcome.pair.as_ref());
    assert_eq!(restarted.classify_text(&text)?, expected);
    Ok(())
}

#[test]
fn test_stored_pair_verifies() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let service = service_in(dir.path(), 3);
    let version = service.retrain(&records(40, 10), &CancellationToken::new())?.pair.version().to_string();

    let storage = ArtifactStorage::new(dir.path())?;
    assert_eq!(storage.versions()?, vec![version.clone()]);
    assert_eq!(storage.active_version()?, Some(version.clone()));
    assert!(storage.verify_version(&version)?);

    let metadata = storage.read_metadata(&version)?;
    assert_eq!(metadata.version, version);
    assert_eq!(metadata.metrics.test_size, 10);
    assert_eq!(metadata.vectorizer_sha256.len(), 64);
    Ok(())
}

#[test]
fn test_corrupted_blob_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let service = service_in(dir.path(), 3);
    let version = service.retrain(&records(40, 10), &CancellationToken::new())?.pair.version().to_string();

    let storage = ArtifactStorage::new(dir.path())?;
    let blob = storage.version_dir(&version).join("classifier.json");
    let mut bytes = fs::read(&blob)?;
    bytes.push(b' ');
    fs::write(&blob, bytes)?;

    assert!(!storage.verify_version(&version)?);
    match storage.load_version(&version) {
        Err(ModelError::HashMismatch { artifact, .. }) => assert_eq!(artifact, "classifier"),
        other => panic!("expected hash mismatch, got {:?}", other.map(|p| p.version().to_string())),
    }
    assert!(ClassificationService::builder().with_models_dir(dir.path()).build().is_err());
    Ok(())
}

#[test]
fn test_blobs_from_different_runs_are_refused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let service = service_in(dir.path(), 3);
    let first = service.retrain(&records(40, 10), &CancellationToken::new())?.pair.version().to_string();
    let second = service.retrain(&records(55, 12), &CancellationToken::new())?.pair.version().to_string();

    let storage = ArtifactStorage::new(dir.path())?;
    fs::copy(
        storage.version_dir(&first).join("vectorizer.json"),
        storage.version_dir(&second).join("vectorizer.json"),
    )?;
    assert!(matches!(
        storage.load_version(&second),
        Err(ModelError::HashMismatch { ref artifact, .. }) if artifact == "vectorizer"
    ));
    assert!(storage.load_version(&first).is_ok());
    Ok(())
}

#[test]
fn test_vectorizer_with_dangling_index_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let service = service_in(dir.path(), 3);
    let version = service.retrain(&records(40, 10), &CancellationToken::new())?.pair.version().to_string();

    let storage = ArtifactStorage::new(dir.path())?;
    let vectorizer_path = storage.version_dir(&version).join("vectorizer.json");
    let mut vectorizer: serde_json::Value = serde_json::from_slice(&fs::read(&vectorizer_path)?)?;
    let term = vectorizer["vocabulary"]
        .as_object()
        .and_then(|terms| terms.keys().next().cloned())
        .unwrap();
    vectorizer["vocabulary"][term.as_str()] = serde_json::json!(1_000_000);
    let bytes = serde_json::to_vec(&vectorizer)?;
    fs::write(&vectorizer_path, &bytes)?;

    // digest re-recorded so only the content check can catch it
    let metadata_path = storage.version_dir(&version).join("metadata.json");
    let mut metadata: serde_json::Value = serde_json::from_slice(&fs::read(&metadata_path)?)?;
    metadata["vectorizer_sha256"] = serde_json::json!(format!("{:x}", Sha256::digest(&bytes)));
    fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata)?)?;

    assert!(storage.verify_version(&version)?);
    assert!(matches!(storage.load_version(&version), Err(ModelError::Invalid(_))));
    assert!(ClassificationService::builder().with_models_dir(dir.path()).build().is_err());
    Ok(())
}

#[test]
fn test_rollback_to_previous_version() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let service = service_in(dir.path(), 3);
    let first = service.retrain(&records(40, 10), &CancellationToken::new())?.pair;
    let second = service.retrain(&records(55, 12), &CancellationToken::new())?.pair;
    assert_eq!(service.store().active_version().as_deref(), Some(second.version()));

    let restored = service.store().rollback(first.version())?;
    assert_eq!(restored.as_ref(), first.as_ref());
    assert_eq!(service.store().active_version().as_deref(), Some(first.version()));
    assert_eq!(
        ArtifactStorage::new(dir.path())?.active_version()?.as_deref(),
        Some(first.version())
    );

    assert!(matches!(
        service.store().rollback("no-such-version"),
        Err(ModelError::NotFound(_))
    ));
    assert_eq!(service.store().active_version().as_deref(), Some(first.version()));
    Ok(())
}

#[test]
fn test_old_versions_are_pruned() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let service = service_in(dir.path(), 2);
    let mut trained = Vec::new();
    for real in [40, 45, 50] {
        trained.push(service.retrain(&records(real, 10), &CancellationToken::new())?.pair.version().to_string());
    }

    // runs finish within the same second; the oldest must still be the one dropped
    let storage = ArtifactStorage::new(dir.path())?;
    let versions = storage.versions()?;
    assert_eq!(versions, trained[1..].to_vec());
    let active = storage.active_version()?.unwrap();
    assert_eq!(active, trained[2]);

    assert!(matches!(storage.remove_version(&active), Err(ModelError::ActiveVersion(_))));
    Ok(())
}

#[test]
fn test_in_memory_store_has_no_rollback() {
    let store = ModelStore::in_memory();
    assert!(store.storage().is_none());
    assert!(matches!(store.rollback("anything"), Err(ModelError::NotFound(_))));
}
