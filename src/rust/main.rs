use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jobcheck::{load_dataset, ArtifactStorage, ClassificationService, ModelStore, PipelineConfig, RawInput};
use log::info;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON pipeline configuration; defaults are used for missing keys
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding versioned artifact pairs
    #[arg(short, long, global = true)]
    models_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a new artifact pair from a labelled CSV and activate it
    Train {
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Classify a posting given as text or as an image
    Classify {
        #[arg(short, long)]
        text: Option<String>,
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// List stored artifact pairs
    Versions,
    /// Re-activate a stored artifact pair
    Rollback { version: String },
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path).with_context(|| format!("loading config {:?}", path)),
        None => Ok(PipelineConfig::default()),
    }
}

fn models_dir(args: &Args) -> PathBuf {
    args.models_dir
        .clone()
        .unwrap_or_else(ArtifactStorage::get_default_models_dir)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    let models_dir = models_dir(&args);

    match args.command {
        Command::Train { ref data } => {
            let records = load_dataset(data).with_context(|| format!("reading training data {:?}", data))?;
            let service = Arc::new(
                ClassificationService::builder()
                    .with_config(config)
                    .with_models_dir(&models_dir)
                    .build()
                    .context("building classification service")?,
            );

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, cancelling retraining");
                    ctrl_c.cancel();
                }
            });

            let start_time = Instant::now();
            let outcome = service
                .retrain_in_background(records, cancel)
                .await
                .context("retraining task panicked")?
                .context("retraining failed")?;
            info!("Retraining took {:.2?}", start_time.elapsed());

            println!("Activated version {}", outcome.pair.version());
            println!("{}", serde_json::to_string_pretty(&outcome.metrics)?);
        }
        Command::Classify { ref text, ref image } => {
            let image = image
                .as_ref()
                .map(|path| fs::read(path).with_context(|| format!("reading image {:?}", path)))
                .transpose()?;
            if text.is_none() && image.is_none() {
                bail!("pass --text or --image");
            }

            let service = ClassificationService::builder()
                .with_config(config)
                .with_models_dir(&models_dir)
                .build()
                .context("building classification service")?;
            let input = RawInput::from_submission(text.clone(), image);
            let result = service.classify(&input).context("classification failed")?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Command::Versions => {
            let storage = ArtifactStorage::new(&models_dir)
                .with_context(|| format!("opening models directory {:?}", models_dir))?;
            let active = storage.active_version()?;
            for version in storage.versions()? {
                let metadata = storage.read_metadata(&version)?;
                let marker = if active.as_deref() == Some(version.as_str()) { "*" } else { " " };
                println!(
                    "{} {}  trained {}  terms {}  accuracy {:.4}",
                    marker,
                    version,
                    metadata.trained_at.to_rfc3339(),
                    metadata.vocabulary_size,
                    metadata.metrics.accuracy
                );
            }
        }
        Command::Rollback { ref version } => {
            let storage = ArtifactStorage::new(&models_dir)
                .with_context(|| format!("opening models directory {:?}", models_dir))?;
            let store = ModelStore::with_storage(storage, config.retain_versions);
            store
                .rollback(version)
                .with_context(|| format!("rolling back to {}", version))?;
            println!("Active version is now {}", version);
        }
    }

    Ok(())
}
