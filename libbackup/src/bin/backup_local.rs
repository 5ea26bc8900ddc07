use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use common::Status;
use libbackup::store::filesystem::FilesystemStore;
use libbackup::{
    BackendRegistry, BackupConfig, Backupper, InMemorySourcer, ShardSource, load_config,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Run one backup into a local directory", long_about = None)]
struct Args {
    /// Backup root directory
    #[arg(long, env = "BACKUP_ROOTDIR", default_value = "/tmp/rk8s-backups")]
    root: PathBuf,

    /// Optional YAML configuration file
    #[arg(short, long, env = "BACKUP_CONFIG")]
    config: Option<String>,

    /// Backup id, generated when omitted
    #[arg(long)]
    id: Option<String>,

    /// Classes to back up, in order
    #[arg(long = "class", default_values_t = vec!["Article".to_string(), "Author".to_string()])]
    classes: Vec<String>,
}

fn demo_sourcer(classes: &[String]) -> InMemorySourcer {
    classes.iter().fold(InMemorySourcer::new(), |sourcer, class| {
        (0..2).fold(sourcer, |sourcer, i| {
            sourcer.with_shard(
                class,
                ShardSource {
                    name: format!("shard-{i}"),
                    node: "node-1".to_string(),
                    files: vec![(
                        "objects.db".to_string(),
                        format!("{class} shard {i}").into_bytes(),
                    )],
                },
            )
        })
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => BackupConfig::default(),
    };
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| format!("backup-{}", uuid::Uuid::new_v4()));

    let store = Arc::new(FilesystemStore::new(&args.root));
    let mut registry = BackendRegistry::new();
    registry.register(store.clone());
    let backupper = Backupper::new(
        config,
        Arc::new(demo_sourcer(&args.classes)),
        Arc::new(registry),
    );
    let mut outcomes = backupper.subscribe();

    let meta = backupper.backup(store, &id, args.classes.clone()).await?;
    info!(backup_id = %id, path = %meta.path, "backup admitted");
    backupper
        .coordinator()
        .commit(&id)
        .context("failed to signal commit")?;

    let outcome = outcomes
        .wait_for(|o| o.as_ref().is_some_and(|o| o.id == id))
        .await?
        .clone();
    let status = backupper.status("filesystem", &id).await?;
    println!("{} {} {}", status.id, status.status, status.path);

    if let Some(outcome) = outcome
        && outcome.status != Status::Success
    {
        bail!(
            "backup {id} failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}
