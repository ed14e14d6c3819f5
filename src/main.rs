use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use procsight::catalog::ProcessIndex;
use procsight::config::AppConfig;
use procsight::reconcile::{render_report, Reconciler};
use procsight::store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yml"));
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    eprintln!("procsight v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Observations: {}", config.io.observations_path.display());
    eprintln!("   Dataset:      {}", config.io.dataset_path.display());
    eprintln!(
        "   Definition:   {}",
        config.io.process_definition_path.display()
    );

    let definition = store::load_process_definition(&config.io.process_definition_path)
        .await
        .context("loading process definition")?;
    let index = ProcessIndex::new(&definition);

    let batch = store::load_observations(&config.io.observations_path)
        .await
        .context("loading observations")?;
    let mut dataset = store::load_dataset(&config.io.dataset_path)
        .await
        .context("loading dataset")?;

    let reconciler = Reconciler::new(config.reconcile.clone());
    let existing = std::mem::take(&mut dataset.instances);
    let (instances, report) = reconciler.reconcile(batch.instances, existing, &index);
    dataset.instances = instances;

    println!("{}", render_report(&report, config.reconcile.dry_run));

    if config.reconcile.dry_run {
        info!("Dry run: dataset not persisted");
    } else {
        let output = config.io.effective_output_path();
        store::save_dataset(output, &dataset)
            .await
            .with_context(|| format!("writing dataset to {}", output.display()))?;
    }

    Ok(())
}
