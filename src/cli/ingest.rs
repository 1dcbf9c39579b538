// src/cli/ingest.rs — Preview the artifact for a repository

use std::path::Path;

use crate::infra::config::Config;
use crate::ingest::{self, Artifact, FilterRules, GitIngestor, Ingestor};

/// Build the artifact and print it (or write it to `output`). Local
/// directories are read in place; anything else is cloned. Nothing is stored.
pub async fn run_ingest(config: &Config, location: &str, output: Option<&str>) -> anyhow::Result<()> {
    let artifact = build_artifact(config, location).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &artifact.text)?;
            eprintln!(
                "Wrote {} files ({} bytes) to {}",
                artifact.file_count,
                artifact.text.len(),
                path
            );
        }
        None => print!("{}", artifact.text),
    }
    Ok(())
}

async fn build_artifact(config: &Config, location: &str) -> anyhow::Result<Artifact> {
    let local = Path::new(location);
    if local.is_dir() {
        let rules = FilterRules::from_config(&config.ingest);
        let root = local.to_path_buf();
        let label = location.to_string();
        let artifact =
            tokio::task::spawn_blocking(move || ingest::collect_artifact(&root, &label, &rules))
                .await?;
        return Ok(artifact);
    }

    let location = ingest::validate_location(location)?;
    let ingestor = GitIngestor::new(config.ingest.clone());
    Ok(ingestor.ingest(&location).await?)
}
