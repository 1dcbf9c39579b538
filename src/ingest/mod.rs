// src/ingest/mod.rs — Repository ingestion: clone, filter, concatenate
//
// A repository becomes one text artifact: a summary line followed by every
// retained file wrapped in START/END markers naming its relative path.

pub mod clone;
pub mod filter;

use async_trait::async_trait;
use std::path::Path;
use walkdir::WalkDir;

use crate::infra::config::IngestConfig;
use crate::infra::errors::RepoChatError;
pub use filter::FilterRules;

/// The concatenated, filtered contents of a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub text: String,
    pub file_count: usize,
}

/// Turns a repository location into an artifact.
#[async_trait]
pub trait Ingestor: Send + Sync {
    async fn ingest(&self, location: &str) -> Result<Artifact, RepoChatError>;
}

/// Ingestor backed by `git clone` into a temporary directory.
pub struct GitIngestor {
    config: IngestConfig,
    rules: FilterRules,
}

impl GitIngestor {
    pub fn new(config: IngestConfig) -> Self {
        let rules = FilterRules::from_config(&config);
        Self { config, rules }
    }
}

#[async_trait]
impl Ingestor for GitIngestor {
    async fn ingest(&self, location: &str) -> Result<Artifact, RepoChatError> {
        // Removed on drop, so both the success and the error paths clean up.
        let workdir = tempfile::Builder::new().prefix("repochat-").tempdir()?;
        let shown = redact_location(location);
        tracing::info!("Cloning {} to {}", shown, workdir.path().display());

        clone::clone_shallow(
            &self.config.git_binary,
            location,
            self.config.clone_depth,
            workdir.path(),
        )
        .await?;

        let root = workdir.path().to_path_buf();
        let rules = self.rules.clone();
        let label = shown.clone();
        let artifact = tokio::task::spawn_blocking(move || collect_artifact(&root, &label, &rules))
            .await
            .map_err(|e| anyhow::anyhow!("ingest worker failed: {e}"))?;

        tracing::info!(
            files = artifact.file_count,
            bytes = artifact.text.len(),
            "Processed {}",
            shown
        );

        let path = workdir.path().to_path_buf();
        if let Err(e) = workdir.close() {
            tracing::warn!("Cleanup of {} failed: {}", path.display(), e);
        }
        Ok(artifact)
    }
}

/// Walk `root` and build the artifact. `label` names the source in the
/// summary line. Files are visited in file-name order within each directory.
pub fn collect_artifact(
    root: &Path,
    label: &str,
    rules: &FilterRules,
) -> Artifact {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !rules.is_ignored_dir(&entry.file_name().to_string_lossy())
        });

    let mut blocks = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if !rules.should_process_file(rel) {
            continue;
        }

        match std::fs::read(entry.path()) {
            Ok(bytes) => {
                let content = decode_ignoring_invalid(&bytes);
                blocks.push(render_block(&posix_path(rel), &content));
            }
            Err(e) => tracing::warn!("Error reading {}: {}", entry.path().display(), e),
        }
    }

    let file_count = blocks.len();
    let mut text = format!("Processed {file_count} files from {label}.\n");
    text.push_str(&blocks.join("\n"));

    Artifact { text, file_count }
}

/// One file's block in the artifact.
pub fn render_block(rel_path: &str, content: &str) -> String {
    format!("--- START FILE: {rel_path} ---\n{content}\n--- END FILE: {rel_path} ---\n")
}

/// UTF-8 decode that drops undecodable bytes instead of failing.
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

fn posix_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// The location with any userinfo password or token removed, for logs and
/// error messages. Non-URL locations are returned unchanged.
pub fn redact_location(location: &str) -> String {
    match url::Url::parse(location) {
        Ok(mut url) if url.password().is_some() || !url.username().is_empty() => {
            let _ = url.set_password(None);
            let _ = url.set_username("");
            url.to_string()
        }
        _ => location.to_string(),
    }
}

/// Check that a location looks like something git can clone before we spend
/// a clone on it. Accepts URLs (http, https, git, ssh, file) and scp-style
/// `user@host:path`. Returns the trimmed location.
pub fn validate_location(location: &str) -> Result<String, RepoChatError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(RepoChatError::InvalidRequest(
            "repo_url cannot be empty".into(),
        ));
    }
    if location.starts_with('-') || location.chars().any(char::is_whitespace) {
        return Err(RepoChatError::InvalidRequest(format!(
            "'{location}' is not a repository location"
        )));
    }

    if let Ok(url) = url::Url::parse(location) {
        return match url.scheme() {
            "http" | "https" | "git" | "ssh" | "file" => Ok(location.to_string()),
            other => Err(RepoChatError::InvalidRequest(format!(
                "unsupported scheme '{other}' in repo_url"
            ))),
        };
    }

    if let Some((user_host, path)) = location.split_once(':') {
        if user_host.contains('@') && !user_host.contains('/') && !path.is_empty() {
            return Ok(location.to_string());
        }
    }

    Err(RepoChatError::InvalidRequest(format!(
        "'{location}' is not a repository location"
    )))
}
