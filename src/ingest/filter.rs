// src/ingest/filter.rs — Which directories and files make it into an artifact

use std::collections::HashSet;
use std::path::Path;

use crate::infra::config::IngestConfig;

/// Directory/file filter built from the `[ingest]` config section.
#[derive(Debug, Clone)]
pub struct FilterRules {
    ignored_dirs: HashSet<String>,
    ignored_files: HashSet<String>,
    /// Extensions without the leading dot. Matching is case-sensitive.
    extensions: HashSet<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

impl FilterRules {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            ignored_dirs: config.ignored_dirs.iter().cloned().collect(),
            ignored_files: config.ignored_files.iter().cloned().collect(),
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Directories pruned from the walk: tooling/dependency dirs and
    /// anything hidden.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignored_dirs.contains(name)
    }

    /// Decide whether a file (path relative to the repository root) is kept.
    pub fn should_process_file(&self, rel_path: &Path) -> bool {
        let Some(name) = rel_path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if self.ignored_files.contains(name) || name.starts_with('.') {
            return false;
        }

        let allowed = rel_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(ext));
        if !allowed {
            return false;
        }

        // Also reject files reached through an ignored parent, in case the
        // walk was not pruned (e.g. a caller handing in paths directly).
        !rel_path
            .parent()
            .into_iter()
            .flat_map(|p| p.components())
            .filter_map(|c| c.as_os_str().to_str())
            .any(|part| self.ignored_dirs.contains(part))
    }
}
