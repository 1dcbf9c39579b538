// src/infra/paths.rs — Config and data locations
//
// REPOCHAT_HOME overrides everything: config lives directly under it and the
// database under $REPOCHAT_HOME/data. Otherwise config is ~/.repochat/ and
// data follows the platform data dir (XDG_DATA_HOME/repochat on Linux).

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn repochat_home() -> Option<PathBuf> {
    std::env::var_os("REPOCHAT_HOME").map(PathBuf::from)
}

/// Configuration directory: $REPOCHAT_HOME/ or ~/.repochat/
pub fn config_dir() -> PathBuf {
    if let Some(home) = repochat_home() {
        return home;
    }
    match BaseDirs::new() {
        Some(base) => base.home_dir().join(".repochat"),
        None => PathBuf::from(".repochat"),
    }
}

/// Data directory: $REPOCHAT_HOME/data/ or the platform data dir.
pub fn data_dir() -> PathBuf {
    if let Some(home) = repochat_home() {
        return home.join("data");
    }
    match ProjectDirs::from("", "", "repochat") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

pub fn db_path() -> PathBuf {
    data_dir().join("repochat.db")
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub async fn ensure_dirs() -> anyhow::Result<()> {
    for dir in [config_dir(), data_dir()] {
        tokio::fs::create_dir_all(&dir).await?;
    }
    Ok(())
}
