// src/cli/mod.rs — CLI definition (clap derive)

pub mod ingest;
pub mod serve;
pub mod sessions;

use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::core::{SessionCoordinator, SessionRegistry};
use crate::infra::config::Config;
use crate::ingest::GitIngestor;
use crate::memory::{self, spawn_store_server};
use crate::provider::google::GoogleConnector;
use crate::provider::Connector;

#[derive(Parser)]
#[command(
    name = "repochat",
    about = "Chat with a git repository through Gemini",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log level when REPOCHAT_LOG / RUST_LOG are unset
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Bind address (overrides [server] host)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List stored chat sessions
    Sessions,
    /// Print a session's message history
    History {
        /// Session id
        id: i64,
    },
    /// Delete a session and its messages
    Delete {
        /// Session id
        id: i64,
    },
    /// Build the artifact for a repository without storing it
    Ingest {
        /// Git URL or local directory
        location: String,
        /// Write the artifact here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Commands {
    /// Default log level for this command.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Commands::Serve { .. } => "info",
            _ => "warn",
        }
    }
}

fn connector_for(config: &Config) -> anyhow::Result<Arc<dyn Connector>> {
    match config.model.provider.as_str() {
        "google" | "gemini" => {
            let connector = match config.model.base_url {
                Some(ref base) => GoogleConnector::with_base_url(base.clone()),
                None => GoogleConnector::new(),
            };
            Ok(Arc::new(connector))
        }
        other => anyhow::bail!("Unsupported model provider '{}'. Options: google", other),
    }
}

/// Open the database and wire up a coordinator with an empty registry.
pub fn build_coordinator(config: &Config) -> anyhow::Result<Arc<SessionCoordinator>> {
    open_coordinator(config, connector_for(config)?)
}

/// Coordinator for commands that only read or delete stored sessions. No
/// conversation is ever opened, so the configured provider is not consulted.
pub fn build_offline_coordinator(config: &Config) -> anyhow::Result<Arc<SessionCoordinator>> {
    open_coordinator(config, Arc::new(GoogleConnector::new()))
}

fn open_coordinator(
    config: &Config,
    connector: Arc<dyn Connector>,
) -> anyhow::Result<Arc<SessionCoordinator>> {
    let db_path = config.storage.resolved_db_path();
    tracing::debug!("Opening database at {}", db_path.display());
    let store = memory::open_store(&db_path)?;
    let (handle, _join) = spawn_store_server(store);

    Ok(Arc::new(SessionCoordinator::new(
        handle,
        Arc::new(SessionRegistry::new()),
        Arc::new(GitIngestor::new(config.ingest.clone())),
        connector,
        config.model.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["repochat"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli =
            Cli::try_parse_from(["repochat", "serve", "--host", "0.0.0.0", "-p", "9000"]).unwrap();
        match cli.command {
            Some(Commands::Serve { host, port }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "repochat",
            "history",
            "7",
            "--log-level",
            "debug",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(cli.command, Some(Commands::History { id: 7 })));
    }

    #[test]
    fn test_history_rejects_non_numeric_id() {
        assert!(Cli::try_parse_from(["repochat", "history", "abc"]).is_err());
    }

    #[test]
    fn test_default_log_level() {
        let serve = Commands::Serve {
            host: None,
            port: None,
        };
        assert_eq!(serve.default_log_level(), "info");
        assert_eq!(Commands::Sessions.default_log_level(), "warn");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = Config::default();
        config.model.provider = "openai".into();
        assert!(connector_for(&config).is_err());
    }
}
