// src/main.rs — repochat entry point

use clap::Parser;

use repochat::cli::{self, Cli, Commands};
use repochat::infra::config::Config;
use repochat::infra::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    // Initialize logging (respects REPOCHAT_LOG / RUST_LOG)
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(command.default_log_level());
    logger::init_logging(level);

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match command {
        Commands::Serve { host, port } => cli::serve::run_serve(config, host, port).await,
        Commands::Sessions => cli::sessions::run_list(&config).await,
        Commands::History { id } => cli::sessions::run_history(&config, id).await,
        Commands::Delete { id } => cli::sessions::run_delete(&config, id).await,
        Commands::Ingest { location, output } => {
            cli::ingest::run_ingest(&config, &location, output.as_deref()).await
        }
    }
}
