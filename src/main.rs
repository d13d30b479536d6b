use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use poker_server::settings::{load_settings_from_path, settings_path, Settings};
use poker_store::{Database, SessionRepo};

/// Planning-poker session server.
#[derive(Debug, Parser)]
#[command(name = "poker", version)]
struct Cli {
    /// Settings file (JSON). Defaults to ~/.poker/settings.json.
    #[arg(long, env = "POKER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// SQLite database file.
    #[arg(long)]
    db: Option<PathBuf>,

    #[arg(long)]
    log_level: Option<String>,

    /// Human-readable logs instead of JSON lines.
    #[arg(long)]
    pretty_logs: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(db) = &self.db {
            settings.server.db_path = db.to_string_lossy().into_owned();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.pretty_logs {
            settings.logging.json = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("loading settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate()?;

    poker_telemetry::init_telemetry(&settings.telemetry_config())?;
    tracing::info!(settings = %path.display(), "starting poker server");

    let db_path = PathBuf::from(&settings.server.db_path);
    let db = Database::open(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;

    let store = Arc::new(SessionRepo::new(db));
    let handle = poker_server::start(settings.server_config(), store)
        .await
        .context("starting server")?;
    tracing::info!(port = handle.port, "poker server ready");

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl-c")?;

    tracing::info!("shutting down");
    Ok(())
}
