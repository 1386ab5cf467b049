//! Mapsync Daemon - Headless Sync Host
//!
//! Hosts one sync session over standard I/O. The backend writes signal and
//! reply frames to stdin and reads call and query frames from stdout, one
//! JSON object per line. Logs go to stderr so stdout stays a clean frame
//! stream.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults
//! backend | mapsync-daemon | backend-sink
//!
//! # With config file
//! mapsync-daemon --config ~/.config/mapsync/mapsync.toml
//!
//! # Enrich a different component type, patch colors in place
//! mapsync-daemon --enrich-type Splitter --recolor restyle
//!
//! # Verbose logging
//! RUST_LOG=debug mapsync-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGINT`: Graceful shutdown (same as closing stdin)

mod server;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info, warn};

use mapsync_core::{load_config, load_config_from_path, ConfigOverrides, RecolorStrategy};

use server::DaemonServer;

/// Mapsync Daemon - mirrors a network model onto a headless map over JSON lines
#[derive(Parser, Debug)]
#[command(name = "mapsync-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "MAPSYNC_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Component type whose markers get bandwidth enrichment
    #[arg(long, value_name = "TYPE")]
    enrich_type: Option<String>,

    /// How connection colors change (recreate, restyle)
    #[arg(long, value_name = "STRATEGY", value_parser = parse_strategy)]
    recolor: Option<RecolorStrategy>,

    /// Bandwidth query timeout in milliseconds
    #[arg(long, value_name = "MS")]
    query_timeout_ms: Option<u64>,

    /// Tile source for the headless base layer
    #[arg(long, value_name = "URL")]
    tile_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "MAPSYNC_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn parse_strategy(s: &str) -> Result<RecolorStrategy, String> {
    RecolorStrategy::parse(s).ok_or_else(|| format!("unknown recolor strategy: {s}"))
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref kind) = self.enrich_type {
            overrides = overrides.with_enrichment_type(kind.clone());
        }
        if let Some(strategy) = self.recolor {
            overrides = overrides.with_recolor_strategy(strategy);
        }
        if let Some(ms) = self.query_timeout_ms {
            overrides = overrides.with_query_timeout_ms(ms);
        }
        if let Some(ref url) = self.tile_url {
            overrides = overrides.with_tile_url(url.clone());
        }
        overrides
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("mapsync_daemon={level},mapsync_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Resolve when Ctrl-C arrives; never resolve if the handler cannot be installed
async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT, initiating shutdown"),
        Err(e) => {
            warn!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Mapsync Daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let loaded = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    };
    let mut config = loaded.context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(source = %config.source(), "Configuration resolved");
    if let Some(ref path) = config.config_file_path {
        info!(config_path = ?path, "Config file");
    }

    let server = DaemonServer::new(config);
    let stdin = BufReader::new(tokio::io::stdin());
    let result = server.run(stdin, tokio::io::stdout(), ctrl_c()).await;

    match result {
        Ok(summary) => {
            info!(total = summary.total(), "Mapsync daemon stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Daemon stopped with error");
            Err(e)
        }
    }
}
