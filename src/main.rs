//! Mirror Map Server
//!
//! Reads geolocated events, batches them and streams the batches to map
//! viewers over WebSocket.
//!
//! Run with: `geoip-lookup | mirror-map --config config.toml`
//!
//! Send SIGHUP to reload the `[[projects]]` table from the config file.

use anyhow::Context;
use clap::Parser;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirror_map::config::{
    generate_default_config, reload_projects, Config, LoggingConfig, SourceConfig,
};
use mirror_map::{
    serve, spawn_reader, AppState, Batcher, GeoEvent, Hub, HubConfig, ProjectCatalog,
};

#[derive(Parser)]
#[command(name = "mirror-map")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live map of mirror traffic")]
struct Cli {
    /// Config file (default: first of ~/.config/mirror-map/config.toml,
    /// /etc/mirror-map/config.toml, ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a sample config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config_path = cli.config.or_else(Config::locate);
    let config = match &config_path {
        Some(path) => Config::load_with_env(path)?,
        None => Config::from_env(),
    };

    init_logging(&config.logging);

    tracing::info!("Starting mirror map v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }

    let catalog = Arc::new(ProjectCatalog::new(config.projects.clone())?);
    tracing::info!(projects = catalog.len(), "Project table loaded");

    let hub = Hub::spawn(HubConfig::from(&config.hub));

    let (events_tx, events_rx) = mpsc::channel::<GeoEvent>(config.source.event_buffer.max(1));
    tokio::spawn(Batcher::new(catalog.subscribe()).run(events_rx, hub.clone()));
    spawn_source(&config.source, events_tx)?;

    #[cfg(unix)]
    spawn_reload_on_hangup(config_path.clone(), Arc::clone(&catalog));

    let state = AppState::new(hub, catalog, config.hub.queue_capacity);
    serve(state, &config.server).await?;

    Ok(())
}

/// Initialize tracing from `RUST_LOG`, falling back to the configured level
fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("mirror_map={},tower_http=info", config.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Start reading events from the configured file, or stdin
fn spawn_source(config: &SourceConfig, events: mpsc::Sender<GeoEvent>) -> anyhow::Result<()> {
    match &config.path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open event source {:?}", path))?;
            tracing::info!("Reading events from {:?}", path);
            spawn_reader(move || BufReader::new(file), events)?;
        }
        None => {
            tracing::info!("Reading events from stdin");
            spawn_reader(|| std::io::stdin().lock(), events)?;
        }
    }
    Ok(())
}

/// Reload the project table from the config file on every SIGHUP
#[cfg(unix)]
fn spawn_reload_on_hangup(path: Option<PathBuf>, catalog: Arc<ProjectCatalog>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(signal) => signal,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGHUP handler, reload disabled");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            match path.as_deref() {
                Some(path) => {
                    if let Err(e) = reload_projects(path, &catalog) {
                        tracing::warn!(error = %e, "Project reload failed, keeping current table");
                    }
                }
                None => tracing::warn!("SIGHUP received but no config file is in use"),
            }
        }
    });
}
