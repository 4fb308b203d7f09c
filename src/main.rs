//! treeserve
//!
//! Serves the handler units under a directory over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ─────────────▶ http server ──▶ governor ──▶ dispatch
//!                  (CORS, ids,    (admission     │
//!                   tracing)       tokens)       ├─ POST ──▶ request ──▶ routing ──▶ handlers ──▶ response
//!                                                │          normalize    resolve     load+invoke   coerce
//!                                                ├─ GET  ──▶ static files
//!                                                └─ /__api ─▶ docs (parse only)
//!
//!   Cross-cutting: config (file + live reload), observability (logs, metrics),
//!                  lifecycle (signals, graceful shutdown)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use treeserve::config::validation::validate_config;
use treeserve::config::watcher::ConfigWatcher;
use treeserve::config::{load_config, ConfigError, ServerConfig};
use treeserve::lifecycle::signals::spawn_signal_listener;
use treeserve::observability::{logging, metrics};
use treeserve::{HttpServer, Shutdown};

#[derive(Parser, Debug, Clone)]
#[command(name = "treeserve", version)]
#[command(about = "Serve handler units from a directory tree over HTTP", long_about = None)]
struct Args {
    /// TOML configuration file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8000.
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory holding the handler units.
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Number of requests processed at once.
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Load each unit once and never recompile it.
    #[arg(long)]
    no_hot_reload: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Flags win over file values.
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(root) = &self.root {
            config.handlers.root = root.clone();
        }
        if let Some(max) = self.max_concurrency {
            config.limits.max_concurrency = max;
        }
        if self.no_hot_reload {
            config.handlers.hot_reload = false;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "treeserve starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        root = %config.handlers.root.display(),
        hot_reload = config.handlers.hot_reload,
        max_concurrency = config.limits.max_concurrency,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Reloaded files pass through the same flag overrides before they reach the server.
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut file_updates) = ConfigWatcher::new(path);
            let overrides = args.clone();
            tokio::spawn(async move {
                while let Some(mut update) = file_updates.recv().await {
                    overrides.apply(&mut update);
                    if let Err(errors) = validate_config(&update) {
                        tracing::error!(
                            error = %ConfigError::Validation(errors),
                            "Reloaded config rejected, keeping current configuration"
                        );
                        continue;
                    }
                    if update_tx.send(update).is_err() {
                        break;
                    }
                }
            });
            match watcher.run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watching disabled");
                    None
                }
            }
        }
        None => {
            drop(update_tx);
            None
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(Arc::clone(&shutdown));

    let server = HttpServer::new(config);
    server.run(listener, update_rx, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
