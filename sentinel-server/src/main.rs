// Sentinel - PPE camera monitor

use clap::Parser;
use sentinel_core::SentinelConfig;
use sentinel_server::http::{cors_layer, create_router};
use sentinel_server::startup;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sentinel-server")]
#[command(about = "Live PPE compliance monitoring for a shared site camera", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[arg(long, short)]
    port: Option<u16>,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_logging(&config);
    info!("Starting Sentinel {}", env!("CARGO_PKG_VERSION"));

    let services = startup::initialize(&config)?;
    let session = services.state.session.clone();

    let app = create_router(services.state).layer(cors_layer(&config.server.cors_origins));

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", addr);

    // Open feeds only end once the camera is released, so release it
    // before the server starts waiting for connections to drain.
    let shutdown = async move {
        wait_for_shutdown().await;
        info!("Stopping services...");
        if let Err(e) = tokio::task::spawn_blocking(move || session.shutdown()).await {
            error!("Failed to release camera: {}", e);
        }
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    if let Err(e) = services.alert_worker.await {
        warn!("Alert worker ended abnormally: {}", e);
    }
    if let Err(e) = services.store.flush().await {
        error!("Failed to flush store: {}", e);
    }
    info!("All services stopped");

    Ok(())
}

/// Defaults, then file, then `SENTINEL_*` environment, then flags.
fn load_config(cli: &Cli) -> anyhow::Result<SentinelConfig> {
    let mut config = match &cli.config {
        Some(path) => SentinelConfig::from_file(path)?,
        None => SentinelConfig::default(),
    };
    config.apply_env();

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.server.log_level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &SentinelConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    if config.server.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
