//! ncgrid - gridded extraction server for NetCDF files
//!
//! This is the main entry point for the ncgrid application.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info};

use ncgrid::handlers::{heartbeat::touch_start_time, router};
use ncgrid::state::{AppState, Dataset};
use ncgrid::{init_tracing, log_dataset_validation, Config, NcGridError, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, netcdf_path) = Config::load()?;
    init_tracing(&config.log_level);
    touch_start_time();

    info!("Starting ncgrid v{}", env!("CARGO_PKG_VERSION"));

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    info!("Serving NetCDF file: {:?}", netcdf_path);
    let path_text = netcdf_path.display().to_string();
    let app_state = AppState::new(config.clone(), Dataset::File(netcdf_path))?;

    // Open the file once up front so a bad path fails at startup
    let started = Instant::now();
    let outcome = app_state.validate();
    log_dataset_validation(&path_text, started, &outcome);
    outcome?;

    let app = router(Arc::new(app_state));

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| NcGridError::Config {
                message: format!("Invalid host address: {}", e),
            })?,
        config.server.port,
    ));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NcGridError::Server {
            message: format!("Failed to bind to address: {}", e),
        })?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| NcGridError::Server {
            message: format!("Server error: {}", e),
        })?;

    info!("Server has been gracefully shut down");
    Ok(())
}

/// Wait for a shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
