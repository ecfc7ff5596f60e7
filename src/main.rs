//! # gRPC Bridge Gateway - Main Entry Point
//!
//! Boots the gateway: observability first, then configuration, then the
//! backend connection, then the HTTP listener. Shutdown is signal
//! driven (SIGTERM/SIGINT) and flows through a cancellation token into
//! the server's bounded drain.

use tokio::signal;
use tracing::{error, info};

use grpc_bridge_gateway::{GatewayConfig, GatewayResult, GatewayServer};

#[tokio::main]
async fn main() -> GatewayResult<()> {
    init_observability();

    info!("🚀 Starting gRPC bridge gateway");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config().await?;
    info!(
        bind_addr = %config.server.bind_addr,
        backend = %config.backend.target,
        unary_enabled = config.bridges.unary_enabled,
        "✅ Configuration loaded"
    );

    let server = match GatewayServer::connect(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start gateway: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.cancel();
    });

    server.run().await?;

    info!("✅ Gateway shutdown complete");
    Ok(())
}

fn init_observability() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let json_logs = std::env::var("GATEWAY_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "grpc_bridge_gateway=info,tower_http=info".into());

    if json_logs {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(filter)
            .init();
    }
}

/// Load configuration from `GATEWAY_CONFIG_PATH` when set, otherwise use
/// built-in defaults. Environment overrides apply either way.
async fn load_config() -> GatewayResult<GatewayConfig> {
    let mut config = match std::env::var("GATEWAY_CONFIG_PATH") {
        Ok(path) => {
            info!(path = %path, "📋 Loading configuration file");
            GatewayConfig::load_from_file(&path).await.map_err(|e| {
                error!("Failed to load configuration from {}: {}", path, e);
                e
            })?
        }
        Err(_) => GatewayConfig::default(),
    };

    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

async fn wait_for_shutdown_signal() {
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
        _ = ctrl_c => info!("📡 Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        _ = terminate => info!("📡 Received SIGTERM, initiating graceful shutdown..."),
    }
}
