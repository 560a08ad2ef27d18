//! Point simulator service (`simsrv`)

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use common::service_bootstrap::ServiceInfo;
use errors::{SimError, SimResult};
use sensim_model::SystemTimeProvider;
use simsrv::{
    api::create_api_routes,
    bootstrap::{self, Args},
    config::DEFAULT_PORT,
    SimConfig, Simulator,
};

#[tokio::main]
async fn main() -> SimResult<()> {
    let args = Args::parse();

    let service_info = ServiceInfo::new(
        "simsrv",
        "Building Automation Point Simulator - Modbus / BACnet / MQTT",
        DEFAULT_PORT,
    );

    // Config not loaded yet; log root comes from SIMSRV_LOG_DIR or the default
    bootstrap::initialize_logging(&args, &service_info, None)?;
    if !args.no_color {
        common::service_bootstrap::print_startup_banner(&service_info);
    }

    if args.validate {
        bootstrap::validate_configuration(&args.config)?;
        info!("Validation completed successfully");
        return Ok(());
    }

    let config = match SimConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration, using defaults: {}", e);
            SimConfig::default()
        },
    };
    info!("Configuration loaded from {}", args.config.display());

    let bind_address =
        bootstrap::determine_bind_address(args.bind_address.clone(), &config, &service_info);
    let addr: SocketAddr = bind_address.parse().map_err(|e| SimError::InvalidConfig {
        field: "service.bind_address".to_string(),
        reason: format!("'{}': {}", bind_address, e),
    })?;

    let simulator = Simulator::build(config, Arc::new(SystemTimeProvider))?;
    let shutdown_token = CancellationToken::new();
    let mut handles = simulator.start(shutdown_token.clone()).await;

    let app = create_api_routes(simulator.app_state());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SimError::ConnectionFailed {
            endpoint: addr.to_string(),
            reason: e.to_string(),
        })?;

    info!("API server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let server_token = shutdown_token.clone();
    handles.push(tokio::spawn(async move {
        let shutdown = async move { server_token.cancelled().await };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Server error: {}", e);
        }
    }));

    common::shutdown::cancel_on_shutdown(shutdown_token).await;
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            error!("Task failed during shutdown: {}", e);
        }
    }

    info!("simsrv stopped");
    Ok(())
}
