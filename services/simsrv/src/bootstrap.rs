//! Service bootstrap
//!
//! Command line, logging and the `--validate` dry run.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use common::service_bootstrap::ServiceInfo;
use errors::{SimError, SimResult};
use sensim_model::load_point_set;
use sensim_routing::ProjectionMaps;

use crate::config::{SimConfig, DEFAULT_CONFIG_PATH};

/// Command-line arguments for simsrv
#[derive(Parser, Clone, Debug)]
#[command(
    name = "simsrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Building Automation Point Simulator",
    long_about = None
)]
pub struct Args {
    /// Service configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,

    /// Bind address for the control API, overrides the config
    #[arg(short = 'b', long)]
    pub bind_address: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Validation mode - only validate configuration without starting service
    #[arg(long)]
    pub validate: bool,
}

/// Initialize logging before the config file is read
///
/// Log root priority: `SIMSRV_LOG_DIR`, then `log_dir`, then `logs`.
pub fn initialize_logging(
    args: &Args,
    service_info: &ServiceInfo,
    log_dir: Option<&str>,
) -> SimResult<()> {
    common::service_bootstrap::load_development_env();
    common::service_bootstrap::init_logging(service_info, log_dir, &args.log_level, !args.no_color)
        .map_err(|e| SimError::Configuration(format!("Failed to init logging: {}", e)))
}

/// Resolve the API bind address: CLI flag, then config host and port
pub fn determine_bind_address(
    cli_address: Option<String>,
    config: &SimConfig,
    service_info: &ServiceInfo,
) -> String {
    if let Some(address) = cli_address {
        return address;
    }
    let port = common::service_bootstrap::get_service_port(config.service.port, service_info);
    format!("{}:{}", config.service.host, port)
}

/// Load every input file strictly and report what would run
///
/// Unlike startup, missing or malformed point files are errors here.
pub fn validate_configuration(config_path: &Path) -> SimResult<SimConfig> {
    info!("Validating configuration: {}", config_path.display());
    let config = SimConfig::load(config_path)?;

    let points = if config.files.points.exists() {
        let points = load_point_set(&config.files.points)?;
        info!(
            "Point set {}: {} point(s)",
            config.files.points.display(),
            points.len()
        );
        points
    } else {
        warn!(
            "Point set {} not found, built-in defaults will be used",
            config.files.points.display()
        );
        sensim_model::default_points()
    };

    for path in [
        &config.files.register_map,
        &config.files.object_map,
        &config.files.topic_map,
    ] {
        if !path.exists() {
            warn!("{} not found, default map will be generated", path.display());
        }
    }

    let maps = ProjectionMaps::load(&config.files.map_paths(), &points);
    info!(
        "Maps: {} register slot(s), {} object(s), {} topic(s)",
        maps.registers.len(),
        maps.objects.len(),
        maps.topics.len()
    );
    info!(
        "Register server: {} ({})",
        config.register.bind,
        if config.register.enabled { "enabled" } else { "disabled" }
    );
    info!(
        "Telemetry: {} ({})",
        config.telemetry.mqtt.endpoint(),
        if config.telemetry.enabled { "enabled" } else { "disabled" }
    );

    Ok(config)
}
