//! Startup helpers shared by the simulator binaries

use crate::logging::{self, LogConfig};
use tracing::{info, Level};

/// Identity printed in the banner and used for log and env names
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub default_port: u16,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, default_port: u16) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: description.into(),
            default_port,
        }
    }

    /// `<NAME>_PORT`
    pub fn port_env_var(&self) -> String {
        format!("{}_PORT", self.name.to_uppercase())
    }
}

const BANNER: &str = r#"
 ███████╗██╗███╗   ███╗███████╗██████╗ ██╗   ██╗
 ██╔════╝██║████╗ ████║██╔════╝██╔══██╗██║   ██║
 ███████╗██║██╔████╔██║███████╗██████╔╝██║   ██║
 ╚════██║██║██║╚██╔╝██║╚════██║██╔══██╗╚██╗ ██╔╝
 ███████║██║██║ ╚═╝ ██║███████║██║  ██║ ╚████╔╝
 ╚══════╝╚═╝╚═╝     ╚═╝╚══════╝╚═╝  ╚═╝  ╚═══╝
"#;

pub fn print_startup_banner(service: &ServiceInfo) {
    info!("{}", BANNER);
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Default Port: {}", service.default_port);
}

/// Console plus `<log root>/<service>/` files
///
/// An unparsable `level` falls back to INFO.
pub fn init_logging(
    service: &ServiceInfo,
    log_dir: Option<&str>,
    level: &str,
    enable_ansi: bool,
) -> anyhow::Result<()> {
    let root = logging::init_log_root(log_dir);

    logging::init_with_config(LogConfig {
        service_name: service.name.clone(),
        log_dir: root.join(&service.name),
        level: level.parse::<Level>().unwrap_or(Level::INFO),
        enable_ansi,
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!("{}", e))
}

/// `KEY=VALUE`, ignoring blanks and `#` comments
#[cfg_attr(not(debug_assertions), allow(dead_code))]
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key, value.trim()))
}

/// Debug builds read `.env` without overriding variables already set
pub fn load_development_env() {
    #[cfg(debug_assertions)]
    {
        let Ok(content) = std::fs::read_to_string(".env") else {
            return;
        };
        for (key, value) in content.lines().filter_map(parse_env_line) {
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value);
            }
        }
    }
}

/// Port from config, unless it is unset or the default and `<NAME>_PORT` is set
pub fn get_service_port(config_port: u16, service: &ServiceInfo) -> u16 {
    if config_port != 0 && config_port != service.default_port {
        return config_port;
    }
    std::env::var(service.port_env_var())
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(if config_port == 0 {
            service.default_port
        } else {
            config_port
        })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_port_env_var() {
        let service = ServiceInfo::new("simsrv", "Simulator", 8080);
        assert_eq!(service.port_env_var(), "SIMSRV_PORT");
    }

    #[test]
    fn test_explicit_config_port_wins() {
        let service = ServiceInfo::new("porttestsrv", "Test", 8080);
        assert_eq!(get_service_port(9000, &service), 9000);
        assert_eq!(get_service_port(0, &service), 8080);
    }

    #[test]
    fn test_parse_env_line() {
        assert_eq!(parse_env_line("A=1"), Some(("A", "1")));
        assert_eq!(parse_env_line("  KEY = two words "), Some(("KEY", "two words")));
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line("=orphan"), None);
        assert_eq!(parse_env_line("novalue"), None);
    }
}
