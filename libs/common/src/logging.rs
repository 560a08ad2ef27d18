//! Logging for the simulator binaries
//!
//! One reloadable `EnvFilter` sits in front of three outputs: the console,
//! a daily `<service>.log` file and a daily `<service>_api.log` file that
//! only receives events on the [`API_ACCESS_TARGET`] target. The filter can
//! be swapped at runtime through [`set_log_level`].

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter,
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

pub const API_ACCESS_TARGET: &str = "api_access";
pub const LOG_DIR_ENV: &str = "SIMSRV_LOG_DIR";
const DEFAULT_LOG_DIR: &str = "logs";

type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Live logging state, set once by [`init_with_config`]
struct LogState {
    handle: FilterHandle,
    filter: Mutex<String>,
    _guards: Vec<WorkerGuard>,
}

static STATE: OnceLock<LogState> = OnceLock::new();
static LOG_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// `2025-12-02T00:50:44.809512Z [INFO] message`
struct BracketedLevel;

impl BracketedLevel {
    fn ansi(level: Level) -> &'static str {
        match level {
            Level::ERROR => "\x1b[31m",
            Level::WARN => "\x1b[33m",
            Level::INFO => "\x1b[32m",
            Level::DEBUG => "\x1b[34m",
            Level::TRACE => "\x1b[35m",
        }
    }
}

impl<S, N> FormatEvent<S, N> for BracketedLevel
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");

        if writer.has_ansi_escapes() {
            write!(writer, "{} {}[{}]\x1b[0m ", stamp, Self::ansi(level), level)?;
        } else {
            write!(writer, "{} [{}] ", stamp, level)?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Resolve and pin the log root: `SIMSRV_LOG_DIR`, then `config_dir`, then `logs`
///
/// Only the first call has an effect.
pub fn init_log_root(config_dir: Option<&str>) -> &'static Path {
    LOG_ROOT.get_or_init(|| {
        std::env::var(LOG_DIR_ENV)
            .ok()
            .or_else(|| config_dir.map(str::to_string))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    })
}

pub fn get_log_root() -> PathBuf {
    match LOG_ROOT.get() {
        Some(root) => root.clone(),
        None => std::env::var(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR)),
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub service_name: String,
    /// Directory for this service's files, usually `<root>/<service>`
    pub log_dir: PathBuf,
    /// Used when `RUST_LOG` is unset
    pub level: Level,
    pub enable_ansi: bool,
    /// Console only when false
    pub enable_file: bool,
    /// Separate access log for [`API_ACCESS_TARGET`]
    pub enable_api_log: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "simsrv".to_string(),
            log_dir: get_log_root(),
            level: Level::INFO,
            enable_ansi: true,
            enable_file: true,
            enable_api_log: true,
        }
    }
}

impl LogConfig {
    /// `RUST_LOG` wins; the access target is appended unless already named
    fn directives(&self) -> String {
        let access = if self.enable_api_log { "info" } else { "off" };
        let base = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| self.level.as_str().to_lowercase());
        if base.contains(API_ACCESS_TARGET) {
            base
        } else {
            format!("{},{}={}", base, API_ACCESS_TARGET, access)
        }
    }
}

fn file_layer<S>(
    dir: &Path,
    file_name: String,
    access_only: bool,
    guards: &mut Vec<WorkerGuard>,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));
    guards.push(guard);

    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .event_format(BracketedLevel)
        .with_filter(filter::filter_fn(move |meta| {
            (meta.target() == API_ACCESS_TARGET) == access_only
        }))
        .boxed()
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed or the log directory cannot
/// be created.
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let directives = config.directives();
    let (filter_layer, handle) = reload::Layer::new(EnvFilter::try_new(&directives)?);

    let mut guards = Vec::new();
    let (main_file, access_file) = if config.enable_file {
        std::fs::create_dir_all(&config.log_dir)?;
        let main = file_layer(
            &config.log_dir,
            format!("{}.log", config.service_name),
            false,
            &mut guards,
        );
        let access = config.enable_api_log.then(|| {
            file_layer(
                &config.log_dir,
                format!("{}_api.log", config.service_name),
                true,
                &mut guards,
            )
        });
        (Some(main), access)
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_ansi(config.enable_ansi)
                .event_format(BracketedLevel),
        )
        .with(main_file)
        .with(access_file)
        .try_init()?;

    let _ = STATE.set(LogState {
        handle,
        filter: Mutex::new(directives),
        _guards: guards,
    });

    if config.enable_file {
        tracing::info!("Logging {} to {}", config.service_name, config.log_dir.display());
    }
    Ok(())
}

/// Replace the active filter, e.g. `debug` or `info,sensim_protocols=trace`
pub fn set_log_level(level: &str) -> Result<(), String> {
    let state = STATE
        .get()
        .ok_or("Logging not initialized with reload support")?;
    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;
    state
        .handle
        .reload(filter)
        .map_err(|e| format!("Failed to reload log filter: {}", e))?;
    *state.filter.lock() = level.to_string();

    tracing::info!("Log level changed to: {}", level);
    Ok(())
}

pub fn get_log_level() -> String {
    STATE
        .get()
        .map(|state| state.filter.lock().clone())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Access log middleware
///
/// Writes go out at INFO, reads at DEBUG, both on [`API_ACCESS_TARGET`]:
///
/// ```ignore
/// Router::new()
///     .route(...)
///     .layer(axum::middleware::from_fn(common::logging::http_request_logger))
/// ```
pub async fn http_request_logger(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = std::time::Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if method == axum::http::Method::GET || method == axum::http::Method::HEAD {
        tracing::debug!(
            target: "api_access",
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            "HTTP request"
        );
    } else {
        tracing::info!(
            target: "api_access",
            method = %method,
            path = %path,
            status,
            elapsed_ms,
            "HTTP request"
        );
    }

    response
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_directives_appends_access_target() {
        let config = LogConfig {
            level: Level::DEBUG,
            enable_api_log: false,
            ..Default::default()
        };
        let directives = config.directives();
        assert!(directives.ends_with("api_access=off"));
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(directives, "debug,api_access=off");
        }
    }

    #[test]
    fn test_ansi_colors_distinct() {
        assert_ne!(BracketedLevel::ansi(Level::WARN), BracketedLevel::ansi(Level::ERROR));
    }

    #[test]
    fn test_set_level_requires_init() {
        if STATE.get().is_none() {
            assert!(set_log_level("debug").is_err());
            assert_eq!(get_log_level(), "unknown");
        }
    }
}
