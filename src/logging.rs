//! Logging configuration for vulnrag

use std::path::Path;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{
    self,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::Result;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "vulnrag.log";

/// Initialize logging with configuration
pub fn init_logging_with_config(config: Option<&crate::config::AppConfig>) -> Result<()> {
    let level = config.map_or("info", |c| c.logging.level.as_str());
    if config.is_some() {
        init_logging_with_level(level)
    } else {
        // Fallback to environment variable or default
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,vulnrag=debug"));
        init_with_filter(env_filter, level)
    }
}

/// Export `logging.backtrace` as `RUST_BACKTRACE` unless the environment
/// already sets it
pub fn apply_backtrace_setting(config: &crate::config::AppConfig) {
    let current = std::env::var("RUST_BACKTRACE").ok();
    if let Some(value) = backtrace_override(config.logging.backtrace, current.as_deref()) {
        std::env::set_var("RUST_BACKTRACE", value);
    }
}

fn backtrace_override(enabled: bool, current: Option<&str>) -> Option<&'static str> {
    match current {
        Some(_) => None,
        None if enabled => Some("1"),
        None => Some("0"),
    }
}

/// Initialize logging with custom log level
pub fn init_logging_with_level(level: &str) -> Result<()> {
    let env_filter = EnvFilter::new(format!("{level},vulnrag={level}"));
    init_with_filter(env_filter, level)
}

fn init_with_filter(env_filter: EnvFilter, level: &str) -> Result<()> {
    let logs_dir = Path::new(LOG_DIR);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false); // No colors in file

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::VulnRagError::Custom(format!("Failed to initialize logging: {e}")))?;

    tracing::info!("Logging initialized with level: {level} - console and file output enabled");
    tracing::info!("Log files will be saved to: {LOG_DIR}/{LOG_FILE}.YYYY-MM-DD");

    // The writer thread must outlive every subscriber call
    std::mem::forget(guard);

    Ok(())
}

/// Initialize simple logging for testing
pub fn init_simple_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init()
        .map_err(|e| crate::VulnRagError::Custom(format!("Failed to initialize logging: {e}")))?;

    tracing::info!("Simple logging initialized");
    Ok(())
}
