//! Logging configuration, subscriber setup and run lifecycle events.

use std::env;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::RunSettings;
use crate::pipeline::PipelineOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn logging_config_from_env() -> LoggingConfig {
    logging_config_from_vars(|key| env::var(key).ok())
}

/// Unknown or blank values keep the default for that setting.
pub fn logging_config_from_vars<F>(lookup: F) -> LoggingConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = LoggingConfig::default();
    let var = |key: &str| lookup(key).filter(|raw| !raw.trim().is_empty());

    LoggingConfig {
        level: var("VOLTEDGE_LOG_LEVEL")
            .map(|raw| raw.trim().to_string())
            .unwrap_or(defaults.level),
        format: var("VOLTEDGE_LOG_FORMAT")
            .and_then(|raw| parse_log_format(&raw))
            .unwrap_or(defaults.format),
        include_target: var("VOLTEDGE_LOG_TARGET")
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(defaults.include_target),
    }
}

/// Installs the global subscriber. Events go to stderr so the pipeline's
/// file outputs and any piped stdout stay clean.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.include_target)
        .with_ansi(config.format == LogFormat::Pretty);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_run_start(config: &LoggingConfig, settings: &RunSettings) {
    info!(
        component = "voltedge_pipeline",
        event = "run.start",
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target,
        input = %settings.input_path.display(),
        output_dir = %settings.output_dir.display(),
        target = %settings.pipeline.features.target
    );
}

pub fn log_sink_written(sink: &str, path: &Path, rows: usize) {
    info!(
        component = "sink",
        event = "sink.written",
        sink,
        path = %path.display(),
        rows
    );
}

/// The SQLite store is secondary; its failures are reported, not returned.
pub fn log_sqlite_sink_failed(path: &Path, error: &dyn std::error::Error) {
    warn!(
        component = "sink",
        event = "sink.sqlite.failed",
        path = %path.display(),
        error = %error
    );
}

pub fn log_run_finish(output: &PipelineOutput) {
    let report = &output.report.records;
    info!(
        component = "voltedge_pipeline",
        event = "run.finish",
        raw_rows = output.raw_rows,
        hourly_rows = output.hourly.records.len(),
        feature_rows = output.features.rows.len(),
        invalid_records = report.invalid_records,
        success_rate = report.success_rate(),
        schema_fingerprint = %output.features.schema.fingerprint
    );
}

fn parse_log_format(raw: &str) -> Option<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" => Some(LogFormat::Pretty),
        _ => None,
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
