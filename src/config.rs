//! Pipeline configuration assembled from `VOLTEDGE_*` environment variables.
//!
//! Unlike logging settings, a malformed pipeline value is an error rather than
//! a silent fallback.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{FeatureConfig, TargetField};
use crate::observability::parse_bool;
use crate::raw_reader::ReaderConfig;
use crate::resample::ResampleConfig;
use crate::validate::ValidationConfig;

pub const DEFAULT_INPUT_PATH: &str = "data/household_power_consumption.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "data/processed";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub reader: ReaderConfig,
    pub resample: ResampleConfig,
    pub validation: ValidationConfig,
    pub features: FeatureConfig,
    pub drop_incomplete_rows: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    /// Secondary hourly store; skipped when unset.
    pub sqlite_path: Option<PathBuf>,
    pub pipeline: PipelineConfig,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sqlite_path: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

pub fn run_settings_from_env() -> Result<RunSettings, ConfigError> {
    run_settings_from_vars(|key| env::var(key).ok())
}

/// Builds settings from an arbitrary variable lookup. Unset or blank
/// variables keep their defaults.
pub fn run_settings_from_vars<F>(lookup: F) -> Result<RunSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
    };

    let mut settings = RunSettings::default();

    if let Some(raw) = var("VOLTEDGE_INPUT") {
        settings.input_path = PathBuf::from(raw);
    }
    if let Some(raw) = var("VOLTEDGE_OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(raw);
    }
    if let Some(raw) = var("VOLTEDGE_SQLITE_PATH") {
        settings.sqlite_path = Some(PathBuf::from(raw));
    }

    let pipeline = &mut settings.pipeline;
    if let Some(raw) = var("VOLTEDGE_LAG_HOURS") {
        pipeline.features.lag_hours = parse_list("VOLTEDGE_LAG_HOURS", &raw)?;
    }
    if let Some(raw) = var("VOLTEDGE_ROLLING_WINDOWS") {
        pipeline.features.rolling_windows = parse_list("VOLTEDGE_ROLLING_WINDOWS", &raw)?;
    }
    if let Some(raw) = var("VOLTEDGE_CALENDAR_FEATURES") {
        pipeline.features.include_calendar = parse_flag("VOLTEDGE_CALENDAR_FEATURES", &raw)?;
    }
    if let Some(raw) = var("VOLTEDGE_CYCLICAL_FEATURES") {
        pipeline.features.include_cyclical = parse_flag("VOLTEDGE_CYCLICAL_FEATURES", &raw)?;
    }
    if let Some(raw) = var("VOLTEDGE_TARGET") {
        pipeline.features.target =
            TargetField::from_str(&raw).map_err(|err| invalid("VOLTEDGE_TARGET", &raw, err))?;
    }
    if let Some(raw) = var("VOLTEDGE_GAP_FILL_MINUTES") {
        pipeline.resample.max_fill_gap_minutes = parse_number("VOLTEDGE_GAP_FILL_MINUTES", &raw)?;
    }
    if let Some(raw) = var("VOLTEDGE_MAX_MISSING_RATIO") {
        let ratio: f64 = parse_number("VOLTEDGE_MAX_MISSING_RATIO", &raw)?;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(invalid(
                "VOLTEDGE_MAX_MISSING_RATIO",
                &raw,
                "expected a ratio in [0, 1]",
            ));
        }
        pipeline.validation.max_missing_ratio = ratio;
    }
    if let Some(raw) = var("VOLTEDGE_ROW_LIMIT") {
        pipeline.reader.row_limit = Some(parse_number("VOLTEDGE_ROW_LIMIT", &raw)?);
    }
    if let Some(raw) = var("VOLTEDGE_DROP_INCOMPLETE") {
        pipeline.drop_incomplete_rows = parse_flag("VOLTEDGE_DROP_INCOMPLETE", &raw)?;
    }

    Ok(settings)
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    raw.parse::<T>().map_err(|err| invalid(var, raw, err))
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    parse_bool(raw).ok_or_else(|| invalid(var, raw, "expected true/false"))
}

fn parse_list(var: &'static str, raw: &str) -> Result<Vec<usize>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<usize>().map_err(|err| invalid(var, raw, err)))
        .collect()
}
