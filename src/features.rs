//! Hourly series to feature matrix transform.
//!
//! Every column is a pure function of the ordered hourly series, evaluated
//! in a fixed plan order. Lag and rolling columns only read rows at or before
//! the current one.

use std::collections::{HashSet, VecDeque};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::calendar::{self, Season};
use crate::quality::QualityFlag;
use crate::reading::TelemetryField;
use crate::resample::{HourlyRecord, HourlySchema, HourlySeries};

pub const FEATURE_SCHEMA_VERSION: u32 = 1;

const DAY_OF_YEAR_PERIOD: f64 = 365.0;
const DAY_OVER_DAY_LAG: usize = 24;

/// Target series the lag, rolling and rate-of-change columns are built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetField {
    GlobalActivePower,
    GlobalReactivePower,
    Voltage,
    GlobalIntensity,
}

impl TargetField {
    pub fn telemetry_field(self) -> TelemetryField {
        match self {
            Self::GlobalActivePower => TelemetryField::GlobalActivePower,
            Self::GlobalReactivePower => TelemetryField::GlobalReactivePower,
            Self::Voltage => TelemetryField::Voltage,
            Self::GlobalIntensity => TelemetryField::GlobalIntensity,
        }
    }

    pub fn column_name(self) -> &'static str {
        self.telemetry_field().column_name()
    }
}

impl FromStr for TargetField {
    type Err = FeatureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        [
            Self::GlobalActivePower,
            Self::GlobalReactivePower,
            Self::Voltage,
            Self::GlobalIntensity,
        ]
        .into_iter()
        .find(|target| target.column_name() == raw.trim())
        .ok_or_else(|| FeatureError::InvalidConfig(format!("unknown target column '{raw}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureDType {
    F64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub dtype: FeatureDType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub fingerprint: String,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    pub quality_flag: QualityFlag,
    /// Aligned with `FeatureSchema::columns`; `None` is undefined.
    pub values: Vec<Option<f64>>,
}

impl FeatureRow {
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub missing: usize,
    pub missing_pct: f64,
    pub distinct: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.schema.column_index(name)?;
        Some(self.rows.iter().map(|row| row.values[idx]).collect())
    }

    /// Removes every row holding an undefined value.
    pub fn drop_incomplete_rows(self) -> FeatureMatrix {
        let before = self.rows.len();
        let rows: Vec<FeatureRow> = self
            .rows
            .into_iter()
            .filter(FeatureRow::is_complete)
            .collect();

        info!(
            component = "features",
            event = "features.drop_incomplete",
            rows_before = before,
            rows_dropped = before - rows.len()
        );

        FeatureMatrix {
            schema: self.schema,
            rows,
        }
    }

    pub fn column_summaries(&self) -> Vec<ColumnSummary> {
        self.schema
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let defined: Vec<f64> = self.rows.iter().filter_map(|row| row.values[idx]).collect();
                let missing = self.rows.len() - defined.len();
                let missing_pct = if self.rows.is_empty() {
                    0.0
                } else {
                    missing as f64 / self.rows.len() as f64 * 100.0
                };
                let distinct = defined
                    .iter()
                    .map(|value| canonical_bits(*value))
                    .collect::<HashSet<u64>>()
                    .len();
                let (mean, std) = mean_and_sample_std(&defined);

                ColumnSummary {
                    name: column.name.clone(),
                    missing,
                    missing_pct,
                    distinct,
                    mean,
                    std,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub lag_hours: Vec<usize>,
    pub rolling_windows: Vec<usize>,
    pub include_calendar: bool,
    pub include_cyclical: bool,
    pub target: TargetField,
    pub schema_version: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lag_hours: vec![1, 24, 168],
            rolling_windows: vec![24, 168],
            include_calendar: true,
            include_cyclical: true,
            target: TargetField::GlobalActivePower,
            schema_version: FEATURE_SCHEMA_VERSION,
        }
    }
}

impl FeatureConfig {
    pub fn max_lag(&self) -> usize {
        self.lag_hours.iter().copied().max().unwrap_or(0)
    }

    /// Rows of preceding history a chunk needs for its first row to match the
    /// whole-series result.
    pub fn required_history(&self) -> usize {
        let max_window = self.rolling_windows.iter().copied().max().unwrap_or(1);
        self.max_lag()
            .max(max_window.saturating_sub(1))
            .max(DAY_OVER_DAY_LAG)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("invalid feature config: {0}")]
    InvalidConfig(String),
    #[error("hourly timestamps are not strictly increasing at index {index}")]
    UnorderedTimestamps { index: usize },
    #[error("schema version mismatch: expected {expected}, got {actual}")]
    SchemaVersionMismatch { expected: u32, actual: u32 },
    #[error("schema fingerprint mismatch: expected {expected}, got {actual}")]
    SchemaFingerprintMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RollingStat {
    Mean,
    Std,
    Min,
    Max,
}

impl RollingStat {
    const ALL: [RollingStat; 4] = [Self::Mean, Self::Std, Self::Min, Self::Max];

    fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Std => "std",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclicUnit {
    Hour,
    Day,
    Month,
    DayOfYear,
}

impl CyclicUnit {
    const ALL: [CyclicUnit; 4] = [Self::Hour, Self::Day, Self::Month, Self::DayOfYear];

    fn prefix(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::DayOfYear => "day_of_year",
        }
    }

    fn period(self) -> f64 {
        match self {
            Self::Hour => 24.0,
            Self::Day => 7.0,
            Self::Month => 12.0,
            Self::DayOfYear => DAY_OF_YEAR_PERIOD,
        }
    }

    fn value(self, record: &HourlyRecord) -> f64 {
        match self {
            Self::Hour => record.hour_of_day as f64,
            Self::Day => record.day_of_week as f64,
            Self::Month => record.month as f64,
            Self::DayOfYear => calendar::day_of_year(record.timestamp) as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trig {
    Sin,
    Cos,
}

/// One planned output column. The plan order is the schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnSpec {
    Base(TelemetryField),
    HourOfDay,
    DayOfWeek,
    Month,
    IsWeekend,
    Lag(usize),
    Rolling(RollingStat, usize),
    DayOfMonth,
    DayOfYear,
    WeekOfYear,
    Quarter,
    IsBusinessHours,
    IsPeakHours,
    Season,
    Cyclic(CyclicUnit, Trig),
    HourSeasonInteraction,
    WeekendHourInteraction,
    TotalSubMetering,
    SubMeteringPct(usize),
    PowerChange(usize),
    PowerAcceleration,
}

impl ColumnSpec {
    fn name(&self, target: TargetField) -> String {
        let target = target.column_name();
        match self {
            Self::Base(field) => field.column_name().to_string(),
            Self::HourOfDay => "hour_of_day".to_string(),
            Self::DayOfWeek => "day_of_week".to_string(),
            Self::Month => "month".to_string(),
            Self::IsWeekend => "is_weekend".to_string(),
            Self::Lag(k) => format!("{target}_lag_{k}h"),
            Self::Rolling(stat, w) => format!("{target}_rolling_{}_{w}h", stat.as_str()),
            Self::DayOfMonth => "day_of_month".to_string(),
            Self::DayOfYear => "day_of_year".to_string(),
            Self::WeekOfYear => "week_of_year".to_string(),
            Self::Quarter => "quarter".to_string(),
            Self::IsBusinessHours => "is_business_hours".to_string(),
            Self::IsPeakHours => "is_peak_hours".to_string(),
            Self::Season => "season".to_string(),
            Self::Cyclic(unit, Trig::Sin) => format!("{}_sin", unit.prefix()),
            Self::Cyclic(unit, Trig::Cos) => format!("{}_cos", unit.prefix()),
            Self::HourSeasonInteraction => "hour_season_interaction".to_string(),
            Self::WeekendHourInteraction => "weekend_hour_interaction".to_string(),
            Self::TotalSubMetering => "total_sub_metering".to_string(),
            Self::SubMeteringPct(channel) => format!("sub{}_pct", channel + 1),
            Self::PowerChange(k) => format!("power_change_{k}h"),
            Self::PowerAcceleration => "power_acceleration".to_string(),
        }
    }
}

fn plan_columns(cfg: &FeatureConfig, hourly: &HourlySchema) -> Vec<ColumnSpec> {
    let mut plan: Vec<ColumnSpec> = hourly.fields().into_iter().map(ColumnSpec::Base).collect();
    plan.extend([
        ColumnSpec::HourOfDay,
        ColumnSpec::DayOfWeek,
        ColumnSpec::Month,
        ColumnSpec::IsWeekend,
    ]);

    plan.extend(cfg.lag_hours.iter().map(|k| ColumnSpec::Lag(*k)));

    for window in &cfg.rolling_windows {
        plan.extend(
            RollingStat::ALL
                .iter()
                .map(|stat| ColumnSpec::Rolling(*stat, *window)),
        );
    }

    if cfg.include_calendar {
        plan.extend([
            ColumnSpec::DayOfMonth,
            ColumnSpec::DayOfYear,
            ColumnSpec::WeekOfYear,
            ColumnSpec::Quarter,
            ColumnSpec::IsBusinessHours,
            ColumnSpec::IsPeakHours,
            ColumnSpec::Season,
        ]);
    }

    if cfg.include_cyclical {
        for unit in CyclicUnit::ALL {
            plan.push(ColumnSpec::Cyclic(unit, Trig::Sin));
            plan.push(ColumnSpec::Cyclic(unit, Trig::Cos));
        }
    }

    // `season` only exists with calendar features.
    if cfg.include_calendar {
        plan.push(ColumnSpec::HourSeasonInteraction);
    }
    plan.push(ColumnSpec::WeekendHourInteraction);

    if hourly.sub_metering {
        plan.push(ColumnSpec::TotalSubMetering);
        plan.extend((0..TelemetryField::SUB_METERING.len()).map(ColumnSpec::SubMeteringPct));
    }
    plan.extend([
        ColumnSpec::PowerChange(1),
        ColumnSpec::PowerChange(DAY_OVER_DAY_LAG),
        ColumnSpec::PowerAcceleration,
    ]);

    plan
}

pub fn build_feature_schema(cfg: &FeatureConfig, hourly: &HourlySchema) -> FeatureSchema {
    let columns: Vec<FeatureColumn> = plan_columns(cfg, hourly)
        .iter()
        .map(|spec| FeatureColumn {
            name: spec.name(cfg.target),
            dtype: FeatureDType::F64,
        })
        .collect();

    let fingerprint = schema_fingerprint(cfg, &columns);

    info!(
        component = "features",
        event = "features.schema.built",
        version = cfg.schema_version,
        lag_hours = ?cfg.lag_hours,
        rolling_windows = ?cfg.rolling_windows,
        column_count = columns.len(),
        fingerprint = %fingerprint
    );

    FeatureSchema {
        version: cfg.schema_version,
        fingerprint,
        columns,
    }
}

pub fn build_features(
    series: &HourlySeries,
    cfg: &FeatureConfig,
) -> Result<FeatureMatrix, FeatureError> {
    validate_config(cfg)?;
    ensure_strictly_increasing(&series.records)?;

    info!(
        component = "features",
        event = "features.build.start",
        records = series.records.len(),
        target = cfg.target.column_name(),
        include_calendar = cfg.include_calendar,
        include_cyclical = cfg.include_cyclical
    );

    let schema = build_feature_schema(cfg, &series.schema);
    let plan = plan_columns(cfg, &series.schema);
    let columns = evaluate_plan(&plan, &series.records, cfg.target);
    let rows = assemble_rows(&series.records, &columns, 0..series.records.len());

    info!(
        component = "features",
        event = "features.build.finish",
        rows = rows.len(),
        columns = schema.columns.len()
    );

    Ok(FeatureMatrix { schema, rows })
}

/// Builds the same matrix as [`build_features`] by evaluating overlapping
/// chunks of at most `chunk_rows` output rows, each carrying
/// [`FeatureConfig::required_history`] rows of preceding context.
pub fn build_features_chunked(
    series: &HourlySeries,
    cfg: &FeatureConfig,
    chunk_rows: usize,
) -> Result<FeatureMatrix, FeatureError> {
    validate_config(cfg)?;
    if chunk_rows == 0 {
        return Err(FeatureError::InvalidConfig(
            "chunk_rows must be > 0".to_string(),
        ));
    }
    ensure_strictly_increasing(&series.records)?;

    let schema = build_feature_schema(cfg, &series.schema);
    let plan = plan_columns(cfg, &series.schema);
    let history = cfg.required_history();
    let records = &series.records;

    let mut rows = Vec::with_capacity(records.len());
    let mut start = 0;
    while start < records.len() {
        let end = (start + chunk_rows).min(records.len());
        let context_start = start.saturating_sub(history);
        let window = &records[context_start..end];
        let columns = evaluate_plan(&plan, window, cfg.target);
        rows.extend(assemble_rows(
            window,
            &columns,
            (start - context_start)..(end - context_start),
        ));
        start = end;
    }

    info!(
        component = "features",
        event = "features.build.chunked.finish",
        rows = rows.len(),
        chunk_rows,
        history
    );

    Ok(FeatureMatrix { schema, rows })
}

pub fn assert_schema_compatible(
    expected_version: u32,
    expected_fingerprint: &str,
    actual: &FeatureSchema,
) -> Result<(), FeatureError> {
    if expected_version != actual.version {
        return Err(FeatureError::SchemaVersionMismatch {
            expected: expected_version,
            actual: actual.version,
        });
    }

    if expected_fingerprint != actual.fingerprint {
        return Err(FeatureError::SchemaFingerprintMismatch {
            expected: expected_fingerprint.to_string(),
            actual: actual.fingerprint.clone(),
        });
    }

    Ok(())
}

fn validate_config(cfg: &FeatureConfig) -> Result<(), FeatureError> {
    if cfg.schema_version != FEATURE_SCHEMA_VERSION {
        return Err(FeatureError::InvalidConfig(format!(
            "schema_version must equal FEATURE_SCHEMA_VERSION ({FEATURE_SCHEMA_VERSION})"
        )));
    }

    if cfg.lag_hours.is_empty() {
        return Err(FeatureError::InvalidConfig(
            "lag_hours must not be empty".to_string(),
        ));
    }

    check_positive_unique("lag_hours", &cfg.lag_hours)?;
    check_positive_unique("rolling_windows", &cfg.rolling_windows)?;
    Ok(())
}

fn check_positive_unique(name: &str, values: &[usize]) -> Result<(), FeatureError> {
    let mut seen = HashSet::new();
    for value in values {
        if *value == 0 {
            return Err(FeatureError::InvalidConfig(format!(
                "{name} entries must be > 0"
            )));
        }
        if !seen.insert(*value) {
            return Err(FeatureError::InvalidConfig(format!(
                "{name} entries must be unique, {value} repeats"
            )));
        }
    }
    Ok(())
}

fn ensure_strictly_increasing(records: &[HourlyRecord]) -> Result<(), FeatureError> {
    match records
        .windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
    {
        Some(idx) => Err(FeatureError::UnorderedTimestamps { index: idx + 1 }),
        None => Ok(()),
    }
}

fn evaluate_plan(
    plan: &[ColumnSpec],
    records: &[HourlyRecord],
    target: TargetField,
) -> Vec<Vec<Option<f64>>> {
    let target_values: Vec<Option<f64>> = records
        .iter()
        .map(|record| record.telemetry.get(target.telemetry_field()))
        .collect();

    plan.iter()
        .map(|spec| evaluate_column(*spec, records, &target_values))
        .collect()
}

fn assemble_rows(
    records: &[HourlyRecord],
    columns: &[Vec<Option<f64>>],
    range: std::ops::Range<usize>,
) -> Vec<FeatureRow> {
    range
        .map(|idx| FeatureRow {
            timestamp: records[idx].timestamp,
            quality_flag: records[idx].quality_flag,
            values: columns.iter().map(|column| column[idx]).collect(),
        })
        .collect()
}

fn evaluate_column(
    spec: ColumnSpec,
    records: &[HourlyRecord],
    target: &[Option<f64>],
) -> Vec<Option<f64>> {
    match spec {
        ColumnSpec::Base(field) => per_record(records, |r| r.telemetry.get(field)),
        ColumnSpec::HourOfDay => per_record(records, |r| Some(r.hour_of_day as f64)),
        ColumnSpec::DayOfWeek => per_record(records, |r| Some(r.day_of_week as f64)),
        ColumnSpec::Month => per_record(records, |r| Some(r.month as f64)),
        ColumnSpec::IsWeekend => per_record(records, |r| Some(flag(r.is_weekend))),
        ColumnSpec::Lag(k) => lag(target, k),
        ColumnSpec::Rolling(stat, w) => rolling(target, w, stat),
        ColumnSpec::DayOfMonth => {
            per_record(records, |r| Some(calendar::day_of_month(r.timestamp) as f64))
        }
        ColumnSpec::DayOfYear => {
            per_record(records, |r| Some(calendar::day_of_year(r.timestamp) as f64))
        }
        ColumnSpec::WeekOfYear => {
            per_record(records, |r| Some(calendar::iso_week_of_year(r.timestamp) as f64))
        }
        ColumnSpec::Quarter => per_record(records, |r| Some(calendar::quarter(r.month) as f64)),
        ColumnSpec::IsBusinessHours => per_record(records, |r| {
            Some(flag(calendar::is_business_hours(
                r.hour_of_day,
                r.day_of_week,
            )))
        }),
        ColumnSpec::IsPeakHours => {
            per_record(records, |r| Some(flag(calendar::is_peak_hours(r.hour_of_day))))
        }
        ColumnSpec::Season => {
            per_record(records, |r| Some(Season::from_month(r.month).code() as f64))
        }
        ColumnSpec::Cyclic(unit, trig) => per_record(records, |r| {
            let angle = 2.0 * PI * unit.value(r) / unit.period();
            Some(match trig {
                Trig::Sin => angle.sin(),
                Trig::Cos => angle.cos(),
            })
        }),
        ColumnSpec::HourSeasonInteraction => per_record(records, |r| {
            Some((r.hour_of_day * Season::from_month(r.month).code()) as f64)
        }),
        ColumnSpec::WeekendHourInteraction => {
            per_record(records, |r| Some(flag(r.is_weekend) * r.hour_of_day as f64))
        }
        ColumnSpec::TotalSubMetering => per_record(records, sub_metering_total),
        ColumnSpec::SubMeteringPct(channel) => per_record(records, |r| {
            let total = sub_metering_total(r)?;
            let value = r.telemetry.get(TelemetryField::SUB_METERING[channel])?;
            Some(if total == 0.0 {
                0.0
            } else {
                value / total * 100.0
            })
        }),
        ColumnSpec::PowerChange(k) => difference(target, k),
        ColumnSpec::PowerAcceleration => difference(&difference(target, 1), 1),
    }
}

fn per_record<F>(records: &[HourlyRecord], f: F) -> Vec<Option<f64>>
where
    F: Fn(&HourlyRecord) -> Option<f64>,
{
    records.iter().map(f).collect()
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn sub_metering_total(record: &HourlyRecord) -> Option<f64> {
    TelemetryField::SUB_METERING
        .iter()
        .map(|field| record.telemetry.get(*field))
        .sum()
}

/// `out[i] = values[i - k]`, undefined while `i < k`.
fn lag(values: &[Option<f64>], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|idx| if idx >= k { values[idx - k] } else { None })
        .collect()
}

/// `out[i] = values[i] - values[i - k]`, undefined if either side is.
fn difference(values: &[Option<f64>], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|idx| {
            if idx < k {
                return None;
            }
            Some(values[idx]? - values[idx - k]?)
        })
        .collect()
}

/// Trailing-window statistic over rows `i-w+1..=i`, skipping undefined
/// values. At least one defined value is required; std needs two.
fn rolling(values: &[Option<f64>], window: usize, stat: RollingStat) -> Vec<Option<f64>> {
    let mut trailing: VecDeque<Option<f64>> = VecDeque::with_capacity(window + 1);
    let mut out = Vec::with_capacity(values.len());

    for value in values {
        trailing.push_back(*value);
        while trailing.len() > window {
            trailing.pop_front();
        }

        let defined: Vec<f64> = trailing.iter().flatten().copied().collect();
        let result = if defined.is_empty() {
            None
        } else {
            match stat {
                RollingStat::Mean => Some(defined.iter().sum::<f64>() / defined.len() as f64),
                RollingStat::Std => mean_and_sample_std(&defined).1,
                RollingStat::Min => Some(defined.iter().copied().fold(f64::INFINITY, f64::min)),
                RollingStat::Max => {
                    Some(defined.iter().copied().fold(f64::NEG_INFINITY, f64::max))
                }
            }
        };
        out.push(result);
    }

    out
}

/// Bit pattern with `-0.0` folded onto `0.0`.
fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn mean_and_sample_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() < 2 {
        return (Some(mean), None);
    }
    let variance = values
        .iter()
        .map(|v| {
            let d = *v - mean;
            d * d
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;
    (Some(mean), Some(variance.sqrt()))
}

fn schema_fingerprint(cfg: &FeatureConfig, columns: &[FeatureColumn]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("version:{};", cfg.schema_version));
    hasher.update(format!("target:{};", cfg.target.column_name()));
    hasher.update("lags:");
    for lag in &cfg.lag_hours {
        hasher.update(format!("{lag},"));
    }
    hasher.update(";windows:");
    for window in &cfg.rolling_windows {
        hasher.update(format!("{window},"));
    }
    hasher.update(";columns:");
    for column in columns {
        hasher.update(column.name.as_bytes());
        hasher.update(":f64;");
    }
    hex::encode(hasher.finalize())
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}
