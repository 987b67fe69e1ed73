//! Hourly series validation: record-level schema rules and series invariants.

use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::quality::VoltageBand;
use crate::reading::TelemetryField;
use crate::resample::{HourlyRecord, HourlySeries};

const DEFAULT_REPORTED_VIOLATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Fraction in [0, 1]; a field missing in more records than this is fatal.
    pub max_missing_ratio: f64,
    pub power_warning_range: (f64, f64),
    pub voltage_warning_band: VoltageBand,
    pub record_rules: RecordRules,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_missing_ratio: 0.10,
            power_warning_range: (0.0, 20.0),
            voltage_warning_band: VoltageBand::default(),
            record_rules: RecordRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRules {
    /// Inclusive date window hourly timestamps must fall in; `None` disables it.
    pub timestamp_window: Option<(NaiveDate, NaiveDate)>,
    pub max_reported_violations: usize,
}

impl Default for RecordRules {
    fn default() -> Self {
        Self {
            timestamp_window: NaiveDate::from_ymd_opt(2006, 1, 1)
                .zip(NaiveDate::from_ymd_opt(2011, 12, 31)),
            max_reported_violations: DEFAULT_REPORTED_VIOLATIONS,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DataQualityError {
    #[error("duplicate hourly timestamp {timestamp} at index {index}")]
    DuplicateTimestamp {
        timestamp: NaiveDateTime,
        index: usize,
    },
    #[error("timestamps not strictly increasing at index {index}: {previous} then {current}")]
    NonMonotonicTimestamp {
        previous: NaiveDateTime,
        current: NaiveDateTime,
        index: usize,
    },
    #[error(
        "field {field} missing in {missing} of {total} records (ratio {ratio:.4} > threshold {threshold:.4})"
    )]
    ExcessiveMissingData {
        field: &'static str,
        missing: usize,
        total: usize,
        ratio: f64,
        threshold: f64,
    },
    #[error("invalid missing-ratio threshold {0}; expected a value in [0, 1]")]
    InvalidThreshold(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Missing,
    Finite,
    AtLeast(f64),
    AtMost(f64),
    TimestampWindow,
}

impl Constraint {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Finite => "finite_number",
            Self::AtLeast(_) => "greater_than_equal",
            Self::AtMost(_) => "less_than_equal",
            Self::TimestampWindow => "timestamp_window",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    pub timestamp: NaiveDateTime,
    pub field: &'static str,
    pub constraint: Constraint,
    pub actual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DataQualityReport {
    pub total_records: u64,
    pub valid_records: u64,
    pub invalid_records: u64,
    pub error_summary: BTreeMap<String, u64>,
    pub sample_violations: Vec<SchemaViolation>,
}

impl DataQualityReport {
    /// Percentage of valid records; 0 for an empty input.
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        self.valid_records as f64 / self.total_records as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub records: DataQualityReport,
    pub power_range_warnings: u64,
    pub voltage_range_warnings: u64,
    pub missing_ratios: BTreeMap<String, f64>,
}

/// A series that passed every fatal check, with the advisory findings.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSeries {
    pub series: HourlySeries,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Copy)]
struct RangeRule {
    field: TelemetryField,
    min: Option<f64>,
    max: Option<f64>,
}

const RANGE_RULES: [RangeRule; 7] = [
    RangeRule {
        field: TelemetryField::GlobalActivePower,
        min: Some(0.0),
        max: Some(20.0),
    },
    RangeRule {
        field: TelemetryField::GlobalReactivePower,
        min: Some(0.0),
        max: Some(5.0),
    },
    RangeRule {
        field: TelemetryField::Voltage,
        min: Some(200.0),
        max: Some(260.0),
    },
    RangeRule {
        field: TelemetryField::GlobalIntensity,
        min: Some(0.0),
        max: Some(100.0),
    },
    RangeRule {
        field: TelemetryField::SubMetering1,
        min: Some(0.0),
        max: None,
    },
    RangeRule {
        field: TelemetryField::SubMetering2,
        min: Some(0.0),
        max: None,
    },
    RangeRule {
        field: TelemetryField::SubMetering3,
        min: Some(0.0),
        max: None,
    },
];

impl RangeRule {
    fn check(&self, record: &HourlyRecord) -> Option<SchemaViolation> {
        let field = self.field.column_name();
        let violation = |constraint, actual| SchemaViolation {
            timestamp: record.timestamp,
            field,
            constraint,
            actual,
        };

        let Some(value) = record.telemetry.get(self.field) else {
            return Some(violation(Constraint::Missing, None));
        };
        if !value.is_finite() {
            return Some(violation(Constraint::Finite, Some(value)));
        }
        if let Some(min) = self.min {
            if value < min {
                return Some(violation(Constraint::AtLeast(min), Some(value)));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Some(violation(Constraint::AtMost(max), Some(value)));
            }
        }
        None
    }
}

/// Evaluates the per-record rules. Violations are collected, never fatal.
pub fn validate_records(series: &HourlySeries, rules: &RecordRules) -> DataQualityReport {
    let fields = series.schema.fields();
    let mut report = DataQualityReport {
        total_records: series.records.len() as u64,
        ..DataQualityReport::default()
    };

    for record in &series.records {
        let mut violations: Vec<SchemaViolation> = RANGE_RULES
            .iter()
            .filter(|rule| fields.contains(&rule.field))
            .filter_map(|rule| rule.check(record))
            .collect();

        if let Some((first, last)) = rules.timestamp_window {
            let date = record.timestamp.date();
            if date < first || date > last {
                violations.push(SchemaViolation {
                    timestamp: record.timestamp,
                    field: "timestamp",
                    constraint: Constraint::TimestampWindow,
                    actual: None,
                });
            }
        }

        if violations.is_empty() {
            report.valid_records += 1;
            continue;
        }

        report.invalid_records += 1;
        for violation in violations {
            *report
                .error_summary
                .entry(violation.constraint.kind().to_string())
                .or_insert(0) += 1;
            if report.sample_violations.len() < rules.max_reported_violations {
                warn!(
                    component = "validate",
                    event = "validate.record.violation",
                    timestamp = %violation.timestamp,
                    field = violation.field,
                    constraint = violation.constraint.kind(),
                    actual = ?violation.actual
                );
                report.sample_violations.push(violation);
            }
        }
    }

    info!(
        component = "validate",
        event = "validate.records.finish",
        total_records = report.total_records,
        valid_records = report.valid_records,
        invalid_records = report.invalid_records,
        success_rate = report.success_rate(),
        error_summary = ?report.error_summary
    );

    report
}

/// Enforces the fatal series invariants and gathers advisory findings.
pub fn validate_series(
    series: HourlySeries,
    cfg: &ValidationConfig,
) -> Result<ValidatedSeries, DataQualityError> {
    if !(0.0..=1.0).contains(&cfg.max_missing_ratio) {
        return Err(DataQualityError::InvalidThreshold(cfg.max_missing_ratio));
    }

    check_chronology(&series.records)?;
    let missing_ratios = check_missing_ratios(&series, cfg.max_missing_ratio)?;

    let (power_min, power_max) = cfg.power_warning_range;
    let power_range_warnings = series
        .records
        .iter()
        .filter_map(|record| record.telemetry.global_active_power)
        .filter(|power| *power < power_min || *power > power_max)
        .count() as u64;
    if power_range_warnings > 0 {
        warn!(
            component = "validate",
            event = "validate.range.power",
            records = power_range_warnings,
            min = power_min,
            max = power_max
        );
    }

    let voltage_range_warnings = series
        .records
        .iter()
        .filter_map(|record| record.telemetry.voltage)
        .filter(|voltage| !cfg.voltage_warning_band.contains(*voltage))
        .count() as u64;
    if voltage_range_warnings > 0 {
        warn!(
            component = "validate",
            event = "validate.range.voltage",
            records = voltage_range_warnings,
            min = cfg.voltage_warning_band.min,
            max = cfg.voltage_warning_band.max
        );
    }

    let records = validate_records(&series, &cfg.record_rules);

    info!(
        component = "validate",
        event = "validate.series.passed",
        records = series.records.len(),
        power_range_warnings,
        voltage_range_warnings
    );

    Ok(ValidatedSeries {
        series,
        report: ValidationReport {
            records,
            power_range_warnings,
            voltage_range_warnings,
            missing_ratios,
        },
    })
}

fn check_chronology(records: &[HourlyRecord]) -> Result<(), DataQualityError> {
    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if !seen.insert(record.timestamp) {
            return Err(DataQualityError::DuplicateTimestamp {
                timestamp: record.timestamp,
                index,
            });
        }
    }

    for (index, pair) in records.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(DataQualityError::NonMonotonicTimestamp {
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
                index: index + 1,
            });
        }
    }

    Ok(())
}

fn check_missing_ratios(
    series: &HourlySeries,
    threshold: f64,
) -> Result<BTreeMap<String, f64>, DataQualityError> {
    let total = series.records.len();
    let mut ratios = BTreeMap::new();

    for field in series.schema.fields() {
        let missing = series
            .records
            .iter()
            .filter(|record| record.telemetry.get(field).is_none())
            .count();
        let ratio = if total == 0 {
            0.0
        } else {
            missing as f64 / total as f64
        };

        if ratio > threshold {
            warn!(
                component = "validate",
                event = "validate.missing.excessive",
                field = field.column_name(),
                missing,
                total,
                ratio,
                threshold
            );
            return Err(DataQualityError::ExcessiveMissingData {
                field: field.column_name(),
                missing,
                total,
                ratio,
                threshold,
            });
        }
        ratios.insert(field.column_name().to_string(), ratio);
    }

    Ok(ratios)
}
