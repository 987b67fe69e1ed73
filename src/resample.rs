//! Bounded gap fill and minute-to-hour aggregation.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::calendar::CalendarFields;
use crate::quality::{minute_flag, QualityFlag, VoltageBand};
use crate::reading::{
    Aggregation, RawDataset, RawReading, Telemetry, TelemetryField, TELEMETRY_FIELD_COUNT,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleConfig {
    pub max_fill_gap_minutes: usize,
    pub voltage_band: VoltageBand,
    pub escalate_suspicious_voltage: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            max_fill_gap_minutes: 5,
            voltage_band: VoltageBand::default(),
            escalate_suspicious_voltage: true,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ResampleError {
    #[error("invalid resample config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub timestamp: NaiveDateTime,
    pub telemetry: Telemetry,
    pub quality_flag: QualityFlag,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub month: u32,
    pub is_weekend: bool,
    pub minute_count: u32,
}

impl HourlyRecord {
    pub fn calendar(&self) -> CalendarFields {
        CalendarFields {
            hour_of_day: self.hour_of_day,
            day_of_week: self.day_of_week,
            month: self.month,
            is_weekend: self.is_weekend,
        }
    }
}

/// Optional inputs carried by a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlySchema {
    pub sub_metering: bool,
}

impl Default for HourlySchema {
    fn default() -> Self {
        Self { sub_metering: true }
    }
}

impl HourlySchema {
    pub fn fields(&self) -> Vec<TelemetryField> {
        TelemetryField::ALL
            .into_iter()
            .filter(|field| self.sub_metering || !field.is_sub_metering())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub schema: HourlySchema,
    pub records: Vec<HourlyRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Contribution {
    timestamp: NaiveDateTime,
    telemetry: Telemetry,
    flag: QualityFlag,
    minutes: u32,
}

pub fn resample_hourly(
    dataset: &RawDataset,
    cfg: &ResampleConfig,
) -> Result<HourlySeries, ResampleError> {
    validate_config(cfg)?;

    let flags: Vec<QualityFlag> = dataset
        .readings
        .iter()
        .map(|reading| minute_flag(&reading.telemetry, &cfg.voltage_band))
        .collect();
    let (filled, filled_cells) = fill_runs(&dataset.readings, cfg.max_fill_gap_minutes);

    let contributions = filled
        .iter()
        .zip(flags.iter())
        .map(|(reading, flag)| Contribution {
            timestamp: reading.timestamp,
            telemetry: reading.telemetry,
            flag: *flag,
            minutes: 1,
        });
    let records = aggregate_buckets(contributions, cfg.escalate_suspicious_voltage);

    let degraded_hours = records
        .iter()
        .filter(|record| !record.quality_flag.is_ok())
        .count();
    let non_ok_minutes = flags.iter().filter(|flag| !flag.is_ok()).count();

    info!(
        component = "resample",
        event = "resample.finish",
        minutes = dataset.readings.len(),
        non_ok_minutes,
        filled_cells,
        hours = records.len(),
        degraded_hours,
        max_fill_gap_minutes = cfg.max_fill_gap_minutes
    );

    Ok(HourlySeries {
        schema: HourlySchema {
            sub_metering: dataset.has_sub_metering,
        },
        records,
    })
}

/// Runs hourly records back through the bucketing and aggregation rules.
///
/// Every record is its own bucket, so the output equals the input.
pub fn reaggregate_hourly(
    series: &HourlySeries,
    cfg: &ResampleConfig,
) -> Result<HourlySeries, ResampleError> {
    validate_config(cfg)?;
    let contributions = series.records.iter().map(|record| Contribution {
        timestamp: record.timestamp,
        telemetry: record.telemetry,
        flag: record.quality_flag,
        minutes: record.minute_count,
    });

    Ok(HourlySeries {
        schema: series.schema,
        records: aggregate_buckets(contributions, cfg.escalate_suspicious_voltage),
    })
}

/// Replaces each run of missing values with the previous observed value when
/// the run is at most `max_gap` readings long and its last reading lies at
/// most `max_gap` minutes after that observation. Longer runs stay missing.
pub fn forward_fill_bounded(readings: &[RawReading], max_gap: usize) -> Vec<RawReading> {
    fill_runs(readings, max_gap).0
}

fn fill_runs(readings: &[RawReading], max_gap: usize) -> (Vec<RawReading>, usize) {
    let mut out = readings.to_vec();
    let mut filled = 0usize;

    for field in TelemetryField::ALL {
        let mut last_seen: Option<(NaiveDateTime, f64)> = None;
        let mut idx = 0;
        while idx < out.len() {
            if let Some(value) = out[idx].telemetry.get(field) {
                last_seen = Some((out[idx].timestamp, value));
                idx += 1;
                continue;
            }

            let run_start = idx;
            while idx < out.len() && out[idx].telemetry.get(field).is_none() {
                idx += 1;
            }

            if let Some((seen_at, value)) = last_seen {
                let elapsed = (out[idx - 1].timestamp - seen_at).num_minutes();
                if idx - run_start <= max_gap && elapsed <= max_gap as i64 {
                    for reading in &mut out[run_start..idx] {
                        reading.telemetry.set(field, Some(value));
                    }
                    filled += idx - run_start;
                }
            }
        }
    }

    (out, filled)
}

pub fn hour_bucket(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_hms_opt(ts.hour(), 0, 0).unwrap_or(ts)
}

#[derive(Debug)]
struct BucketAccumulator {
    start: NaiveDateTime,
    sums: [f64; TELEMETRY_FIELD_COUNT],
    counts: [u32; TELEMETRY_FIELD_COUNT],
    flags: Vec<QualityFlag>,
    minutes: u32,
}

impl BucketAccumulator {
    fn new(start: NaiveDateTime) -> Self {
        Self {
            start,
            sums: [0.0; TELEMETRY_FIELD_COUNT],
            counts: [0; TELEMETRY_FIELD_COUNT],
            flags: Vec::new(),
            minutes: 0,
        }
    }

    fn push(&mut self, contribution: &Contribution) {
        for field in TelemetryField::ALL {
            if let Some(value) = contribution.telemetry.get(field) {
                self.sums[field.index()] += value;
                self.counts[field.index()] += 1;
            }
        }
        self.flags.push(contribution.flag);
        self.minutes = self.minutes.saturating_add(contribution.minutes);
    }

    fn finish(self, escalate_voltage: bool) -> HourlyRecord {
        let mut telemetry = Telemetry::default();
        for field in TelemetryField::ALL {
            let idx = field.index();
            let value = match (self.counts[idx], field.aggregation()) {
                (0, _) => None,
                (count, Aggregation::Mean) => Some(self.sums[idx] / count as f64),
                (_, Aggregation::Sum) => Some(self.sums[idx]),
            };
            telemetry.set(field, value);
        }

        let calendar = CalendarFields::from_timestamp(self.start);
        HourlyRecord {
            timestamp: self.start,
            telemetry,
            quality_flag: QualityFlag::combine_hourly(self.flags, escalate_voltage),
            hour_of_day: calendar.hour_of_day,
            day_of_week: calendar.day_of_week,
            month: calendar.month,
            is_weekend: calendar.is_weekend,
            minute_count: self.minutes,
        }
    }
}

/// Groups contiguous contributions that share an hour bucket.
fn aggregate_buckets<I>(contributions: I, escalate_voltage: bool) -> Vec<HourlyRecord>
where
    I: IntoIterator<Item = Contribution>,
{
    let mut records = Vec::new();
    let mut current: Option<BucketAccumulator> = None;

    for contribution in contributions {
        let bucket = hour_bucket(contribution.timestamp);
        match current.as_mut() {
            Some(acc) if acc.start == bucket => acc.push(&contribution),
            _ => {
                if let Some(done) = current.take() {
                    records.push(done.finish(escalate_voltage));
                }
                let mut acc = BucketAccumulator::new(bucket);
                acc.push(&contribution);
                current = Some(acc);
            }
        }
    }

    if let Some(done) = current.take() {
        records.push(done.finish(escalate_voltage));
    }

    records
}

fn validate_config(cfg: &ResampleConfig) -> Result<(), ResampleError> {
    if !cfg.voltage_band.is_valid() {
        return Err(ResampleError::InvalidConfig(format!(
            "voltage band must be finite with min < max, got [{}, {}]",
            cfg.voltage_band.min, cfg.voltage_band.max
        )));
    }
    Ok(())
}
