//! Output sinks: hourly and feature CSVs, the schema sidecar and the SQLite
//! hourly store.

use std::fs;
use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::features::{FeatureMatrix, FeatureSchema};
use crate::resample::HourlySeries;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const HOURLY_TABLE: &str = "hourly_measurements";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub fn write_hourly_csv(path: &Path, series: &HourlySeries) -> Result<usize, SinkError> {
    let fields = series.schema.fields();
    let mut writer = csv::Writer::from_path(prepare_parent(path)?)?;

    let mut header = vec!["timestamp".to_string()];
    header.extend(fields.iter().map(|field| field.column_name().to_string()));
    header.extend(
        [
            "quality_flag",
            "hour_of_day",
            "day_of_week",
            "month",
            "is_weekend",
            "minute_count",
        ]
        .map(str::to_string),
    );
    writer.write_record(&header)?;

    for record in &series.records {
        let mut row = vec![record.timestamp.format(TIMESTAMP_FORMAT).to_string()];
        row.extend(
            fields
                .iter()
                .map(|field| format_cell(record.telemetry.get(*field))),
        );
        row.push(record.quality_flag.to_string());
        row.push(record.hour_of_day.to_string());
        row.push(record.day_of_week.to_string());
        row.push(record.month.to_string());
        row.push(u8::from(record.is_weekend).to_string());
        row.push(record.minute_count.to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(series.records.len())
}

/// `timestamp`, `quality_flag`, then the schema columns in order. Undefined
/// values are written as empty cells.
pub fn write_features_csv(path: &Path, matrix: &FeatureMatrix) -> Result<usize, SinkError> {
    let mut writer = csv::Writer::from_path(prepare_parent(path)?)?;

    let mut header = vec!["timestamp".to_string(), "quality_flag".to_string()];
    header.extend(matrix.schema.columns.iter().map(|column| column.name.clone()));
    writer.write_record(&header)?;

    for row in &matrix.rows {
        let mut out = Vec::with_capacity(row.values.len() + 2);
        out.push(row.timestamp.format(TIMESTAMP_FORMAT).to_string());
        out.push(row.quality_flag.to_string());
        out.extend(row.values.iter().map(|value| format_cell(*value)));
        writer.write_record(&out)?;
    }

    writer.flush()?;
    Ok(matrix.rows.len())
}

pub fn write_schema_json(path: &Path, schema: &FeatureSchema) -> Result<(), SinkError> {
    let json = serde_json::to_string_pretty(schema)?;
    fs::write(prepare_parent(path)?, json)?;
    Ok(())
}

pub fn read_schema_json(path: &Path) -> Result<FeatureSchema, SinkError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn prepare_parent(path: &Path) -> Result<&Path, SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(path)
}

/// Hourly records mirrored into SQLite, keyed by hour timestamp.
pub struct SqliteHourlyStore {
    conn: Connection,
}

impl SqliteHourlyStore {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let conn = Connection::open(prepare_parent(path)?)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )?;
        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {HOURLY_TABLE} (
                timestamp TEXT NOT NULL PRIMARY KEY,
                global_active_power REAL,
                global_reactive_power REAL,
                voltage REAL,
                global_intensity REAL,
                sub_metering_1 REAL,
                sub_metering_2 REAL,
                sub_metering_3 REAL,
                quality_flag TEXT NOT NULL,
                hour_of_day INTEGER NOT NULL,
                day_of_week INTEGER NOT NULL,
                month INTEGER NOT NULL,
                is_weekend INTEGER NOT NULL,
                minute_count INTEGER NOT NULL
            ) WITHOUT ROWID;
            "
        ))?;

        Ok(Self { conn })
    }

    /// Replaces the table contents with `series` in one transaction.
    pub fn replace_all(&mut self, series: &HourlySeries) -> Result<usize, SinkError> {
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {HOURLY_TABLE}"), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "
                INSERT INTO {HOURLY_TABLE} (
                    timestamp,
                    global_active_power,
                    global_reactive_power,
                    voltage,
                    global_intensity,
                    sub_metering_1,
                    sub_metering_2,
                    sub_metering_3,
                    quality_flag,
                    hour_of_day,
                    day_of_week,
                    month,
                    is_weekend,
                    minute_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "
            ))?;

            for record in &series.records {
                let t = &record.telemetry;
                stmt.execute(params![
                    record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    t.global_active_power,
                    t.global_reactive_power,
                    t.voltage,
                    t.global_intensity,
                    t.sub_metering_1,
                    t.sub_metering_2,
                    t.sub_metering_3,
                    record.quality_flag.as_str(),
                    record.hour_of_day,
                    record.day_of_week,
                    record.month,
                    record.is_weekend,
                    record.minute_count,
                ])?;
            }
        }

        tx.commit()?;
        Ok(series.records.len())
    }

    pub fn count(&self) -> Result<u64, SinkError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {HOURLY_TABLE}"),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn count_flagged(&self, flag: &str) -> Result<u64, SinkError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {HOURLY_TABLE} WHERE quality_flag = ?1"),
            params![flag],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
