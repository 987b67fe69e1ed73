//! Raw minute-level source loading (UCI household power consumption layout).

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::reading::{RawDataset, RawReading, Telemetry, TelemetryField, TELEMETRY_FIELD_COUNT};

const DATE_HEADER: &str = "Date";
const TIME_HEADER: &str = "Time";
const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    pub delimiter: u8,
    pub missing_token: String,
    pub row_limit: Option<usize>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b';',
            missing_token: "?".to_string(),
            row_limit: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("raw source not found: {path}")]
    SourceNotFound { path: PathBuf },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("archive at {path} has no .txt or .csv entry")]
    MissingDataEntry { path: PathBuf },
    #[error("source header is missing required column {column}")]
    MissingColumn { column: &'static str },
    #[error("source header has an incomplete sub-metering set: {present:?}")]
    PartialSubMetering { present: Vec<&'static str> },
    #[error("line {line}: failed to parse field {field} value '{value}'")]
    ParseField {
        line: u64,
        field: &'static str,
        value: String,
    },
}

/// Reads a semicolon-delimited minute source, either plain text or a zip archive.
pub fn read_raw_source(path: &Path, cfg: &ReaderConfig) -> Result<RawDataset, ReadError> {
    if !path.exists() {
        return Err(ReadError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    info!(
        component = "raw_reader",
        event = "raw_reader.read.start",
        path = %path.display(),
        row_limit = ?cfg.row_limit
    );

    let is_zip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);

    let dataset = if is_zip {
        let bytes = read_zip_data_entry(path)?;
        read_raw_from_reader(Cursor::new(bytes), cfg)?
    } else {
        read_raw_from_reader(fs::File::open(path)?, cfg)?
    };

    let missing_cells: usize = dataset
        .readings
        .iter()
        .map(|reading| reading.telemetry.missing_count())
        .sum();

    info!(
        component = "raw_reader",
        event = "raw_reader.read.finish",
        path = %path.display(),
        rows = dataset.readings.len(),
        missing_cells,
        has_sub_metering = dataset.has_sub_metering
    );

    Ok(dataset)
}

pub fn read_raw_from_reader<R: Read>(
    reader: R,
    cfg: &ReaderConfig,
) -> Result<RawDataset, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(cfg.delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let layout = ColumnLayout::from_headers(reader.headers()?)?;

    let mut readings = Vec::new();
    for record in reader.records() {
        if cfg
            .row_limit
            .map(|limit| readings.len() >= limit)
            .unwrap_or(false)
        {
            break;
        }
        let record = record?;
        readings.push(parse_reading(&record, &layout, &cfg.missing_token)?);
    }

    Ok(RawDataset {
        readings,
        has_sub_metering: layout.has_sub_metering(),
    })
}

#[derive(Debug, Clone)]
struct ColumnLayout {
    date: usize,
    time: usize,
    fields: [Option<usize>; TELEMETRY_FIELD_COUNT],
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self, ReadError> {
        let position = |name: &str| headers.iter().position(|header| header == name);

        let date = position(DATE_HEADER).ok_or(ReadError::MissingColumn {
            column: DATE_HEADER,
        })?;
        let time = position(TIME_HEADER).ok_or(ReadError::MissingColumn {
            column: TIME_HEADER,
        })?;

        let mut fields = [None; TELEMETRY_FIELD_COUNT];
        for field in TelemetryField::ALL {
            let idx = position(field.source_header());
            if idx.is_none() && !field.is_sub_metering() {
                return Err(ReadError::MissingColumn {
                    column: field.source_header(),
                });
            }
            fields[field.index()] = idx;
        }

        let present: Vec<&'static str> = TelemetryField::SUB_METERING
            .iter()
            .filter(|field| fields[field.index()].is_some())
            .map(|field| field.source_header())
            .collect();
        if !present.is_empty() && present.len() != TelemetryField::SUB_METERING.len() {
            return Err(ReadError::PartialSubMetering { present });
        }

        Ok(Self { date, time, fields })
    }

    fn has_sub_metering(&self) -> bool {
        self.fields[TelemetryField::SubMetering1.index()].is_some()
    }
}

fn read_zip_data_entry(path: &Path) -> Result<Vec<u8>, ReadError> {
    let file = fs::File::open(path)?;
    let mut zip = ZipArchive::new(file)?;

    for idx in 0..zip.len() {
        let mut entry = zip.by_index(idx)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_ascii_lowercase();
        if !(name.ends_with(".txt") || name.ends_with(".csv")) {
            continue;
        }

        debug!(
            component = "raw_reader",
            event = "raw_reader.zip.entry",
            path = %path.display(),
            entry = %entry.name()
        );
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        return Ok(buf);
    }

    Err(ReadError::MissingDataEntry {
        path: path.to_path_buf(),
    })
}

fn parse_reading(
    record: &StringRecord,
    layout: &ColumnLayout,
    missing_token: &str,
) -> Result<RawReading, ReadError> {
    let line = record.position().map(|pos| pos.line()).unwrap_or_default();
    let timestamp = parse_timestamp(
        record.get(layout.date).unwrap_or_default(),
        record.get(layout.time).unwrap_or_default(),
        line,
    )?;

    let mut telemetry = Telemetry::default();
    for field in TelemetryField::ALL {
        if let Some(idx) = layout.fields[field.index()] {
            let value = parse_optional_f64(record, idx, field, missing_token, line)?;
            telemetry.set(field, value);
        }
    }

    Ok(RawReading {
        timestamp,
        telemetry,
    })
}

fn parse_timestamp(date: &str, time: &str, line: u64) -> Result<NaiveDateTime, ReadError> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| ReadError::ParseField {
        line,
        field: DATE_HEADER,
        value: date.to_string(),
    })?;
    let time = NaiveTime::parse_from_str(time, TIME_FORMAT).map_err(|_| ReadError::ParseField {
        line,
        field: TIME_HEADER,
        value: time.to_string(),
    })?;
    Ok(date.and_time(time))
}

fn parse_optional_f64(
    record: &StringRecord,
    idx: usize,
    field: TelemetryField,
    missing_token: &str,
    line: u64,
) -> Result<Option<f64>, ReadError> {
    let raw = record.get(idx).unwrap_or_default();
    if raw.is_empty() || raw == missing_token {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ReadError::ParseField {
            line,
            field: field.source_header(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const HEADER: &str = "Date;Time;Global_active_power;Global_reactive_power;Voltage;Global_intensity;Sub_metering_1;Sub_metering_2;Sub_metering_3\n";

    fn parse(body: &str) -> Result<RawDataset, ReadError> {
        read_raw_from_reader(body.as_bytes(), &ReaderConfig::default())
    }

    #[test]
    fn combines_day_first_date_and_time() {
        let body = format!("{HEADER}16/12/2006;17:24:00;4.216;0.418;234.840;18.400;0.000;1.000;17.000\n");
        let dataset = parse(&body).unwrap();

        assert_eq!(dataset.readings.len(), 1);
        assert!(dataset.has_sub_metering);
        let reading = &dataset.readings[0];
        assert_eq!(
            reading.timestamp.date(),
            NaiveDate::from_ymd_opt(2006, 12, 16).unwrap()
        );
        assert_eq!(reading.timestamp.hour(), 17);
        assert_eq!(reading.timestamp.minute(), 24);
        assert_eq!(reading.telemetry.voltage, Some(234.84));
        assert_eq!(reading.telemetry.sub_metering_3, Some(17.0));
    }

    #[test]
    fn sentinel_and_empty_cells_are_missing() {
        let body = format!("{HEADER}21/12/2006;11:23:00;?;?;?;?;?;?;\n");
        let dataset = parse(&body).unwrap();

        assert_eq!(dataset.readings[0].telemetry, Telemetry::default());
    }

    #[test]
    fn garbage_numeric_value_names_the_field() {
        let body = format!("{HEADER}16/12/2006;17:24:00;abc;0.418;234.840;18.400;0;1;17\n");
        let err = parse(&body).unwrap_err();

        match err {
            ReadError::ParseField { field, value, .. } => {
                assert_eq!(field, "Global_active_power");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_tokens_are_parse_errors() {
        for token in ["NaN", "nan", "inf", "-Infinity"] {
            let body = format!("{HEADER}16/12/2006;17:24:00;4.216;0.418;{token};18.400;0;1;17\n");
            match parse(&body).unwrap_err() {
                ReadError::ParseField { field, value, .. } => {
                    assert_eq!(field, "Voltage");
                    assert_eq!(value, token);
                }
                other => panic!("unexpected error for {token}: {other}"),
            }
        }
    }

    #[test]
    fn month_first_dates_out_of_range_are_rejected() {
        let body = format!("{HEADER}12/16/2006;17:24:00;4.2;0.4;234.8;18.4;0;1;17\n");
        assert!(matches!(
            parse(&body).unwrap_err(),
            ReadError::ParseField { field: "Date", .. }
        ));
    }

    #[test]
    fn sub_metering_columns_are_optional_as_a_set() {
        let body = "Date;Time;Global_active_power;Global_reactive_power;Voltage;Global_intensity\n16/12/2006;17:24:00;4.2;0.4;234.8;18.4\n";
        let dataset = parse(body).unwrap();
        assert!(!dataset.has_sub_metering);
        assert_eq!(dataset.readings[0].telemetry.sub_metering_1, None);

        let partial = "Date;Time;Global_active_power;Global_reactive_power;Voltage;Global_intensity;Sub_metering_1\n";
        assert!(matches!(
            parse(partial).unwrap_err(),
            ReadError::PartialSubMetering { .. }
        ));
    }

    #[test]
    fn missing_required_header_is_reported() {
        let body = "Date;Time;Global_active_power;Voltage;Global_intensity\n";
        assert!(matches!(
            parse(body).unwrap_err(),
            ReadError::MissingColumn {
                column: "Global_reactive_power"
            }
        ));
    }

    #[test]
    fn row_limit_keeps_leading_rows() {
        let body = format!(
            "{HEADER}16/12/2006;17:24:00;1;0.1;234;4;0;0;1\n16/12/2006;17:25:00;2;0.1;234;8;0;0;1\n16/12/2006;17:26:00;3;0.1;234;12;0;0;1\n"
        );
        let cfg = ReaderConfig {
            row_limit: Some(2),
            ..ReaderConfig::default()
        };
        let dataset = read_raw_from_reader(body.as_bytes(), &cfg).unwrap();
        assert_eq!(dataset.readings.len(), 2);
        assert_eq!(dataset.readings[1].telemetry.global_active_power, Some(2.0));
    }
}
