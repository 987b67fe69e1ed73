use chrono::{NaiveDate, NaiveDateTime};
use voltedge::{
    reaggregate_hourly, resample_hourly, QualityFlag, RawDataset, RawReading, ResampleConfig,
    Telemetry,
};

fn minute(day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2007, 3, day)
        .expect("valid date")
        .and_hms_opt(hour, min, 0)
        .expect("valid time")
}

fn reading(ts: NaiveDateTime, power: Option<f64>, voltage: Option<f64>) -> RawReading {
    RawReading {
        timestamp: ts,
        telemetry: Telemetry {
            global_active_power: power,
            global_reactive_power: Some(0.1),
            voltage,
            global_intensity: Some(10.0),
            sub_metering_1: Some(0.0),
            sub_metering_2: Some(1.0),
            sub_metering_3: Some(17.0),
        },
    }
}

fn dataset(readings: Vec<RawReading>) -> RawDataset {
    RawDataset {
        readings,
        has_sub_metering: true,
    }
}

#[test]
fn filled_minute_counts_toward_mean_but_degrades_the_hour() {
    let raw = dataset(vec![
        reading(minute(1, 10, 0), Some(2.0), Some(230.0)),
        reading(minute(1, 10, 1), Some(2.4), Some(231.0)),
        reading(minute(1, 10, 2), None, Some(231.0)),
    ]);

    let series = resample_hourly(&raw, &ResampleConfig::default()).expect("resample succeeds");

    assert_eq!(series.records.len(), 1);
    let hour = &series.records[0];
    assert_eq!(hour.timestamp, minute(1, 10, 0));
    assert_eq!(hour.quality_flag, QualityFlag::Degraded);
    assert_eq!(hour.minute_count, 3);

    // The third minute carries the forward-filled 2.4.
    let power = hour.telemetry.global_active_power.expect("power defined");
    assert!((power - (2.0 + 2.4 + 2.4) / 3.0).abs() < 1e-12);
    assert!((power - 2.2).abs() < 0.1);
}

#[test]
fn sub_metering_is_summed_and_power_is_averaged() {
    let raw = dataset(
        (0..60)
            .map(|m| reading(minute(1, 11, m), Some(1.0 + m as f64 / 100.0), Some(235.0)))
            .collect(),
    );

    let series = resample_hourly(&raw, &ResampleConfig::default()).expect("resample succeeds");
    let hour = &series.records[0];

    assert_eq!(hour.quality_flag, QualityFlag::Ok);
    assert_eq!(hour.telemetry.sub_metering_1, Some(0.0));
    assert_eq!(hour.telemetry.sub_metering_2, Some(60.0));
    assert_eq!(hour.telemetry.sub_metering_3, Some(1020.0));
    let power = hour.telemetry.global_active_power.expect("power defined");
    assert!((power - 1.295).abs() < 1e-9);
    assert_eq!(hour.telemetry.voltage, Some(235.0));
}

#[test]
fn out_of_band_voltage_marks_hour_suspicious() {
    let mut readings: Vec<RawReading> = (0..5)
        .map(|m| reading(minute(2, 8, m), Some(1.0), Some(230.0)))
        .collect();
    readings[3].telemetry.voltage = Some(300.0);

    let series =
        resample_hourly(&dataset(readings), &ResampleConfig::default()).expect("resample succeeds");
    assert_eq!(series.records[0].quality_flag, QualityFlag::SuspiciousVoltage);

    let collapsed = ResampleConfig {
        escalate_suspicious_voltage: false,
        ..ResampleConfig::default()
    };
    let mut readings: Vec<RawReading> = (0..5)
        .map(|m| reading(minute(2, 8, m), Some(1.0), Some(230.0)))
        .collect();
    readings[3].telemetry.voltage = Some(300.0);
    let series = resample_hourly(&dataset(readings), &collapsed).expect("resample succeeds");
    assert_eq!(series.records[0].quality_flag, QualityFlag::Degraded);
}

#[test]
fn hour_is_ok_only_when_every_minute_is_ok() {
    let readings = vec![
        reading(minute(3, 0, 0), Some(1.0), Some(230.0)),
        reading(minute(3, 0, 30), Some(1.0), Some(230.0)),
        reading(minute(3, 1, 0), Some(1.0), Some(230.0)),
        reading(minute(3, 1, 1), Some(1.0), None),
    ];

    let series =
        resample_hourly(&dataset(readings), &ResampleConfig::default()).expect("resample succeeds");
    let flags: Vec<QualityFlag> = series.records.iter().map(|r| r.quality_flag).collect();
    assert_eq!(flags, vec![QualityFlag::Ok, QualityFlag::Degraded]);
}

#[test]
fn resampling_an_hourly_series_is_idempotent() {
    let mut readings = Vec::new();
    for hour in 0..6 {
        for m in 0..60 {
            let power = if (hour + m) % 13 == 0 {
                None
            } else {
                Some(0.5 + hour as f64 * 0.1 + m as f64 * 0.01)
            };
            let voltage = if hour == 4 && m == 7 {
                Some(199.0)
            } else {
                Some(232.0)
            };
            readings.push(reading(minute(4, hour, m), power, voltage));
        }
    }

    let cfg = ResampleConfig::default();
    let once = resample_hourly(&dataset(readings), &cfg).expect("first pass succeeds");
    let twice = reaggregate_hourly(&once, &cfg).expect("second pass succeeds");

    assert_eq!(once.records.len(), 6);
    assert_eq!(once, twice);
    assert_eq!(once.records[4].quality_flag, QualityFlag::SuspiciousVoltage);
}

#[test]
fn hours_without_readings_are_not_synthesized() {
    let readings = vec![
        reading(minute(5, 1, 0), Some(1.0), Some(230.0)),
        reading(minute(5, 4, 0), Some(2.0), Some(230.0)),
    ];

    let series =
        resample_hourly(&dataset(readings), &ResampleConfig::default()).expect("resample succeeds");
    let hours: Vec<NaiveDateTime> = series.records.iter().map(|r| r.timestamp).collect();
    assert_eq!(hours, vec![minute(5, 1, 0), minute(5, 4, 0)]);
}
