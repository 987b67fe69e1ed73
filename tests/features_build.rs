use chrono::{Duration, NaiveDate, NaiveDateTime};
use voltedge::{
    assert_schema_compatible, build_feature_schema, build_features, build_features_chunked,
    CalendarFields, FeatureConfig, FeatureError, HourlyRecord, HourlySchema, HourlySeries,
    QualityFlag, Telemetry, FEATURE_SCHEMA_VERSION,
};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2007, 1, 1)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

fn hourly(ts: NaiveDateTime, telemetry: Telemetry) -> HourlyRecord {
    let calendar = CalendarFields::from_timestamp(ts);
    HourlyRecord {
        timestamp: ts,
        telemetry,
        quality_flag: QualityFlag::Ok,
        hour_of_day: calendar.hour_of_day,
        day_of_week: calendar.day_of_week,
        month: calendar.month,
        is_weekend: calendar.is_weekend,
        minute_count: 60,
    }
}

fn telemetry(i: usize) -> Telemetry {
    let x = i as f64;
    Telemetry {
        global_active_power: Some(1.0 + (x * 0.37).sin() + x * 0.001),
        global_reactive_power: Some(0.1 + (x * 0.11).cos().abs() * 0.2),
        voltage: Some(235.0 + (x * 0.05).sin() * 4.0),
        global_intensity: Some(5.0 + x * 0.01),
        sub_metering_1: Some((i % 5) as f64 * 10.0),
        sub_metering_2: Some(30.0),
        sub_metering_3: Some(400.0 + x),
    }
}

fn complete_series(hours: usize) -> HourlySeries {
    HourlySeries {
        schema: HourlySchema { sub_metering: true },
        records: (0..hours)
            .map(|i| hourly(start() + Duration::hours(i as i64), telemetry(i)))
            .collect(),
    }
}

fn column(matrix: &voltedge::FeatureMatrix, name: &str) -> Vec<Option<f64>> {
    matrix
        .column(name)
        .unwrap_or_else(|| panic!("column {name} should exist"))
}

#[test]
fn schema_order_and_fingerprint_are_deterministic() {
    let cfg = FeatureConfig::default();
    let schema_a = build_feature_schema(&cfg, &HourlySchema::default());
    let schema_b = build_feature_schema(&cfg, &HourlySchema::default());

    assert_eq!(schema_a, schema_b);
    assert_eq!(schema_a.version, FEATURE_SCHEMA_VERSION);
    assert_eq!(schema_a.fingerprint.len(), 64);
    assert_eq!(schema_a.columns.len(), 46);

    let names: Vec<&str> = schema_a.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names[0], "global_active_power");
    assert_eq!(names[6], "sub_metering_3");
    assert_eq!(names[7..11], ["hour_of_day", "day_of_week", "month", "is_weekend"]);
    assert_eq!(
        names[11..14],
        [
            "global_active_power_lag_1h",
            "global_active_power_lag_24h",
            "global_active_power_lag_168h"
        ]
    );
    assert_eq!(names[14], "global_active_power_rolling_mean_24h");
    assert_eq!(names[15], "global_active_power_rolling_std_24h");
    assert_eq!(names[21], "global_active_power_rolling_max_168h");
    assert_eq!(names[22], "day_of_month");
    assert_eq!(names[28], "season");
    assert_eq!(names[29], "hour_sin");
    assert_eq!(names[36], "day_of_year_cos");
    assert_eq!(names[37], "hour_season_interaction");
    assert_eq!(names[38], "weekend_hour_interaction");
    assert_eq!(
        names[39..43],
        ["total_sub_metering", "sub1_pct", "sub2_pct", "sub3_pct"]
    );
    assert_eq!(
        names[43..],
        ["power_change_1h", "power_change_24h", "power_acceleration"]
    );
}

#[test]
fn schema_tracks_optional_inputs_and_config() {
    let cfg = FeatureConfig {
        include_calendar: false,
        include_cyclical: false,
        ..FeatureConfig::default()
    };
    let schema = build_feature_schema(&cfg, &HourlySchema { sub_metering: false });
    let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();

    assert!(!names.contains(&"sub_metering_1"));
    assert!(!names.contains(&"total_sub_metering"));
    assert!(!names.contains(&"season"));
    assert!(!names.contains(&"hour_season_interaction"));
    assert!(!names.contains(&"hour_sin"));
    assert!(names.contains(&"weekend_hour_interaction"));
    assert!(names.contains(&"power_acceleration"));

    let full = build_feature_schema(&FeatureConfig::default(), &HourlySchema::default());
    assert_ne!(schema.fingerprint, full.fingerprint);

    assert!(assert_schema_compatible(FEATURE_SCHEMA_VERSION, &full.fingerprint, &full).is_ok());
    assert!(matches!(
        assert_schema_compatible(FEATURE_SCHEMA_VERSION, &schema.fingerprint, &full),
        Err(FeatureError::SchemaFingerprintMismatch { .. })
    ));
    assert!(matches!(
        assert_schema_compatible(FEATURE_SCHEMA_VERSION + 1, &full.fingerprint, &full),
        Err(FeatureError::SchemaVersionMismatch { .. })
    ));
}

#[test]
fn lag_columns_equal_shifted_target() {
    let series = complete_series(200);
    let matrix = build_features(&series, &FeatureConfig::default()).expect("build succeeds");
    let target = column(&matrix, "global_active_power");

    for k in [1usize, 24, 168] {
        let lag = column(&matrix, &format!("global_active_power_lag_{k}h"));
        for i in 0..series.records.len() {
            if i < k {
                assert_eq!(lag[i], None, "lag {k} row {i}");
            } else {
                assert_eq!(lag[i], target[i - k], "lag {k} row {i}");
            }
        }
    }
}

#[test]
fn single_hour_window_reduces_to_the_value() {
    let cfg = FeatureConfig {
        rolling_windows: vec![1],
        ..FeatureConfig::default()
    };
    let series = complete_series(30);
    let matrix = build_features(&series, &cfg).expect("build succeeds");
    let target = column(&matrix, "global_active_power");

    assert_eq!(column(&matrix, "global_active_power_rolling_mean_1h"), target);
    assert_eq!(column(&matrix, "global_active_power_rolling_min_1h"), target);
    assert_eq!(column(&matrix, "global_active_power_rolling_max_1h"), target);
    assert!(column(&matrix, "global_active_power_rolling_std_1h")
        .iter()
        .all(Option::is_none));
}

#[test]
fn rolling_columns_only_look_backwards() {
    let mut series = complete_series(60);
    let cfg = FeatureConfig::default();
    let before = build_features(&series, &cfg).expect("build succeeds");

    series.records[59].telemetry.global_active_power = Some(1_000.0);
    let after = build_features(&series, &cfg).expect("build succeeds");

    let name = "global_active_power_rolling_max_24h";
    assert_eq!(column(&before, name)[..59], column(&after, name)[..59]);
    assert_eq!(column(&after, name)[59], Some(1_000.0));
}

#[test]
fn cyclical_pairs_lie_on_the_unit_circle() {
    let matrix = build_features(&complete_series(100), &FeatureConfig::default())
        .expect("build succeeds");

    for prefix in ["hour", "day", "month", "day_of_year"] {
        let sin = column(&matrix, &format!("{prefix}_sin"));
        let cos = column(&matrix, &format!("{prefix}_cos"));
        for (s, c) in sin.iter().zip(cos.iter()) {
            let (s, c) = (s.expect("sin defined"), c.expect("cos defined"));
            assert!((s * s + c * c - 1.0).abs() < 1e-12);
        }
    }
}

#[test]
fn sub_metering_shares_and_total() {
    let ts = start();
    let mut values = telemetry(0);
    values.sub_metering_1 = Some(1000.0);
    values.sub_metering_2 = Some(1000.0);
    values.sub_metering_3 = Some(17000.0);
    let mut zero = telemetry(1);
    zero.sub_metering_1 = Some(0.0);
    zero.sub_metering_2 = Some(0.0);
    zero.sub_metering_3 = Some(0.0);

    let series = HourlySeries {
        schema: HourlySchema { sub_metering: true },
        records: vec![hourly(ts, values), hourly(ts + Duration::hours(1), zero)],
    };
    let matrix = build_features(&series, &FeatureConfig::default()).expect("build succeeds");

    assert_eq!(column(&matrix, "total_sub_metering"), vec![Some(19000.0), Some(0.0)]);
    let expected = [5.26, 5.26, 89.47];
    for (idx, want) in expected.iter().enumerate() {
        let pct = column(&matrix, &format!("sub{}_pct", idx + 1));
        assert!((pct[0].expect("share defined") - want).abs() < 0.01);
        assert_eq!(pct[1], Some(0.0));
    }
}

#[test]
fn rate_of_change_columns_follow_the_target() {
    // target[i] = i^2: 1h change 2i - 1, 24h change 48i - 576, acceleration 2.
    // Row 27 has no target.
    let mut series = complete_series(30);
    for (i, record) in series.records.iter_mut().enumerate() {
        record.telemetry.global_active_power = Some((i * i) as f64);
    }
    series.records[27].telemetry.global_active_power = None;

    let matrix = build_features(&series, &FeatureConfig::default()).expect("build succeeds");
    let change_1h = column(&matrix, "power_change_1h");
    let change_24h = column(&matrix, "power_change_24h");
    let acceleration = column(&matrix, "power_acceleration");

    for i in 0..30 {
        let x = i as f64;
        let expected_1h = if i >= 1 && i != 27 && i != 28 {
            Some(2.0 * x - 1.0)
        } else {
            None
        };
        let expected_24h = if i >= 24 && i != 27 {
            Some(48.0 * x - 576.0)
        } else {
            None
        };
        let expected_acc = if i >= 2 && !(27..=29).contains(&i) {
            Some(2.0)
        } else {
            None
        };

        assert_eq!(change_1h[i], expected_1h, "power_change_1h row {i}");
        assert_eq!(change_24h[i], expected_24h, "power_change_24h row {i}");
        assert_eq!(acceleration[i], expected_acc, "power_acceleration row {i}");
    }
}

#[test]
fn season_follows_meteorological_months() {
    let months = [(1, 0.0), (2, 0.0), (4, 1.0), (7, 2.0), (10, 3.0), (12, 0.0)];
    let records: Vec<HourlyRecord> = months
        .iter()
        .map(|(month, _)| {
            let ts = NaiveDate::from_ymd_opt(2008, *month, 15)
                .expect("valid date")
                .and_hms_opt(12, 0, 0)
                .expect("valid time");
            hourly(ts, telemetry(*month as usize))
        })
        .collect();
    let series = HourlySeries {
        schema: HourlySchema::default(),
        records,
    };

    let matrix = build_features(&series, &FeatureConfig::default()).expect("build succeeds");
    let season = column(&matrix, "season");
    let interaction = column(&matrix, "hour_season_interaction");
    for (idx, (_, code)) in months.iter().enumerate() {
        assert_eq!(season[idx], Some(*code));
        assert_eq!(interaction[idx], Some(12.0 * code));
    }
}

#[test]
fn dropping_incomplete_rows_removes_the_longest_lag_head() {
    let series = complete_series(200);
    let matrix = build_features(&series, &FeatureConfig::default()).expect("build succeeds");
    assert_eq!(matrix.rows.len(), 200);

    let complete = matrix.drop_incomplete_rows();
    assert_eq!(complete.rows.len(), 200 - 168);
    assert_eq!(complete.rows[0].timestamp, series.records[168].timestamp);
    assert!(complete.rows.iter().all(|row| row.is_complete()));
}

#[test]
fn chunked_build_matches_whole_series_build() {
    let mut series = complete_series(400);
    series.records[10].telemetry.global_active_power = None;
    series.records[250].telemetry.global_active_power = None;
    series.records[251].quality_flag = QualityFlag::Degraded;

    let cfg = FeatureConfig::default();
    let whole = build_features(&series, &cfg).expect("whole build succeeds");

    for chunk_rows in [1usize, 7, 64, 169, 1_000] {
        let chunked =
            build_features_chunked(&series, &cfg, chunk_rows).expect("chunked build succeeds");
        assert_eq!(chunked, whole, "chunk_rows={chunk_rows}");
    }

    assert!(matches!(
        build_features_chunked(&series, &cfg, 0),
        Err(FeatureError::InvalidConfig(_))
    ));
}

#[test]
fn unordered_hours_are_rejected() {
    let mut series = complete_series(5);
    series.records.swap(2, 3);

    let err = build_features(&series, &FeatureConfig::default()).unwrap_err();
    assert_eq!(err, FeatureError::UnorderedTimestamps { index: 3 });
}

#[test]
fn column_summaries_report_missing_and_spread() {
    let matrix = build_features(&complete_series(48), &FeatureConfig::default())
        .expect("build succeeds");
    let summaries = matrix.column_summaries();

    assert_eq!(summaries.len(), matrix.schema.columns.len());

    let lag = summaries
        .iter()
        .find(|s| s.name == "global_active_power_lag_24h")
        .expect("lag summary present");
    assert_eq!(lag.missing, 24);
    assert!((lag.missing_pct - 50.0).abs() < 1e-12);

    let sub2 = summaries
        .iter()
        .find(|s| s.name == "sub_metering_2")
        .expect("sub_metering_2 summary present");
    assert_eq!(sub2.distinct, 1);
    assert_eq!(sub2.mean, Some(30.0));
    assert_eq!(sub2.std, Some(0.0));
}
