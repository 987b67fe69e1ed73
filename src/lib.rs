//! VoltEdge household power pipeline.
//!
//! Stages, in order:
//! - raw minute reader (semicolon text or zip archive)
//! - quality tagging, bounded gap fill and hourly resampling
//! - hourly series validation
//! - feature matrix construction

mod calendar;
mod config;
mod features;
mod observability;
mod pipeline;
mod quality;
mod raw_reader;
mod reading;
mod resample;
mod sink;
mod validate;

pub use calendar::{
    day_of_month, day_of_year, is_business_hours, is_peak_hours, iso_week_of_year, quarter,
    CalendarFields, Season,
};
pub use config::{
    run_settings_from_env, run_settings_from_vars, ConfigError, PipelineConfig, RunSettings,
    DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_DIR,
};
pub use features::{
    assert_schema_compatible, build_feature_schema, build_features, build_features_chunked,
    ColumnSummary, FeatureColumn, FeatureConfig, FeatureDType, FeatureError, FeatureMatrix,
    FeatureRow, FeatureSchema, TargetField, FEATURE_SCHEMA_VERSION,
};
pub use observability::{
    init_logging, log_run_finish, log_run_start, log_sink_written, log_sqlite_sink_failed,
    logging_config_from_env, logging_config_from_vars, LogFormat, LoggingConfig, LoggingInitError,
};
pub use pipeline::{run_pipeline, run_pipeline_on_dataset, PipelineError, PipelineOutput};
pub use quality::{minute_flag, QualityFlag, VoltageBand};
pub use raw_reader::{read_raw_from_reader, read_raw_source, ReadError, ReaderConfig};
pub use reading::{
    Aggregation, RawDataset, RawReading, Telemetry, TelemetryField, TELEMETRY_FIELD_COUNT,
};
pub use resample::{
    forward_fill_bounded, hour_bucket, reaggregate_hourly, resample_hourly, HourlyRecord,
    HourlySchema, HourlySeries, ResampleConfig, ResampleError,
};
pub use sink::{
    read_schema_json, write_features_csv, write_hourly_csv, write_schema_json, SinkError,
    SqliteHourlyStore, TIMESTAMP_FORMAT,
};
pub use validate::{
    validate_records, validate_series, Constraint, DataQualityError, DataQualityReport,
    RecordRules, SchemaViolation, ValidatedSeries, ValidationConfig, ValidationReport,
};
