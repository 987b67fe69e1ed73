use voltedge::{
    init_logging, log_run_finish, log_run_start, log_sink_written, log_sqlite_sink_failed,
    logging_config_from_env, run_pipeline, run_settings_from_env, write_features_csv,
    write_hourly_csv, write_schema_json, SqliteHourlyStore,
};

const HOURLY_FILE: &str = "hourly.csv";
const FEATURES_FILE: &str = "features.csv";
const SCHEMA_FILE: &str = "feature_schema.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging = logging_config_from_env();
    init_logging(&logging)?;

    let settings = run_settings_from_env()?;
    log_run_start(&logging, &settings);

    let output = run_pipeline(&settings.input_path, &settings.pipeline)?;

    let hourly_path = settings.output_dir.join(HOURLY_FILE);
    let rows = write_hourly_csv(&hourly_path, &output.hourly)?;
    log_sink_written("hourly_csv", &hourly_path, rows);

    let features_path = settings.output_dir.join(FEATURES_FILE);
    let rows = write_features_csv(&features_path, &output.features)?;
    log_sink_written("features_csv", &features_path, rows);

    let schema_path = settings.output_dir.join(SCHEMA_FILE);
    write_schema_json(&schema_path, &output.features.schema)?;
    log_sink_written("schema_json", &schema_path, output.features.schema.columns.len());

    if let Some(sqlite_path) = &settings.sqlite_path {
        let stored = SqliteHourlyStore::open(sqlite_path)
            .and_then(|mut store| store.replace_all(&output.hourly));
        match stored {
            Ok(rows) => log_sink_written("sqlite", sqlite_path, rows),
            Err(err) => log_sqlite_sink_failed(sqlite_path, &err),
        }
    }

    log_run_finish(&output);
    Ok(())
}
