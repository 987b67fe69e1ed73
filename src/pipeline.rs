//! Read → resample → validate → features, as one fail-fast batch.

use std::path::Path;

use thiserror::Error;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::features::{build_features, FeatureError, FeatureMatrix};
use crate::raw_reader::{read_raw_source, ReadError};
use crate::reading::RawDataset;
use crate::resample::{resample_hourly, HourlySeries, ResampleError};
use crate::validate::{validate_series, DataQualityError, ValidationReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error(transparent)]
    DataQuality(#[from] DataQualityError),
    #[error(transparent)]
    Features(#[from] FeatureError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Resample(_) => "resample",
            Self::DataQuality(_) => "validate",
            Self::Features(_) => "features",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub raw_rows: usize,
    pub hourly: HourlySeries,
    pub report: ValidationReport,
    pub features: FeatureMatrix,
}

pub fn run_pipeline(path: &Path, cfg: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    let dataset = read_raw_source(path, &cfg.reader).map_err(|err| stage_failed(err.into()))?;
    run_pipeline_on_dataset(&dataset, cfg)
}

/// Runs every stage after reading. Nothing is returned unless all stages
/// succeed.
pub fn run_pipeline_on_dataset(
    dataset: &RawDataset,
    cfg: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let run = || -> Result<PipelineOutput, PipelineError> {
        let hourly = resample_hourly(dataset, &cfg.resample)?;
        let validated = validate_series(hourly, &cfg.validation)?;
        let mut features = build_features(&validated.series, &cfg.features)?;
        if cfg.drop_incomplete_rows {
            features = features.drop_incomplete_rows();
        }

        Ok(PipelineOutput {
            raw_rows: dataset.readings.len(),
            hourly: validated.series,
            report: validated.report,
            features,
        })
    };

    let output = run().map_err(stage_failed)?;

    info!(
        component = "pipeline",
        event = "pipeline.finish",
        raw_rows = output.raw_rows,
        hourly_rows = output.hourly.records.len(),
        feature_rows = output.features.rows.len(),
        feature_columns = output.features.schema.columns.len(),
        success_rate = output.report.records.success_rate()
    );

    Ok(output)
}

fn stage_failed(err: PipelineError) -> PipelineError {
    error!(
        component = "pipeline",
        event = "pipeline.stage.failed",
        stage = err.stage(),
        error = %err
    );
    err
}
