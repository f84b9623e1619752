//! CLI: stdin JSON -> stdout JSON. Logs go to stderr.
//!
//! Usage:
//!   echo '{"csv_path":"data/machines.csv","columns":["Torque [Nm]"]}' | sensor-anomaly iqr
//!   echo '{"records":[...], "params":{"forest":{"seed":7}}}' | sensor-anomaly iforest
//!   echo '{"csv_path":"data/machines.csv"}' | sensor-anomaly describe
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use sensor_core::{
    detect_anomalies_with, detect_multivariate_anomalies, predict_hardware_failure, read_csv,
    write_csv, ColumnSummary, Dataset, DetectionParams, MultivariateReport, RiskReport,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, io};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct AnalysisRequest {
    #[serde(default)]
    csv_path: Option<PathBuf>,
    #[serde(default)]
    records: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Columns to check; all numeric columns when absent.
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    output_csv: Option<PathBuf>,
    #[serde(default)]
    params: DetectionParams,
}

// --- Output structs ---

#[derive(Debug, Serialize)]
struct IqrOutput {
    generated_at: DateTime<Utc>,
    dataset_rows: usize,
    columns: Vec<String>,
    anomalies: Dataset,
    report: RiskReport,
}

#[derive(Debug, Serialize)]
struct IforestOutput {
    generated_at: DateTime<Utc>,
    feature_columns: Vec<String>,
    report: MultivariateReport,
}

#[derive(Debug, Serialize)]
struct DescribeOutput {
    generated_at: DateTime<Utc>,
    rows: usize,
    columns: Vec<String>,
    summary: Vec<ColumnSummary>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("iqr");

    let request: AnalysisRequest =
        serde_json::from_reader(io::stdin()).context("reading JSON request from stdin")?;
    request.params.validate()?;
    let dataset = load_dataset(&request)?;

    match cmd {
        "describe" => {
            let output = DescribeOutput {
                generated_at: Utc::now(),
                rows: dataset.len(),
                columns: dataset.columns().to_vec(),
                summary: dataset.describe(),
            };
            serde_json::to_writer(io::stdout(), &output)?;
        }
        "iforest" => {
            let features = &request.params.feature_columns;
            info!(features = ?features, "detecting multivariate anomalies");
            let report = detect_multivariate_anomalies(&dataset, features, &request.params.forest)?;
            if let Some(path) = &request.output_csv {
                write_csv(&report.labeled, path)?;
            }
            let output = IforestOutput {
                generated_at: Utc::now(),
                feature_columns: features.clone(),
                report,
            };
            serde_json::to_writer(io::stdout(), &output)?;
        }
        _ => {
            let columns = request.columns.clone().unwrap_or_else(|| {
                dataset
                    .numeric_columns()
                    .into_iter()
                    .map(String::from)
                    .collect()
            });
            info!("detecting anomalies in columns: {}", columns.join(", "));
            let anomalies =
                detect_anomalies_with(&dataset, &columns, request.params.iqr_multiplier);
            let report = predict_hardware_failure(&dataset, &anomalies, &columns);
            let annotated = report.annotate(&dataset)?;
            if let Some(path) = &request.output_csv {
                write_csv(&annotated, path)?;
            }
            let output = IqrOutput {
                generated_at: Utc::now(),
                dataset_rows: dataset.len(),
                columns,
                anomalies: annotated,
                report,
            };
            serde_json::to_writer(io::stdout(), &output)?;
        }
    }
    Ok(())
}

fn load_dataset(request: &AnalysisRequest) -> anyhow::Result<Dataset> {
    let dataset = match &request.csv_path {
        Some(path) => read_csv(path)?,
        None => Dataset::from_records(request.records.clone())?,
    };
    if dataset.is_empty() {
        bail!("Unable to proceed with empty dataset.");
    }
    Ok(dataset)
}
