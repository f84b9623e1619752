//! Multivariate anomaly labeling with an isolation forest over fixed features.

use crate::error::{AnalysisError, Result};
use crate::isolation::{ForestConfig, IsolationForest};
use crate::models::{ColumnType, Dataset, Value};
use crate::verdict::Verdict;
use ndarray::Array2;
use serde::Serialize;
use tracing::info;

/// Label column added to the annotated copy: 1 anomalous, 0 normal.
pub const ANOMALY_LABEL_COLUMN: &str = "anomaly";

#[derive(Debug, Clone, Serialize)]
pub struct MultivariateReport {
    pub labeled: Dataset,
    pub scores: Vec<f64>,
    pub anomaly_count: usize,
    pub total_rows: usize,
    /// Share of anomalous rows, 0-100.
    pub anomaly_percent: f64,
    pub verdict: Verdict,
}

impl MultivariateReport {
    pub fn is_anomalous(&self, row: usize) -> bool {
        let Some(idx) = self.labeled.column_index(ANOMALY_LABEL_COLUMN) else {
            return false;
        };
        self.labeled.value(row, idx) == Some(&Value::Number(1.0))
    }
}

/// Fit a fresh forest on `feature_columns` and label every row.
///
/// Every feature column must be present, numeric and complete: the model
/// needs a fixed-width feature vector per row.
pub fn detect_multivariate_anomalies<S: AsRef<str>>(
    dataset: &Dataset,
    feature_columns: &[S],
    config: &ForestConfig,
) -> Result<MultivariateReport> {
    config.validate()?;
    if feature_columns.is_empty() {
        return Err(AnalysisError::NoFeatureColumns);
    }

    let indices = feature_columns
        .iter()
        .map(|c| {
            let name = c.as_ref();
            dataset
                .column_index(name)
                .ok_or_else(|| AnalysisError::MissingFeatureColumn(name.to_string()))
        })
        .collect::<Result<Vec<usize>>>()?;

    if dataset.is_empty() {
        info!("empty dataset, no rows to label");
        return Ok(MultivariateReport {
            labeled: dataset.with_column(ANOMALY_LABEL_COLUMN, Vec::new())?,
            scores: Vec::new(),
            anomaly_count: 0,
            total_rows: 0,
            anomaly_percent: 0.0,
            verdict: Verdict::from_anomaly_percent(0.0),
        });
    }

    for (&idx, name) in indices.iter().zip(feature_columns) {
        if dataset.column_type(idx) != Some(ColumnType::Numeric) {
            return Err(AnalysisError::NonNumericFeatureColumn(
                name.as_ref().to_string(),
            ));
        }
    }

    let features = feature_matrix(dataset, &indices, feature_columns)?;
    let mut forest = IsolationForest::new(config.clone());
    forest.fit(&features)?;
    let scores = forest.score_samples(&features).to_vec();
    let labels = forest.predict(&features)?;

    let total_rows = labels.len();
    let anomaly_count = labels.iter().filter(|&&a| a).count();
    let anomaly_percent = anomaly_count as f64 / total_rows as f64 * 100.0;
    let verdict = Verdict::from_anomaly_percent(anomaly_percent);
    info!(
        anomaly_count,
        total_rows,
        anomaly_percent,
        level = %verdict.level,
        "multivariate detection done"
    );

    let label_values = labels
        .iter()
        .map(|&a| Value::Number(if a { 1.0 } else { 0.0 }))
        .collect();
    Ok(MultivariateReport {
        labeled: dataset.with_column(ANOMALY_LABEL_COLUMN, label_values)?,
        scores,
        anomaly_count,
        total_rows,
        anomaly_percent,
        verdict,
    })
}

fn feature_matrix<S: AsRef<str>>(
    dataset: &Dataset,
    indices: &[usize],
    names: &[S],
) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((dataset.len(), indices.len()));
    for (row, cells) in dataset.rows().iter().enumerate() {
        for (j, (&idx, name)) in indices.iter().zip(names).enumerate() {
            matrix[[row, j]] = cells[idx].as_f64().ok_or_else(|| {
                AnalysisError::MissingFeatureValue {
                    column: name.as_ref().to_string(),
                    row,
                }
            })?;
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::RiskLevel;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sensor_dataset(n_normal: usize, n_outliers: usize) -> Dataset {
        let mut rng = StdRng::seed_from_u64(3);
        let mut rows = Vec::new();
        for i in 0..n_normal {
            rows.push(vec![
                Value::Text(format!("M{}", i)),
                Value::Number(300.0 + rng.gen_range(-1.0..1.0)),
                Value::Number(1500.0 + rng.gen_range(-20.0..20.0)),
            ]);
        }
        for i in 0..n_outliers {
            rows.push(vec![
                Value::Text(format!("X{}", i)),
                Value::Number(340.0 + i as f64 * 5.0),
                Value::Number(2800.0 + i as f64 * 50.0),
            ]);
        }
        Dataset::new(vec!["id".into(), "temp".into(), "rpm".into()], rows).unwrap()
    }

    #[test]
    fn test_labels_obvious_outliers() {
        let ds = sensor_dataset(200, 2);
        let report =
            detect_multivariate_anomalies(&ds, &["temp", "rpm"], &ForestConfig::default()).unwrap();

        assert_eq!(report.total_rows, 202);
        assert!(report.is_anomalous(200));
        assert!(report.is_anomalous(201));
        assert_eq!(report.labeled.columns().last().unwrap(), ANOMALY_LABEL_COLUMN);
        assert_eq!(ds.columns().len(), 3);
        let expected = report.anomaly_count as f64 / 202.0 * 100.0;
        assert!((report.anomaly_percent - expected).abs() < 1e-12);
        assert_eq!(report.verdict.statistic, Some(report.anomaly_percent));
    }

    #[test]
    fn test_same_seed_same_proportion() {
        let ds = sensor_dataset(120, 5);
        let config = ForestConfig::default().with_seed(99);
        let a = detect_multivariate_anomalies(&ds, &["temp", "rpm"], &config).unwrap();
        let b = detect_multivariate_anomalies(&ds, &["temp", "rpm"], &config).unwrap();
        assert_eq!(a.anomaly_percent, b.anomaly_percent);
        assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn test_empty_dataset_is_low() {
        let ds = Dataset::new(vec!["temp".into(), "rpm".into()], vec![]).unwrap();
        let report =
            detect_multivariate_anomalies(&ds, &["temp", "rpm"], &ForestConfig::default()).unwrap();
        assert_eq!(report.total_rows, 0);
        assert_eq!(report.anomaly_percent, 0.0);
        assert_eq!(report.verdict.level, RiskLevel::Low);
        assert!(report.labeled.is_empty());
    }

    #[test]
    fn test_missing_feature_column_fails() {
        let ds = sensor_dataset(10, 0);
        let err = detect_multivariate_anomalies(&ds, &["temp", "Torque [Nm]"], &ForestConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingFeatureColumn(c) if c == "Torque [Nm]"));
    }

    #[test]
    fn test_non_numeric_feature_column_fails() {
        let ds = sensor_dataset(10, 0);
        let err = detect_multivariate_anomalies(&ds, &["id", "temp"], &ForestConfig::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NonNumericFeatureColumn(c) if c == "id"));
    }

    #[test]
    fn test_missing_feature_value_fails() {
        let ds = Dataset::new(
            vec!["temp".into()],
            vec![vec![Value::Number(1.0)], vec![Value::Missing]],
        )
        .unwrap();
        let err = detect_multivariate_anomalies(&ds, &["temp"], &ForestConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MissingFeatureValue { row: 1, .. }
        ));
    }

    #[test]
    fn test_extreme_feature_values_are_scored() {
        let rows = (0..20)
            .map(|i| vec![Value::Number(if i % 2 == 0 { -1.0e308 } else { 1.0e308 })])
            .collect();
        let ds = Dataset::new(vec!["v".into()], rows).unwrap();
        let report = detect_multivariate_anomalies(&ds, &["v"], &ForestConfig::default()).unwrap();
        assert_eq!(report.total_rows, 20);
        assert!(report.scores.iter().all(|s| s.is_finite()));
        assert!((0.0..=100.0).contains(&report.anomaly_percent));
    }

    #[test]
    fn test_no_features_fails() {
        let ds = sensor_dataset(5, 0);
        let none: [&str; 0] = [];
        assert!(matches!(
            detect_multivariate_anomalies(&ds, &none, &ForestConfig::default()),
            Err(AnalysisError::NoFeatureColumns)
        ));
    }
}
