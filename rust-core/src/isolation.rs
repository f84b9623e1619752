//! Isolation Forest for unsupervised multivariate anomaly labeling.
//!
//! Anomalies are isolated by fewer random splits, so their average path
//! length across the ensemble is short and their score approaches 1.

use crate::error::{AnalysisError, Result};
use crate::stats::{quantile_sorted, sorted_finite};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Euler–Mascheroni constant, used by the harmonic number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Score above which a row is anomalous when contamination is `Auto`.
pub const AUTO_THRESHOLD: f64 = 0.5;

/// Expected share of anomalies, or `Auto` to use the fixed 0.5 score cut.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contamination {
    #[default]
    Auto,
    Fraction(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// Subsample size per tree, capped at the number of rows.
    pub max_samples: usize,
    pub contamination: Contamination,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: Contamination::Auto,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "must be at least 1"));
        }
        if self.max_samples == 0 {
            return Err(invalid("max_samples", "must be at least 1"));
        }
        if let Contamination::Fraction(c) = self.contamination {
            if !(c > 0.0 && c <= 0.5) {
                return Err(invalid("contamination", "must be in (0, 0.5]"));
            }
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> AnalysisError {
    AnalysisError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(data: &Array2<f64>, indices: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(data, indices, 0, max_depth, rng),
        }
    }

    fn build_node(
        data: &Array2<f64>,
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> IsolationNode {
        let n = indices.len();
        if depth >= max_depth || n <= 1 {
            return IsolationNode::Leaf { size: n };
        }

        let feature = rng.gen_range(0..data.ncols());
        let (min_val, max_val) = indices
            .iter()
            .map(|&i| data[[i, feature]])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        // Constant along this feature: no split possible.
        if max_val <= min_val {
            return IsolationNode::Leaf { size: n };
        }

        // Interpolate rather than take `max - min`, which overflows for extreme magnitudes.
        let u: f64 = rng.gen();
        let threshold = min_val * (1.0 - u) + max_val * u;
        if !threshold.is_finite() {
            return IsolationNode::Leaf { size: n };
        }
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data[[i, feature]] < threshold);
        if left.is_empty() || right.is_empty() {
            return IsolationNode::Leaf { size: n };
        }

        IsolationNode::Internal {
            feature,
            threshold,
            left: Box::new(Self::build_node(data, left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(data, right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold {
                        left
                    } else {
                        right
                    };
                    depth += 1;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` items.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// An isolation forest owned by one analysis. Fit, then score or predict.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    config: ForestConfig,
    trees: Vec<IsolationTree>,
    sample_size: usize,
    threshold: f64,
}

impl IsolationForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            sample_size: 0,
            threshold: AUTO_THRESHOLD,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn fit(&mut self, data: &Array2<f64>) -> Result<()> {
        self.config.validate()?;
        let n_samples = data.nrows();
        if n_samples == 0 || data.ncols() == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "data".to_string(),
                reason: format!("cannot fit on a {}x{} matrix", n_samples, data.ncols()),
            });
        }

        self.sample_size = self.config.max_samples.min(n_samples);
        let max_depth = (self.sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        self.trees = (0..self.config.n_estimators)
            .map(|_| {
                let indices = rand::seq::index::sample(&mut rng, n_samples, self.sample_size)
                    .into_vec();
                IsolationTree::build(data, indices, max_depth, &mut rng)
            })
            .collect();

        self.threshold = match self.config.contamination {
            Contamination::Auto => AUTO_THRESHOLD,
            Contamination::Fraction(c) => {
                let scores = self.score_samples(data);
                let sorted = sorted_finite(scores.as_slice().unwrap_or(&[]));
                quantile_sorted(&sorted, 1.0 - c).unwrap_or(AUTO_THRESHOLD)
            }
        };
        debug!(
            trees = self.trees.len(),
            sample_size = self.sample_size,
            max_depth,
            threshold = self.threshold,
            "isolation forest fitted"
        );
        Ok(())
    }

    /// Anomaly score 2^(−E[h(x)] / c(ψ)) per row, in (0, 1].
    pub fn score_samples(&self, data: &Array2<f64>) -> Array1<f64> {
        let c = average_path_length(self.sample_size);
        data.rows()
            .into_iter()
            .map(|row| {
                if self.trees.is_empty() || c <= 0.0 {
                    return AUTO_THRESHOLD;
                }
                let mean_path = self
                    .trees
                    .iter()
                    .map(|t| t.path_length(row))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2.0_f64.powf(-mean_path / c)
            })
            .collect()
    }

    /// `true` for rows scored strictly above the fitted threshold.
    pub fn predict(&self, data: &Array2<f64>) -> Result<Vec<bool>> {
        if !self.is_fitted() {
            return Err(AnalysisError::InvalidParameter {
                name: "model".to_string(),
                reason: "predict called before fit".to_string(),
            });
        }
        Ok(self
            .score_samples(data)
            .iter()
            .map(|&s| s > self.threshold)
            .collect())
    }
}
