//! Isolation Forest anomaly detection

use crate::anomaly::{AnomalyDetector, ANOMALY, NORMAL};
use crate::error::{HydroError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Feature spread below which a node cannot be split
const MIN_SPREAD: f64 = 1e-10;

/// Isolation Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node with split
    Internal {
        /// Feature index for split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Left subtree (values < threshold)
        left: Box<IsolationTree>,
        /// Right subtree (values >= threshold)
        right: Box<IsolationTree>,
    },
    /// External (leaf) node
    External {
        /// Number of samples in this node
        size: usize,
    },
}

impl IsolationTree {
    /// Build an isolation tree over the rows of `x` listed in `indices`
    pub fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();

        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        // Features that still vary within this node
        let candidates: Vec<(usize, f64, f64)> = (0..x.ncols())
            .filter_map(|feature| {
                let (min_val, max_val) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| {
                        let v = x[[i, feature]];
                        (lo.min(v), hi.max(v))
                    },
                );
                let splittable = min_val.is_finite()
                    && max_val.is_finite()
                    && max_val - min_val > MIN_SPREAD;
                splittable.then_some((feature, min_val, max_val))
            })
            .collect();

        if candidates.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let (feature, min_val, max_val) = candidates[rng.gen_range(0..candidates.len())];
        // Interpolate rather than scale the spread, which overflows for
        // ranges wider than f64::MAX.
        let t: f64 = rng.gen();
        let threshold = min_val * (1.0 - t) + max_val * t;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] < threshold);

        // If split is degenerate, create a leaf
        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        let left = Box::new(Self::build(x, &left_indices, height + 1, max_height, rng));
        let right = Box::new(Self::build(x, &right_indices, height + 1, max_height, rng));

        IsolationTree::Internal {
            feature,
            threshold,
            left,
            right,
        }
    }

    /// Path length for a sample: splits traversed plus the expected
    /// remaining depth of the leaf it lands in
    pub fn path_length(&self, sample: ArrayView1<'_, f64>, current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_height as f64 + average_path_length(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }

    /// Number of nodes in the tree
    pub fn n_nodes(&self) -> usize {
        match self {
            IsolationTree::External { .. } => 1,
            IsolationTree::Internal { left, right, .. } => 1 + left.n_nodes() + right.n_nodes(),
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree
/// of `n` nodes: c(n) = 2 * H(n-1) - 2(n-1)/n, with H(i) ~ ln(i) + gamma
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else if n == 2 {
        1.0
    } else {
        let n_f = n as f64;
        2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
    }
}

/// Isolation Forest anomaly detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Number of trees
    n_estimators: usize,
    /// Maximum samples per tree
    max_samples: usize,
    /// Contamination ratio (expected proportion of outliers)
    contamination: f64,
    /// Random seed
    seed: Option<u64>,
    /// Worker threads; `None` uses the global rayon pool
    #[serde(skip)]
    n_jobs: Option<usize>,
    /// Fitted trees
    trees: Option<Vec<IsolationTree>>,
    /// Decision threshold
    threshold: Option<f64>,
    /// Subsample size each tree was built from
    n_samples: Option<usize>,
    /// Width of the training matrix
    n_features: Option<usize>,
}

impl IsolationForest {
    /// Create new Isolation Forest
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: None,
            n_jobs: None,
            trees: None,
            threshold: None,
            n_samples: None,
            n_features: None,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set maximum samples per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(2);
        self
    }

    /// Set contamination ratio
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Limit the worker pool used for building and scoring
    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = Some(n.max(1));
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Whether `fit` has completed
    pub fn is_fitted(&self) -> bool {
        self.trees.is_some() && self.threshold.is_some()
    }

    /// Fitted trees, if any
    pub fn trees(&self) -> Option<&[IsolationTree]> {
        self.trees.as_deref()
    }

    /// Subsample size used per tree, once fitted
    pub fn subsample_size(&self) -> Option<usize> {
        self.n_samples
    }

    /// Run `op` on the configured worker pool
    fn in_pool<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match self.n_jobs {
            Some(n_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .build()
                    .map_err(|e| HydroError::Training(format!("thread pool: {}", e)))?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }

    /// Compute anomaly score for samples
    /// Score is between 0 and 1, higher means more anomalous
    fn compute_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or(HydroError::ModelNotFitted)?;
        let n_features = self.n_features.ok_or(HydroError::ModelNotFitted)?;
        if x.ncols() != n_features {
            return Err(HydroError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let c_n = average_path_length(self.n_samples.ok_or(HydroError::ModelNotFitted)?);
        let n_trees = trees.len() as f64;

        let scores = self.in_pool(|| {
            (0..x.nrows())
                .into_par_iter()
                .map(|i| {
                    let sample = x.row(i);
                    let avg_path_length = trees
                        .iter()
                        .map(|tree| tree.path_length(sample, 0))
                        .sum::<f64>()
                        / n_trees;

                    // s(x, n) = 2^(-E[h(x)] / c(n))
                    2.0_f64.powf(-avg_path_length / c_n)
                })
                .collect::<Vec<f64>>()
        })?;

        Ok(Array1::from_vec(scores))
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyDetector for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples < 2 {
            return Err(HydroError::Training(format!(
                "isolation forest needs at least 2 samples, got {}",
                n_samples
            )));
        }
        if x.ncols() == 0 {
            return Err(HydroError::Training("feature matrix has no columns".to_string()));
        }

        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree.max(2) as f64).log2().ceil() as usize;

        // One master stream hands each tree its own seed, so the forest does not
        // depend on how rayon schedules the work.
        let mut master = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| master.next_u64()).collect();

        let trees = self.in_pool(|| {
            tree_seeds
                .par_iter()
                .map(|&tree_seed| {
                    let mut rng = Xoshiro256PlusPlus::seed_from_u64(tree_seed);
                    let indices = index::sample(&mut rng, n_samples, samples_per_tree).into_vec();
                    IsolationTree::build(x, &indices, 0, max_height, &mut rng)
                })
                .collect::<Vec<IsolationTree>>()
        })?;

        self.trees = Some(trees);
        self.n_samples = Some(samples_per_tree);
        self.n_features = Some(x.ncols());

        // Threshold at the (1 - contamination) quantile of the training scores
        let scores = self.compute_scores(x)?;
        let sorted: Vec<f64> = {
            let mut s = scores.to_vec();
            s.sort_by(|a, b| a.total_cmp(b));
            s
        };
        self.threshold = Some(quantile_sorted(&sorted, 1.0 - self.contamination));

        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.compute_scores(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        let threshold = self.threshold.ok_or(HydroError::ModelNotFitted)?;
        let scores = self.score_samples(x)?;

        Ok(scores.mapv(|s| if s > threshold { ANOMALY } else { NORMAL }))
    }

    fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(0.5)
    }
}

/// Linearly interpolated quantile of ascending `sorted` values
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn clustered_with_outliers() -> Array2<f64> {
        // Normal data cluster: 50 points with 2 features each
        let mut data = Vec::new();
        for i in 0..50 {
            data.push((i % 10) as f64);
            data.push(((i % 10) + 1) as f64);
        }
        // Add 2 outliers
        data.extend_from_slice(&[100.0, 100.0]);
        data.extend_from_slice(&[-50.0, -50.0]);

        Array2::from_shape_vec((52, 2), data).unwrap()
    }

    fn uniform(n: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::from_shape_fn((n, 6), |_| rng.gen_range(0.0..10.0))
    }

    #[test]
    fn test_isolation_forest_basic() {
        let x = clustered_with_outliers();

        let mut iforest = IsolationForest::new()
            .with_n_estimators(50)
            .with_contamination(0.05)
            .with_seed(42);

        iforest.fit(&x).unwrap();

        let scores = iforest.score_samples(&x).unwrap();
        let labels = iforest.predict(&x).unwrap();

        // Outliers should have higher scores
        assert!(scores[50] > scores[0]);
        assert!(scores[51] > scores[0]);
        assert!(scores.iter().all(|&s| s > 0.0 && s < 1.0));

        assert_eq!(labels[50], ANOMALY);
        assert_eq!(labels[51], ANOMALY);
    }

    #[test]
    fn test_isolation_tree_path_length() {
        let x = Array2::from_shape_vec(
            (10, 2),
            vec![
                1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0,
                6.0, 6.0, 7.0, 7.0, 8.0, 8.0, 9.0, 9.0, 10.0, 10.0,
            ],
        )
        .unwrap();

        let indices: Vec<usize> = (0..10).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let tree = IsolationTree::build(&x, &indices, 0, 10, &mut rng);

        let probe = ndarray::array![5.0, 5.0];
        assert!(tree.path_length(probe.view(), 0) > 0.0);
        assert!(tree.n_nodes() > 1);
    }

    #[test]
    fn test_constant_node_is_leaf() {
        let x = Array2::from_elem((8, 3), 4.2);
        let indices: Vec<usize> = (0..8).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let tree = IsolationTree::build(&x, &indices, 0, 3, &mut rng);
        assert_eq!(tree, IsolationTree::External { size: 8 });
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.2448).abs() < 1e-3);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let x = uniform(300, 3);
        let mut a = IsolationForest::new().with_contamination(0.1).with_seed(42);
        let mut b = IsolationForest::new().with_contamination(0.1).with_seed(42);
        a.fit(&x).unwrap();
        b.fit(&x).unwrap();

        assert_eq!(a.trees(), b.trees());
        assert_eq!(a.threshold(), b.threshold());
        assert_eq!(a.score_samples(&x).unwrap(), b.score_samples(&x).unwrap());
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let x = uniform(200, 5);
        let mut single = IsolationForest::new().with_seed(9).with_n_jobs(1);
        let mut pooled = IsolationForest::new().with_seed(9).with_n_jobs(4);
        single.fit(&x).unwrap();
        pooled.fit(&x).unwrap();

        assert_eq!(single.predict(&x).unwrap(), pooled.predict(&x).unwrap());
        assert_eq!(single.threshold(), pooled.threshold());
    }

    #[test]
    fn test_contamination_sets_flagged_fraction() {
        let x = uniform(500, 11);
        let mut iforest = IsolationForest::new().with_contamination(0.1).with_seed(42);
        iforest.fit(&x).unwrap();

        let result = iforest.detect(&x).unwrap();
        assert!(result.n_anomalies <= 50, "flagged {}", result.n_anomalies);
        assert!(result.n_anomalies >= 40, "flagged {}", result.n_anomalies);
    }

    #[test]
    fn test_subsample_capped_by_training_size() {
        let x = uniform(40, 2);
        let mut iforest = IsolationForest::new().with_seed(1);
        iforest.fit(&x).unwrap();

        assert_eq!(iforest.subsample_size(), Some(40));
        assert_eq!(iforest.trees().map(<[IsolationTree]>::len), Some(100));
    }

    #[test]
    fn test_unfitted_and_shape_errors() {
        let iforest = IsolationForest::new();
        assert!(matches!(
            iforest.predict(&uniform(5, 1)),
            Err(HydroError::ModelNotFitted)
        ));

        let mut iforest = IsolationForest::new().with_seed(1);
        iforest.fit(&uniform(50, 1)).unwrap();
        let narrow = Array2::<f64>::zeros((3, 2));
        assert!(matches!(
            iforest.score_samples(&narrow),
            Err(HydroError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_extreme_value_range_fits() {
        let mut x = uniform(64, 4);
        x[[0, 2]] = -1e308;
        x[[1, 2]] = 1e308;
        x[[2, 2]] = f64::MAX;

        let mut iforest = IsolationForest::new().with_contamination(0.05).with_seed(42);
        iforest.fit(&x).unwrap();

        let scores = iforest.score_samples(&x).unwrap();
        assert!(scores.iter().all(|s| s.is_finite()));
        assert!(scores[0] > scores[10]);
    }

    #[test]
    fn test_worker_count_not_serialized() {
        let x = uniform(100, 6);
        let mut single = IsolationForest::new().with_seed(3);
        let mut pooled = IsolationForest::new().with_seed(3).with_n_jobs(4);
        single.fit(&x).unwrap();
        pooled.fit(&x).unwrap();

        let pooled_bytes = bincode::serialize(&pooled).unwrap();
        assert_eq!(bincode::serialize(&single).unwrap(), pooled_bytes);

        let restored: IsolationForest = bincode::deserialize(&pooled_bytes).unwrap();
        assert_eq!(restored.n_jobs, None);
        assert_eq!(restored.predict(&x).unwrap(), pooled.predict(&x).unwrap());
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 5.0);
        assert_eq!(quantile_sorted(&sorted, 0.5), 3.0);
        assert!((quantile_sorted(&sorted, 0.9) - 4.6).abs() < 1e-12);
    }
}
