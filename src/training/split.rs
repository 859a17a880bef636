//! Stratified train/test splitting

use crate::error::{HydroError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Minimum members a class needs to appear on both sides of the split
const MIN_CLASS_MEMBERS: usize = 2;

/// Training and held-out partitions
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<u8>,
    pub y_test: Array1<u8>,
    /// Source row of each training sample
    pub train_indices: Vec<usize>,
    /// Source row of each test sample
    pub test_indices: Vec<usize>,
}

/// Seeded stratified splitter
///
/// Class proportions are preserved in both partitions. The same seed and the
/// same labels always give the same partition.
#[derive(Debug, Clone)]
pub struct StratifiedSplitter {
    test_size: f64,
    random_state: u64,
}

impl StratifiedSplitter {
    /// Create a splitter holding out `test_size` of the samples
    pub fn new(test_size: f64) -> Self {
        Self {
            test_size,
            random_state: 42,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Split features and labels
    pub fn split(&self, x: &Array2<f64>, y: &Array1<u8>) -> Result<TrainTestSplit> {
        if x.nrows() != y.len() {
            return Err(HydroError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        let (train_indices, test_indices) = self.split_indices(y)?;

        Ok(TrainTestSplit {
            x_train: x.select(Axis(0), &train_indices),
            x_test: x.select(Axis(0), &test_indices),
            y_train: y.select(Axis(0), &train_indices),
            y_test: y.select(Axis(0), &test_indices),
            train_indices,
            test_indices,
        })
    }

    /// Compute train and test row indices for the labels
    pub fn split_indices(&self, y: &Array1<u8>) -> Result<(Vec<usize>, Vec<usize>)> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(HydroError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }

        // BTreeMap keeps class order, and with it the partition, deterministic.
        let mut class_indices: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in y.iter().enumerate() {
            class_indices.entry(label).or_default().push(idx);
        }

        if class_indices.len() < 2 {
            return Err(HydroError::Split(format!(
                "stratification needs both fraud and normal readings, found {} class(es) in {} samples",
                class_indices.len(),
                y.len()
            )));
        }
        if let Some((label, members)) = class_indices
            .iter()
            .find(|(_, members)| members.len() < MIN_CLASS_MEMBERS)
        {
            return Err(HydroError::Split(format!(
                "class {} has {} member(s), at least {} are required",
                label,
                members.len(),
                MIN_CLASS_MEMBERS
            )));
        }

        let n_samples = y.len();
        let n_classes = class_indices.len();
        let n_test = (self.test_size * n_samples as f64).ceil() as usize;
        let n_train = n_samples - n_test;
        if n_test < n_classes || n_train < n_classes {
            return Err(HydroError::Split(format!(
                "{} test / {} train samples cannot hold {} classes",
                n_test, n_train, n_classes
            )));
        }

        let counts: Vec<usize> = class_indices.values().map(Vec::len).collect();
        let allocation = allocate_test_counts(&counts, n_test, n_samples);

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut train_indices = Vec::with_capacity(n_train);
        let mut test_indices = Vec::with_capacity(n_test);

        for (members, n_class_test) in class_indices.values_mut().zip(allocation) {
            members.shuffle(&mut rng);
            test_indices.extend_from_slice(&members[..n_class_test]);
            train_indices.extend_from_slice(&members[n_class_test..]);
        }

        train_indices.shuffle(&mut rng);
        test_indices.shuffle(&mut rng);

        Ok((train_indices, test_indices))
    }
}

/// Distribute `n_test` slots across classes proportionally to their size
///
/// Floors first, then hands leftover slots to the largest fractional parts
/// (lower class first on ties). Every class keeps at least one member on each
/// side of the split; slots moved by that clamp are rebalanced so the total
/// stays `n_test`. Callers guarantee `n_classes <= n_test <= n_samples - n_classes`.
fn allocate_test_counts(counts: &[usize], n_test: usize, n_samples: usize) -> Vec<usize> {
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| n_test as f64 * c as f64 / n_samples as f64)
        .collect();
    let mut allocation: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let assigned: usize = allocation.iter().sum();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });
    for &class in order.iter().take(n_test.saturating_sub(assigned)) {
        allocation[class] += 1;
    }

    for (a, &c) in allocation.iter_mut().zip(counts) {
        *a = (*a).clamp(1, c - 1);
    }

    // Deficit goes to the largest remainders with room left, surplus comes
    // from the smallest remainders above their floor of one.
    loop {
        let total: usize = allocation.iter().sum();
        let target = if total < n_test {
            order.iter().copied().find(|&k| allocation[k] + 1 < counts[k])
        } else if total > n_test {
            order.iter().rev().copied().find(|&k| allocation[k] > 1)
        } else {
            break;
        };
        match target {
            Some(k) if total < n_test => allocation[k] += 1,
            Some(k) => allocation[k] -= 1,
            None => break,
        }
    }

    allocation
}
