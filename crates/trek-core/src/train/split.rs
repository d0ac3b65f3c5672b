//! Stratified train/test split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of the two partitions, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition row indices so every class keeps its share in both halves.
///
/// Classes are visited in index order with one shared `StdRng`; each class
/// holds out `round(n * test_size)` of its rows, clamped so a class with at
/// least two rows lands on both sides. A single-row class stays in train.
pub fn stratified_split(labels: &[usize], n_classes: usize, test_size: f64, random_state: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(random_state);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == class)
            .map(|(i, _)| i)
            .collect();
        let n = members.len();
        if n == 0 {
            continue;
        }
        members.shuffle(&mut rng);

        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Split { train, test }
}
