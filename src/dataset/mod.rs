//! Train/test splitting of labeled samples
//!
//! Safe and unsafe samples are shuffled and cut independently, each with a
//! fresh generator seeded from the same value, so the label balance of
//! every split follows the source set and reruns give identical splits.

use crate::models::Label;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Default fraction of each label subset used for training
pub const DEFAULT_TRAIN_SIZE: f64 = 0.5;
/// Default seed for splitting and clustering
pub const DEFAULT_SEED: u64 = 42;

/// The four partitions of a labeled set
#[derive(Debug)]
pub struct DatasetSplit<'a, T> {
    pub train_safe: Vec<&'a T>,
    pub train_unsafe: Vec<&'a T>,
    pub test_safe: Vec<&'a T>,
    pub test_unsafe: Vec<&'a T>,
}

impl<'a, T> DatasetSplit<'a, T> {
    /// Training samples of one label
    pub fn train(&self, label: Label) -> &[&'a T] {
        match label {
            Label::Safe => &self.train_safe,
            Label::Unsafe => &self.train_unsafe,
        }
    }

    /// Held-out samples of both labels, safe first
    pub fn test(&self) -> Vec<&'a T> {
        self.test_safe
            .iter()
            .chain(self.test_unsafe.iter())
            .copied()
            .collect()
    }
}

/// Seeded, label-stratified splitter
#[derive(Debug, Clone, Copy)]
pub struct DatasetSplitter {
    train_size: f64,
    seed: u64,
}

impl Default for DatasetSplitter {
    fn default() -> Self {
        Self {
            train_size: DEFAULT_TRAIN_SIZE,
            seed: DEFAULT_SEED,
        }
    }
}

impl DatasetSplitter {
    pub fn new(train_size: f64, seed: u64) -> Self {
        Self { train_size, seed }
    }

    /// Split `items` by the label `label_of` reports for each one
    pub fn split<'a, T, F>(&self, items: &'a [T], label_of: F) -> DatasetSplit<'a, T>
    where
        F: Fn(&T) -> Label,
    {
        let safe: Vec<&T> = items.iter().filter(|i| label_of(*i).is_safe()).collect();
        let unsafe_: Vec<&T> = items.iter().filter(|i| !label_of(*i).is_safe()).collect();

        let (train_safe, test_safe) = self.cut(safe);
        let (train_unsafe, test_unsafe) = self.cut(unsafe_);

        DatasetSplit {
            train_safe,
            train_unsafe,
            test_safe,
            test_unsafe,
        }
    }

    fn cut<'a, T>(&self, mut subset: Vec<&'a T>) -> (Vec<&'a T>, Vec<&'a T>) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        subset.shuffle(&mut rng);
        let n_train = ((subset.len() as f64) * self.train_size).floor() as usize;
        let test = subset.split_off(n_train.min(subset.len()));
        (subset, test)
    }
}
