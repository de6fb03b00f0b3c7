// Samplers — pluggable per-epoch index ordering for the batch loader
//
// A sampler owns the indices of one subset (train or val) and decides the
// order they are visited in each pass. The random sampler draws a fresh
// permutation per epoch; when seeded, the permutation is a pure function of
// (seed, epoch) so runs are reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};

/// Produces the visiting order over a subset for a given epoch.
pub trait Sampler: Send + Sync {
    /// The index order for this epoch. Always a permutation of the
    /// sampler's subset.
    fn order(&self, epoch: usize) -> Vec<usize>;

    /// Number of indices in the subset.
    fn len(&self) -> usize;

    /// Whether the subset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Visits a fixed subset in a fresh random order each epoch.
pub struct SubsetRandomSampler {
    indices: Vec<usize>,
    seed: Option<u64>,
}

impl SubsetRandomSampler {
    /// Unseeded: every epoch draws from `thread_rng`.
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices,
            seed: None,
        }
    }

    /// Seeded: epoch `e` uses the permutation from `seed + e`, so the
    /// whole run is reproducible while epochs still differ.
    pub fn with_seed(indices: Vec<usize>, seed: u64) -> Self {
        Self {
            indices,
            seed: Some(seed),
        }
    }
}

impl Sampler for SubsetRandomSampler {
    fn order(&self, epoch: usize) -> Vec<usize> {
        let mut order = self.indices.clone();
        match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch as u64));
                order.shuffle(&mut rng);
            }
            None => {
                let mut rng = thread_rng();
                order.shuffle(&mut rng);
            }
        }
        order
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// Visits a fixed subset in its given order every epoch.
pub struct SubsetSequentialSampler {
    indices: Vec<usize>,
}

impl SubsetSequentialSampler {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }
}

impl Sampler for SubsetSequentialSampler {
    fn order(&self, _epoch: usize) -> Vec<usize> {
        self.indices.clone()
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}
