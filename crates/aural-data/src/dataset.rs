// Dataset trait — unified interface over any sample source

/// A single sample: a pair of (input features, label/target).
///
/// Both are stored as `Vec<f64>` with their associated shapes so they can be
/// batched into tensors later.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Input feature vector (flattened).
    pub features: Vec<f64>,
    /// Shape of the feature tensor (e.g. `[max_length, feature_dim]` for a
    /// padded audio clip).
    pub feature_shape: Vec<usize>,
    /// Target value(s) (flattened). For classification this is a
    /// single-element vec holding the class index as `f64`.
    pub target: Vec<f64>,
    /// Shape of the target tensor (`[1]` for a class index).
    pub target_shape: Vec<usize>,
}

/// A dataset is an indexed collection of samples.
///
/// Implementations must be `Send + Sync` so the batch loader can read from
/// worker threads.
pub trait Dataset: Send + Sync {
    /// Total number of samples in the dataset.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the sample at position `index`.
    ///
    /// # Panics
    /// May panic if `index >= self.len()`.
    fn get(&self, index: usize) -> Sample;

    /// The shape of a single feature sample (without batch dim).
    fn feature_shape(&self) -> &[usize];

    /// The shape of a single target sample (without batch dim).
    fn target_shape(&self) -> &[usize];

    /// Optional human-readable name.
    fn name(&self) -> &str {
        "dataset"
    }
}

/// A simple in-memory dataset backed by a `Vec<Sample>`.
///
/// Useful for building datasets programmatically and in tests.
pub struct VecDataset {
    samples: Vec<Sample>,
    feature_shape: Vec<usize>,
    target_shape: Vec<usize>,
    dataset_name: String,
}

impl VecDataset {
    /// Create a VecDataset from a vector of samples.
    ///
    /// # Panics
    /// Panics if `samples` is empty.
    pub fn new(samples: Vec<Sample>, name: &str) -> Self {
        assert!(!samples.is_empty(), "VecDataset: need at least one sample");
        let feature_shape = samples[0].feature_shape.clone();
        let target_shape = samples[0].target_shape.clone();
        Self {
            samples,
            feature_shape,
            target_shape,
            dataset_name: name.to_string(),
        }
    }
}

impl Dataset for VecDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Sample {
        self.samples[index].clone()
    }

    fn feature_shape(&self) -> &[usize] {
        &self.feature_shape
    }

    fn target_shape(&self) -> &[usize] {
        &self.target_shape
    }

    fn name(&self) -> &str {
        &self.dataset_name
    }
}
