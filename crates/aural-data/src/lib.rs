//! # aural-data
//!
//! Dataset access, index splitting, and batch serving for the audio
//! classifier.
//!
//! This crate provides:
//! - [`Dataset`] trait — unified interface over any sample source
//! - [`AudioDataset`] — JSON feature/label files, padded to fixed length
//! - [`split_indices`] / [`label_distribution`] — positional train/val
//!   splitting and per-class counts
//! - [`Sampler`] implementations — random or sequential subset ordering
//! - [`BatchLoader`] — collation with optional worker prefetch; batches are
//!   handed off in sampler order
//! - [`BatchProvider`] — the trait the training loop and evaluator consume

use thiserror::Error;

pub mod audio;
pub mod dataset;
pub mod loader;
pub mod sampler;
pub mod split;

pub use audio::AudioDataset;
pub use dataset::{Dataset, Sample, VecDataset};
pub use loader::{Batch, BatchLoader, BatchProvider, LoaderConfig, OrderedPrefetch};
pub use sampler::{Sampler, SubsetRandomSampler, SubsetSequentialSampler};
pub use split::{label_distribution, split_indices};

/// Errors from dataset construction and index splitting.
#[derive(Debug, Error)]
pub enum DataError {
    /// A data file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A data file held malformed JSON.
    #[error("invalid {what} JSON: {source}")]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A requested split does not fit in the dataset.
    #[error("requested {requested} examples but the dataset only has {available}")]
    Partition { requested: usize, available: usize },

    /// Feature and label files disagree on the number of clips.
    #[error("feature file has {features} clips but label file has {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    /// A label falls outside the expected class range.
    #[error("label {label} at index {index} is outside 0..{num_classes}")]
    LabelOutOfRange {
        index: usize,
        label: i64,
        num_classes: usize,
    },

    /// Structural problems in the data itself.
    #[error("{0}")]
    Format(String),
}
