//! # Aural
//!
//! Training stack for a recurrent audio-clip classifier, built on a small
//! tensor runtime with reverse-mode autodiff.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use aural::prelude::*;
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `aural-core` | Tensor, Shape, DType, Layout, Backend trait, autograd |
//! | `aural-cpu` | CPU backend over plain `Vec`s with rayon matmul |
//! | `aural-nn` | Layers (Linear, RNN, Dropout), init, cross-entropy loss |
//! | `aural-optim` | Optimizer trait + Adam |
//! | `aural-data` | Dataset, samplers, batch loading with worker prefetch |
//!
//! ## Modules
//!
//! - [`config`] — run configuration with validation and the banner printer
//! - [`model`] — the concrete RNN classifier
//! - [`train`] — the epoch loop with injectable step observers
//! - [`eval`] — accuracy measurement over a provider pass

/// Re-export core types.
pub use aural_core::{
    backend::{Backend, BackendDevice, BackendStorage, BinaryOp, CmpOp, ReduceOp, UnaryOp},
    op::{Op, TensorId},
    DType, GradStore, Layout, Shape, Tensor, WithDType,
};

/// Re-export the CPU backend.
pub use aural_cpu::{CpuBackend, CpuDevice, CpuStorage, CpuTensor};

/// Re-export neural network layers and losses.
pub mod nn {
    pub use aural_nn::*;
}

/// Re-export optimizers.
pub mod optim {
    pub use aural_optim::*;
}

/// Re-export datasets, samplers, and batch loading.
pub mod data {
    pub use aural_data::*;
}

/// Run configuration.
pub mod config;

/// Top-level error type.
pub mod error;

/// Accuracy evaluation.
pub mod eval;

/// The concrete recurrent classifier.
pub mod model;

/// The epoch training loop.
pub mod train;

pub use config::Config;
pub use error::{Error, Result};
pub use eval::{evaluate, AccuracyReport};
pub use model::AudioRnnClassifier;
pub use train::{gradient_magnitude, train, GradMagnitudePrinter, StepObserver, TrainReport};

/// Prelude: import this for the most common types.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::data::{
        label_distribution, split_indices, AudioDataset, Batch, BatchLoader, BatchProvider,
        DataError, Dataset, LoaderConfig, Sample, Sampler, SubsetRandomSampler,
        SubsetSequentialSampler, VecDataset,
    };
    pub use crate::error::{Error, Result};
    pub use crate::eval::{evaluate, AccuracyReport};
    pub use crate::model::AudioRnnClassifier;
    pub use crate::nn::{cross_entropy_loss, Dropout, Linear, Module, RNNCell, RNN};
    pub use crate::optim::{Adam, Optimizer};
    pub use crate::train::{
        gradient_magnitude, train, GradMagnitudePrinter, StepObserver, TrainReport,
    };
    pub use crate::{CpuBackend, CpuDevice, CpuTensor, DType, GradStore, Shape, Tensor};
}
