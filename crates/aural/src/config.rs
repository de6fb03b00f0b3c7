//! Run configuration.

use std::fmt;

use aural_core::DType;

use crate::error::{Error, Result};

/// Hyperparameters and data locations for one training run.
///
/// Field defaults mirror the training script's argument defaults. `Display`
/// prints the classic banner with one `key : value` line per field, in
/// declaration order.
#[derive(Debug, Clone)]
pub struct Config {
    pub epochs: usize,
    pub batch_size: usize,
    pub lr: f64,
    pub num_train: usize,
    /// Validation subset size; `None` means "everything after the training
    /// slice".
    pub num_val: Option<usize>,
    /// Period of the per-batch training diagnostic; `None` means every 10th.
    pub print_every: Option<usize>,
    pub hidden_size: usize,
    pub features_path: String,
    pub labels_path: String,
    /// Clips are padded or truncated to exactly this many frames.
    pub max_length: usize,
    pub use_gpu: bool,
    /// Collation dtype for feature tensors.
    pub dtype: DType,
    /// Fixed at 2: the classifier is binary.
    pub num_classes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            epochs: 10,
            batch_size: 20,
            lr: 1e-3,
            num_train: 100,
            num_val: None,
            print_every: None,
            hidden_size: 100,
            features_path: "data/features/extracted_features_0.1_0.05.json".to_string(),
            labels_path: "data/features/labels_0.1_0.05.json".to_string(),
            max_length: 300,
            use_gpu: false,
            dtype: DType::F32,
            num_classes: 2,
        }
    }
}

impl Config {
    /// Check every numeric constraint. Called before anything else runs.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(invalid("epochs", "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be positive"));
        }
        if !(self.lr > 0.0) {
            return Err(invalid("lr", "must be positive"));
        }
        if self.hidden_size == 0 {
            return Err(invalid("hidden_size", "must be positive"));
        }
        if self.max_length == 0 {
            return Err(invalid("max_length", "must be positive"));
        }
        if self.print_every == Some(0) {
            return Err(invalid("print_every", "must be positive when set"));
        }
        if self.num_classes < 2 {
            return Err(invalid("num_classes", "need at least two classes"));
        }
        if self.use_gpu {
            return Err(invalid("use_gpu", "this build has no GPU backend"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> Error {
    Error::Config {
        field,
        reason: reason.to_string(),
    }
}

fn opt(v: &Option<usize>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "None".to_string(),
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Config --- ")?;
        writeln!(f, "epochs : {}", self.epochs)?;
        writeln!(f, "batch_size : {}", self.batch_size)?;
        writeln!(f, "lr : {}", self.lr)?;
        writeln!(f, "num_train : {}", self.num_train)?;
        writeln!(f, "num_val : {}", opt(&self.num_val))?;
        writeln!(f, "print_every : {}", opt(&self.print_every))?;
        writeln!(f, "hidden_size : {}", self.hidden_size)?;
        writeln!(f, "features_path : {}", self.features_path)?;
        writeln!(f, "labels_path : {}", self.labels_path)?;
        writeln!(f, "max_length : {}", self.max_length)?;
        writeln!(f, "use_gpu : {}", self.use_gpu)?;
        writeln!(f, "dtype : {}", self.dtype)?;
        writeln!(f, "num_classes : {}", self.num_classes)
    }
}
