//! Top-level error type for training runs.

use thiserror::Error;

/// Everything that can abort a run.
///
/// Lower layers keep their own error types (`aural_core::Error` for tensor
/// math, `aural_data::DataError` for dataset handling); this enum wraps them
/// so the binary reports a single diagnostic line and exits.
#[derive(Debug, Error)]
pub enum Error {
    /// A config field failed validation.
    #[error("invalid config: {field}: {reason}")]
    Config {
        field: &'static str,
        reason: String,
    },

    /// An evaluation pass produced no samples, so accuracy is undefined.
    #[error("cannot compute accuracy on empty {subset} set")]
    EmptySubset { subset: String },

    #[error(transparent)]
    Compute(#[from] aural_core::Error),

    #[error(transparent)]
    Data(#[from] aural_data::DataError),
}

pub type Result<T> = std::result::Result<T, Error>;
