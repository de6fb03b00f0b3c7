use crate::{DType, Shape};

/// Errors produced by tensor construction, shape manipulation, and arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("dimension {dim} is out of range for rank {rank}")]
    DimOutOfRange { dim: usize, rank: usize },

    #[error("narrow out of bounds: start {start} + len {len} > size {dim_size} at dim {dim}")]
    NarrowOutOfBounds {
        dim: usize,
        start: usize,
        len: usize,
        dim_size: usize,
    },

    #[error("expected a scalar tensor, got shape {shape}")]
    NotAScalar { shape: Shape },

    #[error("element count mismatch for shape {shape}: expected {expected}, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    #[error("matmul shape mismatch: [{m}, {k1}] x [{k2}, {n}]")]
    MatmulShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    #[error("cannot reshape {src} elements into {dst} elements (target shape {dst_shape})")]
    ReshapeElementMismatch {
        src: usize,
        dst: usize,
        dst_shape: Shape,
    },

    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Build an ad-hoc error from anything string-like.
    pub fn msg(msg: impl Into<String>) -> Self {
        Error::Msg(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Return early with an ad-hoc [`Error::Msg`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
