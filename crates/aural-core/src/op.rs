// Op — the recorded operation that produced a tensor.
//
// Every tensor carries the op that created it, forming the computation
// graph that backward() walks. Leaf tensors (creation ops, comparisons,
// detached views) carry Op::None and stop the walk.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{Backend, BinaryOp, ReduceOp, UnaryOp};
use crate::tensor::Tensor;
use crate::Shape;

static NEXT_TENSOR_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a tensor node in the computation graph.
///
/// Views keep fresh ids; `set_variable` keeps the id so parameter lookups
/// in a gradient store survive the wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId(u64);

impl TensorId {
    pub(crate) fn new() -> Self {
        TensorId(NEXT_TENSOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The operation that produced a tensor, with handles to its inputs.
#[derive(Clone)]
pub enum Op<B: Backend> {
    /// Leaf: created directly from data, or detached from the graph.
    None,
    Binary {
        lhs: Tensor<B>,
        rhs: Tensor<B>,
        op: BinaryOp,
    },
    Unary {
        input: Tensor<B>,
        op: UnaryOp,
    },
    /// Reduction along `dim`, or over all elements when `dim` is None.
    Reduce {
        input: Tensor<B>,
        op: ReduceOp,
        dim: Option<usize>,
        keep_dim: bool,
    },
    Matmul {
        lhs: Tensor<B>,
        rhs: Tensor<B>,
    },
    Reshape {
        input: Tensor<B>,
        src_shape: Shape,
    },
    Transpose {
        input: Tensor<B>,
        dim0: usize,
        dim1: usize,
    },
    Narrow {
        input: Tensor<B>,
        dim: usize,
        start: usize,
        len: usize,
    },
    /// Element-wise `input * mul + add`.
    Affine {
        input: Tensor<B>,
        mul: f64,
        add: f64,
    },
    Contiguous {
        input: Tensor<B>,
    },
    /// Concatenation; `sizes` records each input's extent along `dim`
    /// so backward can slice the gradient apart again.
    Cat {
        inputs: Vec<Tensor<B>>,
        dim: usize,
        sizes: Vec<usize>,
    },
    /// Element-wise select by mask. The mask is not differentiable.
    WhereCond {
        mask: Tensor<B>,
        on_true: Tensor<B>,
        on_false: Tensor<B>,
    },
}

impl<B: Backend> Op<B> {
    /// The input tensors of this op, for graph traversal.
    pub fn inputs(&self) -> Vec<&Tensor<B>> {
        match self {
            Op::None => vec![],
            Op::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Op::Unary { input, .. } => vec![input],
            Op::Reduce { input, .. } => vec![input],
            Op::Matmul { lhs, rhs } => vec![lhs, rhs],
            Op::Reshape { input, .. } => vec![input],
            Op::Transpose { input, .. } => vec![input],
            Op::Narrow { input, .. } => vec![input],
            Op::Affine { input, .. } => vec![input],
            Op::Contiguous { input } => vec![input],
            Op::Cat { inputs, .. } => inputs.iter().collect(),
            Op::WhereCond {
                mask,
                on_true,
                on_false,
            } => vec![mask, on_true, on_false],
        }
    }
}
