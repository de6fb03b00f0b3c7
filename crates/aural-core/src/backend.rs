// Backend — the execution abstraction.
//
// Tensors are generic over a Backend that supplies storage and kernels.
// The tensor layer owns shapes, layouts, and the autograd graph; a backend
// only reads storage through the layouts it is handed and returns new
// contiguous storage.

use crate::{DType, Layout, Result, Shape};

/// A device a backend can place storage on.
pub trait BackendDevice: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Human-readable device name, e.g. "cpu".
    fn name(&self) -> String;
}

/// Raw element storage owned by a backend.
pub trait BackendStorage: Clone + Send + Sync + 'static {
    fn dtype(&self) -> DType;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element-wise binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Element-wise unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Abs,
    Exp,
    Log,
    Sqrt,
    Square,
    Relu,
    Sigmoid,
    Tanh,
}

/// Reductions along a dimension (or over all elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Mean,
    Max,
    /// Index of the maximum. Ties resolve to the lowest index.
    ArgMax,
}

/// Element-wise comparisons, producing a u8 mask of 0s and 1s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A compute backend: storage plus the kernels the tensor layer dispatches to.
///
/// Binary and comparison kernels receive the operands' real layouts and must
/// broadcast them to their common shape themselves. All kernels return
/// contiguous storage in logical row-major order.
pub trait Backend: Clone + std::fmt::Debug + Send + Sync + 'static {
    type Device: BackendDevice;
    type Storage: BackendStorage;

    // Storage creation

    fn zeros(shape: &Shape, dtype: DType, device: &Self::Device) -> Result<Self::Storage>;

    fn ones(shape: &Shape, dtype: DType, device: &Self::Device) -> Result<Self::Storage>;

    fn full(shape: &Shape, value: f64, dtype: DType, device: &Self::Device)
        -> Result<Self::Storage>;

    fn from_f64_slice(data: &[f64], dtype: DType, device: &Self::Device) -> Result<Self::Storage>;

    /// Uniform samples in [0, 1).
    fn rand_uniform(shape: &Shape, dtype: DType, device: &Self::Device) -> Result<Self::Storage>;

    /// Standard normal samples (mean 0, std 1).
    fn rand_normal(shape: &Shape, dtype: DType, device: &Self::Device) -> Result<Self::Storage>;

    // Kernels

    fn binary_op(
        op: BinaryOp,
        lhs: &Self::Storage,
        lhs_layout: &Layout,
        rhs: &Self::Storage,
        rhs_layout: &Layout,
    ) -> Result<Self::Storage>;

    fn cmp_op(
        op: CmpOp,
        lhs: &Self::Storage,
        lhs_layout: &Layout,
        rhs: &Self::Storage,
        rhs_layout: &Layout,
    ) -> Result<Self::Storage>;

    fn unary_op(op: UnaryOp, input: &Self::Storage, layout: &Layout) -> Result<Self::Storage>;

    /// Element-wise `input * mul + add`.
    fn affine(input: &Self::Storage, layout: &Layout, mul: f64, add: f64)
        -> Result<Self::Storage>;

    /// Reduce along `dim`, or over all elements when `dim` is None.
    fn reduce_op(
        op: ReduceOp,
        input: &Self::Storage,
        layout: &Layout,
        dim: Option<usize>,
    ) -> Result<Self::Storage>;

    /// 2-D matrix multiply: [m, k] x [k, n] -> [m, n].
    fn matmul(
        lhs: &Self::Storage,
        lhs_layout: &Layout,
        rhs: &Self::Storage,
        rhs_layout: &Layout,
    ) -> Result<Self::Storage>;

    /// `out[i] = if mask[i] != 0 { on_true[i] } else { on_false[i] }`.
    fn where_cond(
        mask: &Self::Storage,
        mask_layout: &Layout,
        on_true: &Self::Storage,
        on_true_layout: &Layout,
        on_false: &Self::Storage,
        on_false_layout: &Layout,
    ) -> Result<Self::Storage>;

    /// Concatenate along `dim` into `out_shape`.
    fn cat(
        inputs: &[(&Self::Storage, &Layout)],
        out_shape: &Shape,
        dim: usize,
    ) -> Result<Self::Storage>;

    /// Copy into canonical row-major order.
    fn to_contiguous(input: &Self::Storage, layout: &Layout) -> Result<Self::Storage>;

    /// Read all elements as f64 in logical row-major order.
    fn to_f64_vec(input: &Self::Storage, layout: &Layout) -> Result<Vec<f64>>;
}
