// Tensor — n-dimensional array with op recording for autograd.
//
// A tensor is a cheap Arc handle around storage, a layout, and the op
// that produced it. Clones share storage; views share storage with a new
// layout. Arithmetic records ops so that backward() can replay the graph.
//
// Storage sits behind an RwLock so optimizers can write updated parameter
// values in place while module clones of the same parameter observe them.

use std::sync::{Arc, RwLock};

use crate::backend::{Backend, BinaryOp, CmpOp, ReduceOp, UnaryOp};
use crate::op::{Op, TensorId};
use crate::{bail, DType, Error, Layout, Result, Shape, WithDType};

struct TensorInner<B: Backend> {
    id: TensorId,
    storage: Arc<RwLock<B::Storage>>,
    layout: Layout,
    dtype: DType,
    device: B::Device,
    op: Op<B>,
    is_variable: bool,
}

/// An n-dimensional array on backend `B`.
pub struct Tensor<B: Backend> {
    inner: Arc<TensorInner<B>>,
}

impl<B: Backend> Clone for Tensor<B> {
    fn clone(&self) -> Self {
        Tensor {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> std::fmt::Debug for Tensor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor({}, {})", self.shape(), self.dtype())
    }
}

impl<B: Backend> Tensor<B> {
    fn from_storage(
        storage: B::Storage,
        layout: Layout,
        dtype: DType,
        device: B::Device,
        op: Op<B>,
    ) -> Self {
        Tensor {
            inner: Arc::new(TensorInner {
                id: TensorId::new(),
                storage: Arc::new(RwLock::new(storage)),
                layout,
                dtype,
                device,
                op,
                is_variable: false,
            }),
        }
    }

    /// A view over the same storage with a different layout.
    fn view_with_layout(&self, layout: Layout, op: Op<B>) -> Self {
        Tensor {
            inner: Arc::new(TensorInner {
                id: TensorId::new(),
                storage: Arc::clone(&self.inner.storage),
                layout,
                dtype: self.inner.dtype,
                device: self.inner.device.clone(),
                op,
                is_variable: false,
            }),
        }
    }

    // Accessors

    /// Unique graph identity of this tensor.
    pub fn id(&self) -> TensorId {
        self.inner.id
    }

    pub fn shape(&self) -> &Shape {
        self.inner.layout.shape()
    }

    pub fn dims(&self) -> &[usize] {
        self.inner.layout.dims()
    }

    pub fn rank(&self) -> usize {
        self.inner.layout.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.inner.layout.elem_count()
    }

    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    pub fn device(&self) -> &B::Device {
        &self.inner.device
    }

    pub fn layout(&self) -> &Layout {
        &self.inner.layout
    }

    pub fn is_contiguous(&self) -> bool {
        self.inner.layout.is_contiguous()
    }

    /// Whether this tensor is a trainable parameter.
    pub fn is_variable(&self) -> bool {
        self.inner.is_variable
    }

    /// The op that produced this tensor.
    pub fn op(&self) -> &Op<B> {
        &self.inner.op
    }

    fn read_storage(&self) -> Result<std::sync::RwLockReadGuard<'_, B::Storage>> {
        self.inner
            .storage
            .read()
            .map_err(|_| Error::msg("tensor storage lock poisoned"))
    }

    fn write_storage(&self) -> Result<std::sync::RwLockWriteGuard<'_, B::Storage>> {
        self.inner
            .storage
            .write()
            .map_err(|_| Error::msg("tensor storage lock poisoned"))
    }

    // Creation

    pub fn zeros(shape: impl Into<Shape>, dtype: DType, device: &B::Device) -> Result<Self> {
        let shape = shape.into();
        let storage = B::zeros(&shape, dtype, device)?;
        let layout = Layout::contiguous(shape);
        Ok(Self::from_storage(
            storage,
            layout,
            dtype,
            device.clone(),
            Op::None,
        ))
    }

    pub fn ones(shape: impl Into<Shape>, dtype: DType, device: &B::Device) -> Result<Self> {
        let shape = shape.into();
        let storage = B::ones(&shape, dtype, device)?;
        let layout = Layout::contiguous(shape);
        Ok(Self::from_storage(
            storage,
            layout,
            dtype,
            device.clone(),
            Op::None,
        ))
    }

    /// A tensor filled with `value`.
    pub fn full(
        shape: impl Into<Shape>,
        value: f64,
        dtype: DType,
        device: &B::Device,
    ) -> Result<Self> {
        let shape = shape.into();
        let storage = B::full(&shape, value, dtype, device)?;
        let layout = Layout::contiguous(shape);
        Ok(Self::from_storage(
            storage,
            layout,
            dtype,
            device.clone(),
            Op::None,
        ))
    }

    /// Build a tensor from a flat f64 slice, converting to `dtype`.
    pub fn from_f64_slice(
        data: &[f64],
        shape: impl Into<Shape>,
        dtype: DType,
        device: &B::Device,
    ) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.elem_count() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: data.len(),
                shape,
            });
        }
        let storage = B::from_f64_slice(data, dtype, device)?;
        let layout = Layout::contiguous(shape);
        Ok(Self::from_storage(
            storage,
            layout,
            dtype,
            device.clone(),
            Op::None,
        ))
    }

    /// Build a tensor from typed host data; the dtype follows the element type.
    pub fn from_vec<T: WithDType>(
        data: Vec<T>,
        shape: impl Into<Shape>,
        device: &B::Device,
    ) -> Result<Self> {
        let converted: Vec<f64> = data.iter().map(|v| WithDType::to_f64(*v)).collect();
        Self::from_f64_slice(&converted, shape, T::DTYPE, device)
    }

    /// Uniform random values in [0, 1).
    pub fn rand(shape: impl Into<Shape>, dtype: DType, device: &B::Device) -> Result<Self> {
        let shape = shape.into();
        let storage = B::rand_uniform(&shape, dtype, device)?;
        let layout = Layout::contiguous(shape);
        Ok(Self::from_storage(
            storage,
            layout,
            dtype,
            device.clone(),
            Op::None,
        ))
    }

    /// Standard normal random values (mean 0, std 1).
    pub fn randn(shape: impl Into<Shape>, dtype: DType, device: &B::Device) -> Result<Self> {
        let shape = shape.into();
        let storage = B::rand_normal(&shape, dtype, device)?;
        let layout = Layout::contiguous(shape);
        Ok(Self::from_storage(
            storage,
            layout,
            dtype,
            device.clone(),
            Op::None,
        ))
    }

    pub fn zeros_like(other: &Self) -> Result<Self> {
        Self::zeros(other.shape().clone(), other.dtype(), other.device())
    }

    pub fn ones_like(other: &Self) -> Result<Self> {
        Self::ones(other.shape().clone(), other.dtype(), other.device())
    }

    /// Mark this tensor as a trainable parameter.
    ///
    /// Keeps the same id and storage, so gradient lookups and in-place
    /// updates made through the returned handle stay visible to clones.
    pub fn set_variable(self) -> Self {
        Tensor {
            inner: Arc::new(TensorInner {
                id: self.inner.id,
                storage: Arc::clone(&self.inner.storage),
                layout: self.inner.layout.clone(),
                dtype: self.inner.dtype,
                device: self.inner.device.clone(),
                op: self.inner.op.clone(),
                is_variable: true,
            }),
        }
    }

    // In-place parameter update

    /// Overwrite the storage with `new_data`, leaving shape and dtype intact.
    ///
    /// Every tensor sharing this storage (module clones of a parameter)
    /// observes the new values. This is how optimizer steps reach the model.
    pub fn update_data_inplace(&self, new_data: &[f64]) -> Result<()> {
        if new_data.len() != self.elem_count() {
            return Err(Error::ElementCountMismatch {
                shape: self.shape().clone(),
                expected: self.elem_count(),
                got: new_data.len(),
            });
        }
        let storage = B::from_f64_slice(new_data, self.dtype(), self.device())?;
        let mut guard = self.write_storage()?;
        *guard = storage;
        Ok(())
    }

    // Views

    /// Swap two dimensions without copying data.
    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Self> {
        let layout = self.inner.layout.transpose(dim0, dim1)?;
        let op = Op::Transpose {
            input: self.clone(),
            dim0,
            dim1,
        };
        Ok(self.view_with_layout(layout, op))
    }

    /// Transpose a 2-D matrix (shorthand for `transpose(0, 1)`).
    pub fn t(&self) -> Result<Self> {
        if self.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: self.rank(),
            });
        }
        self.transpose(0, 1)
    }

    /// Slice `len` elements along `dim` starting at `start`.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Self> {
        let layout = self.inner.layout.narrow(dim, start, len)?;
        let op = Op::Narrow {
            input: self.clone(),
            dim,
            start,
            len,
        };
        Ok(self.view_with_layout(layout, op))
    }

    /// Reinterpret as `new_shape`; element count must match.
    ///
    /// Non-contiguous tensors are materialized first.
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> Result<Self> {
        let new_shape = new_shape.into();
        if self.elem_count() != new_shape.elem_count() {
            return Err(Error::ReshapeElementMismatch {
                src: self.elem_count(),
                dst: new_shape.elem_count(),
                dst_shape: new_shape,
            });
        }
        let base = if self.is_contiguous() {
            self.clone()
        } else {
            self.contiguous()?
        };
        let src_shape = base.shape().clone();
        let layout = Layout::contiguous(new_shape);
        let op = Op::Reshape {
            input: base.clone(),
            src_shape,
        };
        Ok(base.view_with_layout(layout, op))
    }

    /// Materialize into canonical row-major storage.
    pub fn contiguous(&self) -> Result<Self> {
        if self.is_contiguous() {
            return Ok(self.clone());
        }
        let storage = self.read_storage()?;
        let new_storage = B::to_contiguous(&storage, &self.inner.layout)?;
        drop(storage);
        let layout = Layout::contiguous(self.shape().clone());
        Ok(Self::from_storage(
            new_storage,
            layout,
            self.inner.dtype,
            self.inner.device.clone(),
            Op::Contiguous {
                input: self.clone(),
            },
        ))
    }

    // Binary arithmetic (with trailing-dimension broadcasting)

    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Add)
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Sub)
    }

    pub fn mul(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Mul)
    }

    pub fn div(&self, rhs: &Self) -> Result<Self> {
        self.binary_op(rhs, BinaryOp::Div)
    }

    fn binary_op(&self, rhs: &Self, op: BinaryOp) -> Result<Self> {
        if self.dtype() != rhs.dtype() {
            return Err(Error::DTypeMismatch {
                expected: self.dtype(),
                got: rhs.dtype(),
            });
        }
        let result_shape = Shape::broadcast_shape(self.shape(), rhs.shape())?;
        let lhs_storage = self.read_storage()?;
        let rhs_storage = rhs.read_storage()?;
        let storage = B::binary_op(
            op,
            &lhs_storage,
            &self.inner.layout,
            &rhs_storage,
            &rhs.inner.layout,
        )?;
        drop(lhs_storage);
        drop(rhs_storage);
        let layout = Layout::contiguous(result_shape);
        let result_op = Op::Binary {
            lhs: self.clone(),
            rhs: rhs.clone(),
            op,
        };
        Ok(Self::from_storage(
            storage,
            layout,
            self.inner.dtype,
            self.inner.device.clone(),
            result_op,
        ))
    }

    // Comparisons — produce a U8 mask; never differentiable

    pub fn eq(&self, rhs: &Self) -> Result<Self> {
        self.cmp_op(rhs, CmpOp::Eq)
    }

    pub fn ne(&self, rhs: &Self) -> Result<Self> {
        self.cmp_op(rhs, CmpOp::Ne)
    }

    pub fn gt(&self, rhs: &Self) -> Result<Self> {
        self.cmp_op(rhs, CmpOp::Gt)
    }

    pub fn ge(&self, rhs: &Self) -> Result<Self> {
        self.cmp_op(rhs, CmpOp::Ge)
    }

    pub fn lt(&self, rhs: &Self) -> Result<Self> {
        self.cmp_op(rhs, CmpOp::Lt)
    }

    pub fn le(&self, rhs: &Self) -> Result<Self> {
        self.cmp_op(rhs, CmpOp::Le)
    }

    fn cmp_op(&self, rhs: &Self, op: CmpOp) -> Result<Self> {
        if self.dtype() != rhs.dtype() {
            return Err(Error::DTypeMismatch {
                expected: self.dtype(),
                got: rhs.dtype(),
            });
        }
        let result_shape = Shape::broadcast_shape(self.shape(), rhs.shape())?;
        let lhs_storage = self.read_storage()?;
        let rhs_storage = rhs.read_storage()?;
        let storage = B::cmp_op(
            op,
            &lhs_storage,
            &self.inner.layout,
            &rhs_storage,
            &rhs.inner.layout,
        )?;
        drop(lhs_storage);
        drop(rhs_storage);
        let layout = Layout::contiguous(result_shape);
        Ok(Self::from_storage(
            storage,
            layout,
            DType::U8,
            self.inner.device.clone(),
            Op::None,
        ))
    }

    // Unary arithmetic

    pub fn neg(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Neg)
    }

    pub fn abs(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Abs)
    }

    pub fn exp(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Exp)
    }

    pub fn log(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Log)
    }

    pub fn sqrt(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Sqrt)
    }

    /// Element-wise x².
    pub fn square(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Square)
    }

    /// ReLU: max(0, x).
    pub fn relu(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Relu)
    }

    /// Sigmoid: 1 / (1 + e^(-x)).
    pub fn sigmoid(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Sigmoid)
    }

    pub fn tanh(&self) -> Result<Self> {
        self.unary_op(UnaryOp::Tanh)
    }

    fn unary_op(&self, op: UnaryOp) -> Result<Self> {
        let storage = self.read_storage()?;
        let result = B::unary_op(op, &storage, &self.inner.layout)?;
        drop(storage);
        let layout = Layout::contiguous(self.shape().clone());
        let result_op = Op::Unary {
            input: self.clone(),
            op,
        };
        Ok(Self::from_storage(
            result,
            layout,
            self.inner.dtype,
            self.inner.device.clone(),
            result_op,
        ))
    }

    /// Element-wise `self * mul + add`.
    pub fn affine(&self, mul: f64, add: f64) -> Result<Self> {
        let storage = self.read_storage()?;
        let result = B::affine(&storage, &self.inner.layout, mul, add)?;
        drop(storage);
        let layout = Layout::contiguous(self.shape().clone());
        let op = Op::Affine {
            input: self.clone(),
            mul,
            add,
        };
        Ok(Self::from_storage(
            result,
            layout,
            self.inner.dtype,
            self.inner.device.clone(),
            op,
        ))
    }

    // Reductions

    /// Sum of all elements as a scalar tensor.
    pub fn sum_all(&self) -> Result<Self> {
        self.reduce(ReduceOp::Sum, None, false)
    }

    /// Sum along `dim`.
    pub fn sum(&self, dim: usize, keep_dim: bool) -> Result<Self> {
        self.reduce(ReduceOp::Sum, Some(dim), keep_dim)
    }

    /// Mean of all elements as a scalar tensor.
    pub fn mean_all(&self) -> Result<Self> {
        self.reduce(ReduceOp::Mean, None, false)
    }

    /// Mean along `dim`.
    pub fn mean(&self, dim: usize, keep_dim: bool) -> Result<Self> {
        self.reduce(ReduceOp::Mean, Some(dim), keep_dim)
    }

    /// Maximum along `dim`.
    pub fn max(&self, dim: usize, keep_dim: bool) -> Result<Self> {
        self.reduce(ReduceOp::Max, Some(dim), keep_dim)
    }

    /// Index of the maximum along `dim`, as an i64 tensor.
    ///
    /// When several elements share the maximum, the lowest index wins.
    pub fn argmax(&self, dim: usize) -> Result<Self> {
        self.reduce(ReduceOp::ArgMax, Some(dim), false)
    }

    fn reduce(&self, op: ReduceOp, dim: Option<usize>, keep_dim: bool) -> Result<Self> {
        if let Some(d) = dim {
            if d >= self.rank() {
                return Err(Error::DimOutOfRange {
                    dim: d,
                    rank: self.rank(),
                });
            }
        }
        let storage = self.read_storage()?;
        let result = B::reduce_op(op, &storage, &self.inner.layout, dim)?;
        drop(storage);

        let result_shape = match dim {
            None => Shape::from(()),
            Some(d) => {
                let mut dims = self.dims().to_vec();
                if keep_dim {
                    dims[d] = 1;
                } else {
                    dims.remove(d);
                }
                Shape::new(dims)
            }
        };
        let result_dtype = match op {
            ReduceOp::ArgMax => DType::I64,
            _ => self.inner.dtype,
        };
        let layout = Layout::contiguous(result_shape);
        let result_op = Op::Reduce {
            input: self.clone(),
            op,
            dim,
            keep_dim,
        };
        Ok(Self::from_storage(
            result,
            layout,
            result_dtype,
            self.inner.device.clone(),
            result_op,
        ))
    }

    // Composite operations

    /// Softmax along `dim`: exp(x - max) / sum(exp(x - max)).
    ///
    /// The subtracted maximum is detached, so it acts as a constant shift
    /// in the backward pass.
    pub fn softmax(&self, dim: usize) -> Result<Self> {
        let max_val = self.max(dim, true)?.detach();
        let shifted = self.sub(&max_val)?;
        let exp = shifted.exp()?;
        let denom = exp.sum(dim, true)?;
        exp.div(&denom)
    }

    /// Numerically stable log(softmax(x)) along `dim`.
    pub fn log_softmax(&self, dim: usize) -> Result<Self> {
        let max_val = self.max(dim, true)?.detach();
        let shifted = self.sub(&max_val)?;
        let log_sum_exp = shifted.exp()?.sum(dim, true)?.log()?;
        shifted.sub(&log_sum_exp)
    }

    /// Concatenate tensors along `dim`.
    ///
    /// All inputs must agree on rank, dtype, and every dimension except `dim`.
    pub fn cat(tensors: &[Self], dim: usize) -> Result<Self> {
        let first = match tensors.first() {
            Some(t) => t,
            None => bail!("cat: empty tensor list"),
        };
        if tensors.len() == 1 {
            return Ok(first.clone());
        }
        let rank = first.rank();
        if dim >= rank {
            return Err(Error::DimOutOfRange { dim, rank });
        }
        for (i, t) in tensors.iter().enumerate().skip(1) {
            if t.rank() != rank {
                bail!("cat: input {} has rank {}, expected {}", i, t.rank(), rank);
            }
            if t.dtype() != first.dtype() {
                return Err(Error::DTypeMismatch {
                    expected: first.dtype(),
                    got: t.dtype(),
                });
            }
            for d in 0..rank {
                if d != dim && t.dims()[d] != first.dims()[d] {
                    bail!(
                        "cat: input {} has size {} at dim {}, expected {}",
                        i,
                        t.dims()[d],
                        d,
                        first.dims()[d]
                    );
                }
            }
        }

        let sizes: Vec<usize> = tensors.iter().map(|t| t.dims()[dim]).collect();
        let mut out_dims = first.dims().to_vec();
        out_dims[dim] = sizes.iter().sum();
        let out_shape = Shape::new(out_dims);

        let mut guards = Vec::with_capacity(tensors.len());
        for t in tensors {
            guards.push(t.read_storage()?);
        }
        let pairs: Vec<(&B::Storage, &Layout)> = tensors
            .iter()
            .zip(guards.iter())
            .map(|(t, g)| (&**g, t.layout()))
            .collect();
        let storage = B::cat(&pairs, &out_shape, dim)?;
        drop(pairs);
        drop(guards);

        let layout = Layout::contiguous(out_shape);
        let op = Op::Cat {
            inputs: tensors.to_vec(),
            dim,
            sizes,
        };
        Ok(Self::from_storage(
            storage,
            layout,
            first.dtype(),
            first.device().clone(),
            op,
        ))
    }

    /// Element-wise select: `mask[i] != 0 ? on_true[i] : on_false[i]`.
    ///
    /// The mask (typically a U8 comparison result) receives no gradient.
    pub fn where_cond(mask: &Self, on_true: &Self, on_false: &Self) -> Result<Self> {
        if on_true.shape() != on_false.shape() {
            return Err(Error::ShapeMismatch {
                expected: on_true.shape().clone(),
                got: on_false.shape().clone(),
            });
        }
        if mask.shape() != on_true.shape() {
            return Err(Error::ShapeMismatch {
                expected: on_true.shape().clone(),
                got: mask.shape().clone(),
            });
        }
        if on_true.dtype() != on_false.dtype() {
            return Err(Error::DTypeMismatch {
                expected: on_true.dtype(),
                got: on_false.dtype(),
            });
        }
        let mask_storage = mask.read_storage()?;
        let true_storage = on_true.read_storage()?;
        let false_storage = on_false.read_storage()?;
        let storage = B::where_cond(
            &mask_storage,
            &mask.inner.layout,
            &true_storage,
            &on_true.inner.layout,
            &false_storage,
            &on_false.inner.layout,
        )?;
        drop(mask_storage);
        drop(true_storage);
        drop(false_storage);
        let layout = Layout::contiguous(on_true.shape().clone());
        let op = Op::WhereCond {
            mask: mask.clone(),
            on_true: on_true.clone(),
            on_false: on_false.clone(),
        };
        Ok(Self::from_storage(
            storage,
            layout,
            on_true.inner.dtype,
            on_true.inner.device.clone(),
            op,
        ))
    }

    /// 2-D matrix multiply: [m, k] x [k, n] -> [m, n].
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        if self.dtype() != rhs.dtype() {
            return Err(Error::DTypeMismatch {
                expected: self.dtype(),
                got: rhs.dtype(),
            });
        }
        if self.rank() != 2 || rhs.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: self.rank().min(rhs.rank()),
            });
        }
        let (m, k1) = (self.dims()[0], self.dims()[1]);
        let (k2, n) = (rhs.dims()[0], rhs.dims()[1]);
        if k1 != k2 {
            return Err(Error::MatmulShapeMismatch { m, k1, k2, n });
        }

        let lhs_storage = self.read_storage()?;
        let rhs_storage = rhs.read_storage()?;
        let storage = B::matmul(
            &lhs_storage,
            &self.inner.layout,
            &rhs_storage,
            &rhs.inner.layout,
        )?;
        drop(lhs_storage);
        drop(rhs_storage);
        let layout = Layout::contiguous((m, n));
        let op = Op::Matmul {
            lhs: self.clone(),
            rhs: rhs.clone(),
        };
        Ok(Self::from_storage(
            storage,
            layout,
            self.inner.dtype,
            self.inner.device.clone(),
            op,
        ))
    }

    // Host access

    /// All elements as f64 in logical row-major order.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        let storage = self.read_storage()?;
        B::to_f64_vec(&storage, &self.inner.layout)
    }

    /// The single element of a scalar tensor as f64.
    pub fn to_scalar_f64(&self) -> Result<f64> {
        if self.elem_count() != 1 {
            return Err(Error::NotAScalar {
                shape: self.shape().clone(),
            });
        }
        Ok(self.to_f64_vec()?[0])
    }

    // Autograd

    /// Run reverse-mode differentiation from this scalar tensor.
    pub fn backward(&self) -> Result<crate::backprop::GradStore<B>> {
        crate::backprop::backward(self)
    }

    /// A view of the same data cut loose from the graph.
    ///
    /// The result carries `Op::None` and a fresh id, so gradients do not
    /// flow through it.
    pub fn detach(&self) -> Self {
        self.view_with_layout(self.inner.layout.clone(), Op::None)
    }
}
