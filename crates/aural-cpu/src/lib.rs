//! # aural-cpu
//!
//! Host CPU implementation of the [`Backend`] trait from `aural-core`.
//!
//! Storage is a plain `Vec` per dtype. Kernels resolve strides and
//! offsets through [`Layout`], so views (transpose, narrow) and
//! broadcast operands read in place without an intermediate copy; every
//! kernel writes a fresh contiguous row-major buffer. Float math runs
//! generically over `f32`/`f64` via `num_traits::Float`; integer
//! storages support comparisons, selection, concatenation, and copies,
//! but not arithmetic. Matrix multiplication parallelizes over output
//! rows with rayon.

use std::borrow::Cow;
use std::fmt;

use num_traits::Float;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

use aural_core::backend::{
    Backend, BackendDevice, BackendStorage, BinaryOp, CmpOp, ReduceOp, UnaryOp,
};
use aural_core::dtype::{DType, WithDType};
use aural_core::error::{Error, Result};
use aural_core::layout::Layout;
use aural_core::shape::Shape;
use aural_core::tensor::Tensor;

/// A tensor living on the CPU backend.
pub type CpuTensor = Tensor<CpuBackend>;

/// The host CPU device. Stateless; it exists so tensors can name where
/// their storage lives.
#[derive(Clone, Debug, Default)]
pub struct CpuDevice;

impl CpuDevice {
    pub fn new() -> Self {
        CpuDevice
    }
}

impl BackendDevice for CpuDevice {
    fn name(&self) -> String {
        "cpu".to_string()
    }
}

/// Host memory, one variant per supported dtype.
#[derive(Clone)]
pub enum CpuStorage {
    F32(Vec<f32>),
    F64(Vec<f64>),
    U8(Vec<u8>),
    I64(Vec<i64>),
}

impl fmt::Debug for CpuStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuStorage::F32(v) => write!(f, "CpuStorage::F32(len={})", v.len()),
            CpuStorage::F64(v) => write!(f, "CpuStorage::F64(len={})", v.len()),
            CpuStorage::U8(v) => write!(f, "CpuStorage::U8(len={})", v.len()),
            CpuStorage::I64(v) => write!(f, "CpuStorage::I64(len={})", v.len()),
        }
    }
}

impl BackendStorage for CpuStorage {
    fn dtype(&self) -> DType {
        match self {
            CpuStorage::F32(_) => DType::F32,
            CpuStorage::F64(_) => DType::F64,
            CpuStorage::U8(_) => DType::U8,
            CpuStorage::I64(_) => DType::I64,
        }
    }

    fn len(&self) -> usize {
        match self {
            CpuStorage::F32(v) => v.len(),
            CpuStorage::F64(v) => v.len(),
            CpuStorage::U8(v) => v.len(),
            CpuStorage::I64(v) => v.len(),
        }
    }
}

/// Ties an element type to its `CpuStorage` variant so generic kernels
/// can build their result storage.
trait CpuElement: WithDType + Default {
    fn wrap(data: Vec<Self>) -> CpuStorage;
}

impl CpuElement for f32 {
    fn wrap(data: Vec<f32>) -> CpuStorage {
        CpuStorage::F32(data)
    }
}

impl CpuElement for f64 {
    fn wrap(data: Vec<f64>) -> CpuStorage {
        CpuStorage::F64(data)
    }
}

impl CpuElement for u8 {
    fn wrap(data: Vec<u8>) -> CpuStorage {
        CpuStorage::U8(data)
    }
}

impl CpuElement for i64 {
    fn wrap(data: Vec<i64>) -> CpuStorage {
        CpuStorage::I64(data)
    }
}

/// Read a storage in logical row-major order. Contiguous sources
/// borrow; strided or offset sources copy through the layout.
fn gather<'a, T: Copy>(data: &'a [T], layout: &Layout) -> Cow<'a, [T]> {
    if layout.is_contiguous() {
        Cow::Borrowed(&data[..layout.elem_count()])
    } else {
        Cow::Owned(layout.strided_indices().map(|i| data[i]).collect())
    }
}

fn binary_float<T: Float + CpuElement>(
    op: BinaryOp,
    lhs: &[T],
    lhs_layout: &Layout,
    rhs: &[T],
    rhs_layout: &Layout,
) -> Result<CpuStorage> {
    let out_shape = Shape::broadcast_shape(lhs_layout.shape(), rhs_layout.shape())?;
    let lhs_b = lhs_layout.broadcast_as(&out_shape)?;
    let rhs_b = rhs_layout.broadcast_as(&out_shape)?;
    let out: Vec<T> = lhs_b
        .strided_indices()
        .zip(rhs_b.strided_indices())
        .map(|(i, j)| {
            let (x, y) = (lhs[i], rhs[j]);
            match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
            }
        })
        .collect();
    Ok(T::wrap(out))
}

fn cmp_kernel<T: Copy + PartialOrd>(
    op: CmpOp,
    lhs: &[T],
    lhs_layout: &Layout,
    rhs: &[T],
    rhs_layout: &Layout,
) -> Result<CpuStorage> {
    let out_shape = Shape::broadcast_shape(lhs_layout.shape(), rhs_layout.shape())?;
    let lhs_b = lhs_layout.broadcast_as(&out_shape)?;
    let rhs_b = rhs_layout.broadcast_as(&out_shape)?;
    let out: Vec<u8> = lhs_b
        .strided_indices()
        .zip(rhs_b.strided_indices())
        .map(|(i, j)| {
            let (x, y) = (lhs[i], rhs[j]);
            let hit = match op {
                CmpOp::Eq => x == y,
                CmpOp::Ne => x != y,
                CmpOp::Lt => x < y,
                CmpOp::Le => x <= y,
                CmpOp::Gt => x > y,
                CmpOp::Ge => x >= y,
            };
            hit as u8
        })
        .collect();
    Ok(CpuStorage::U8(out))
}

fn unary_float<T: Float + CpuElement>(
    op: UnaryOp,
    input: &[T],
    layout: &Layout,
) -> Result<CpuStorage> {
    let out: Vec<T> = layout
        .strided_indices()
        .map(|i| {
            let x = input[i];
            match op {
                UnaryOp::Neg => -x,
                UnaryOp::Abs => x.abs(),
                UnaryOp::Exp => x.exp(),
                UnaryOp::Log => x.ln(),
                UnaryOp::Sqrt => x.sqrt(),
                UnaryOp::Square => x * x,
                UnaryOp::Relu => {
                    if x > T::zero() {
                        x
                    } else {
                        T::zero()
                    }
                }
                UnaryOp::Sigmoid => T::one() / (T::one() + (-x).exp()),
                UnaryOp::Tanh => x.tanh(),
            }
        })
        .collect();
    Ok(T::wrap(out))
}

fn affine_float<T: Float + CpuElement>(
    input: &[T],
    layout: &Layout,
    mul: f64,
    add: f64,
) -> Result<CpuStorage> {
    let mul = T::from(mul).ok_or_else(|| Error::msg("affine scale out of range for dtype"))?;
    let add = T::from(add).ok_or_else(|| Error::msg("affine shift out of range for dtype"))?;
    let out: Vec<T> = layout
        .strided_indices()
        .map(|i| input[i] * mul + add)
        .collect();
    Ok(T::wrap(out))
}

/// Reductions decompose the shape as outer x reduce x inner around the
/// reduced dimension, so one pass covers any rank.
fn reduce_float<T: Float + CpuElement>(
    op: ReduceOp,
    data: &[T],
    dims: &[usize],
    dim: Option<usize>,
) -> Result<CpuStorage> {
    let (outer, n, inner) = match dim {
        Some(d) => {
            if d >= dims.len() {
                return Err(Error::msg(format!(
                    "reduce dim {d} out of range for rank {}",
                    dims.len()
                )));
            }
            let outer: usize = dims[..d].iter().product();
            let inner: usize = dims[d + 1..].iter().product();
            (outer, dims[d], inner)
        }
        None => (1usize, data.len(), 1usize),
    };

    if matches!(op, ReduceOp::ArgMax) {
        if dim.is_none() {
            return Err(Error::msg("argmax requires a dimension"));
        }
        let mut out = vec![0i64; outer * inner];
        for o in 0..outer {
            for j in 0..inner {
                let mut best_idx = 0usize;
                let mut best = data[o * n * inner + j];
                for i in 1..n {
                    let v = data[(o * n + i) * inner + j];
                    // Strictly greater, so the lowest index wins ties.
                    if v > best {
                        best = v;
                        best_idx = i;
                    }
                }
                out[o * inner + j] = best_idx as i64;
            }
        }
        return Ok(CpuStorage::I64(out));
    }

    let mut out = vec![T::zero(); outer * inner];
    for o in 0..outer {
        for j in 0..inner {
            let mut acc = match op {
                ReduceOp::Max => T::neg_infinity(),
                _ => T::zero(),
            };
            for i in 0..n {
                let v = data[(o * n + i) * inner + j];
                acc = match op {
                    ReduceOp::Sum | ReduceOp::Mean => acc + v,
                    ReduceOp::Max => {
                        if v > acc {
                            v
                        } else {
                            acc
                        }
                    }
                    ReduceOp::ArgMax => unreachable!(),
                };
            }
            if matches!(op, ReduceOp::Mean) {
                acc = acc / T::from(n).ok_or_else(|| Error::msg("mean divisor out of range"))?;
            }
            out[o * inner + j] = acc;
        }
    }
    Ok(T::wrap(out))
}

fn matmul_float<T: Float + CpuElement + Send + Sync>(
    lhs: &[T],
    rhs: &[T],
    m: usize,
    k: usize,
    n: usize,
) -> CpuStorage {
    let mut out = vec![T::zero(); m * n];
    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for (kk, &a_ik) in lhs[i * k..(i + 1) * k].iter().enumerate() {
            let b_row = &rhs[kk * n..(kk + 1) * n];
            for (r, &b_kj) in row.iter_mut().zip(b_row.iter()) {
                *r = *r + a_ik * b_kj;
            }
        }
    });
    T::wrap(out)
}

fn select_kernel<T: Copy + CpuElement>(
    mask: &[u8],
    mask_layout: &Layout,
    on_true: &[T],
    on_true_layout: &Layout,
    on_false: &[T],
    on_false_layout: &Layout,
) -> CpuStorage {
    let out: Vec<T> = mask_layout
        .strided_indices()
        .zip(on_true_layout.strided_indices())
        .zip(on_false_layout.strided_indices())
        .map(|((mi, ti), fi)| {
            if mask[mi] != 0 {
                on_true[ti]
            } else {
                on_false[fi]
            }
        })
        .collect();
    T::wrap(out)
}

fn cat_kernel<T: Copy + CpuElement>(
    parts: &[(Cow<'_, [T]>, &Layout)],
    out_shape: &Shape,
    dim: usize,
) -> CpuStorage {
    let out_dims = out_shape.dims();
    let outer: usize = out_dims[..dim].iter().product();
    let inner: usize = out_dims[dim + 1..].iter().product();
    let cat_total = out_dims[dim];

    let mut out = vec![T::default(); out_shape.elem_count()];
    let mut offset = 0;
    for (data, layout) in parts {
        let part_n = layout.dims()[dim];
        let block = part_n * inner;
        for o in 0..outer {
            let src = &data[o * block..(o + 1) * block];
            let dst_start = (o * cat_total + offset) * inner;
            out[dst_start..dst_start + block].copy_from_slice(src);
        }
        offset += part_n;
    }
    T::wrap(out)
}

/// The host CPU backend. A zero-sized marker type.
#[derive(Clone, Debug)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    type Device = CpuDevice;
    type Storage = CpuStorage;

    fn zeros(shape: &Shape, dtype: DType, device: &CpuDevice) -> Result<CpuStorage> {
        Self::full(shape, 0.0, dtype, device)
    }

    fn ones(shape: &Shape, dtype: DType, device: &CpuDevice) -> Result<CpuStorage> {
        Self::full(shape, 1.0, dtype, device)
    }

    fn full(shape: &Shape, value: f64, dtype: DType, _device: &CpuDevice) -> Result<CpuStorage> {
        let n = shape.elem_count();
        Ok(match dtype {
            DType::F32 => CpuStorage::F32(vec![f32::from_f64(value); n]),
            DType::F64 => CpuStorage::F64(vec![value; n]),
            DType::U8 => CpuStorage::U8(vec![u8::from_f64(value); n]),
            DType::I64 => CpuStorage::I64(vec![i64::from_f64(value); n]),
        })
    }

    fn from_f64_slice(data: &[f64], dtype: DType, _device: &CpuDevice) -> Result<CpuStorage> {
        Ok(match dtype {
            DType::F32 => CpuStorage::F32(data.iter().map(|&v| f32::from_f64(v)).collect()),
            DType::F64 => CpuStorage::F64(data.to_vec()),
            DType::U8 => CpuStorage::U8(data.iter().map(|&v| u8::from_f64(v)).collect()),
            DType::I64 => CpuStorage::I64(data.iter().map(|&v| i64::from_f64(v)).collect()),
        })
    }

    fn rand_uniform(shape: &Shape, dtype: DType, _device: &CpuDevice) -> Result<CpuStorage> {
        let n = shape.elem_count();
        let mut rng = rand::thread_rng();
        match dtype {
            DType::F32 => Ok(CpuStorage::F32((0..n).map(|_| rng.gen::<f32>()).collect())),
            DType::F64 => Ok(CpuStorage::F64((0..n).map(|_| rng.gen::<f64>()).collect())),
            _ => Err(Error::msg(format!("rand_uniform not supported for {dtype}"))),
        }
    }

    fn rand_normal(shape: &Shape, dtype: DType, _device: &CpuDevice) -> Result<CpuStorage> {
        let n = shape.elem_count();
        let mut rng = rand::thread_rng();
        match dtype {
            DType::F32 => Ok(CpuStorage::F32(
                (0..n).map(|_| rng.sample::<f32, _>(StandardNormal)).collect(),
            )),
            DType::F64 => Ok(CpuStorage::F64(
                (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect(),
            )),
            _ => Err(Error::msg(format!("rand_normal not supported for {dtype}"))),
        }
    }

    fn binary_op(
        op: BinaryOp,
        lhs: &CpuStorage,
        lhs_layout: &Layout,
        rhs: &CpuStorage,
        rhs_layout: &Layout,
    ) -> Result<CpuStorage> {
        match (lhs, rhs) {
            (CpuStorage::F32(a), CpuStorage::F32(b)) => {
                binary_float(op, a, lhs_layout, b, rhs_layout)
            }
            (CpuStorage::F64(a), CpuStorage::F64(b)) => {
                binary_float(op, a, lhs_layout, b, rhs_layout)
            }
            _ => Err(Error::msg(format!(
                "binary {op:?} expects matching float operands, got {} and {}",
                lhs.dtype(),
                rhs.dtype()
            ))),
        }
    }

    fn cmp_op(
        op: CmpOp,
        lhs: &CpuStorage,
        lhs_layout: &Layout,
        rhs: &CpuStorage,
        rhs_layout: &Layout,
    ) -> Result<CpuStorage> {
        match (lhs, rhs) {
            (CpuStorage::F32(a), CpuStorage::F32(b)) => cmp_kernel(op, a, lhs_layout, b, rhs_layout),
            (CpuStorage::F64(a), CpuStorage::F64(b)) => cmp_kernel(op, a, lhs_layout, b, rhs_layout),
            (CpuStorage::U8(a), CpuStorage::U8(b)) => cmp_kernel(op, a, lhs_layout, b, rhs_layout),
            (CpuStorage::I64(a), CpuStorage::I64(b)) => cmp_kernel(op, a, lhs_layout, b, rhs_layout),
            _ => Err(Error::msg(format!(
                "cmp {op:?} expects matching dtypes, got {} and {}",
                lhs.dtype(),
                rhs.dtype()
            ))),
        }
    }

    fn unary_op(op: UnaryOp, input: &CpuStorage, layout: &Layout) -> Result<CpuStorage> {
        match input {
            CpuStorage::F32(v) => unary_float(op, v, layout),
            CpuStorage::F64(v) => unary_float(op, v, layout),
            _ => Err(Error::msg(format!(
                "unary {op:?} supports float dtypes only, got {}",
                input.dtype()
            ))),
        }
    }

    fn affine(input: &CpuStorage, layout: &Layout, mul: f64, add: f64) -> Result<CpuStorage> {
        match input {
            CpuStorage::F32(v) => affine_float(v, layout, mul, add),
            CpuStorage::F64(v) => affine_float(v, layout, mul, add),
            _ => Err(Error::msg(format!(
                "affine supports float dtypes only, got {}",
                input.dtype()
            ))),
        }
    }

    fn reduce_op(
        op: ReduceOp,
        input: &CpuStorage,
        layout: &Layout,
        dim: Option<usize>,
    ) -> Result<CpuStorage> {
        match input {
            CpuStorage::F32(v) => reduce_float(op, &gather(v, layout), layout.dims(), dim),
            CpuStorage::F64(v) => reduce_float(op, &gather(v, layout), layout.dims(), dim),
            _ => Err(Error::msg(format!(
                "reduce {op:?} supports float dtypes only, got {}",
                input.dtype()
            ))),
        }
    }

    fn matmul(
        lhs: &CpuStorage,
        lhs_layout: &Layout,
        rhs: &CpuStorage,
        rhs_layout: &Layout,
    ) -> Result<CpuStorage> {
        let (&[m, k], &[k2, n]) = (lhs_layout.dims(), rhs_layout.dims()) else {
            return Err(Error::msg(format!(
                "matmul expects 2-D operands, got {} and {}",
                lhs_layout.shape(),
                rhs_layout.shape()
            )));
        };
        if k != k2 {
            return Err(Error::msg(format!(
                "matmul inner dimensions differ: {} vs {}",
                lhs_layout.shape(),
                rhs_layout.shape()
            )));
        }
        match (lhs, rhs) {
            (CpuStorage::F32(a), CpuStorage::F32(b)) => {
                let a = gather(a, lhs_layout);
                let b = gather(b, rhs_layout);
                Ok(matmul_float(&a, &b, m, k, n))
            }
            (CpuStorage::F64(a), CpuStorage::F64(b)) => {
                let a = gather(a, lhs_layout);
                let b = gather(b, rhs_layout);
                Ok(matmul_float(&a, &b, m, k, n))
            }
            _ => Err(Error::msg(format!(
                "matmul expects matching float operands, got {} and {}",
                lhs.dtype(),
                rhs.dtype()
            ))),
        }
    }

    fn where_cond(
        mask: &CpuStorage,
        mask_layout: &Layout,
        on_true: &CpuStorage,
        on_true_layout: &Layout,
        on_false: &CpuStorage,
        on_false_layout: &Layout,
    ) -> Result<CpuStorage> {
        let CpuStorage::U8(mask_data) = mask else {
            return Err(Error::msg(format!(
                "where_cond mask must be u8, got {}",
                mask.dtype()
            )));
        };
        match (on_true, on_false) {
            (CpuStorage::F32(t), CpuStorage::F32(f)) => Ok(select_kernel(
                mask_data,
                mask_layout,
                t,
                on_true_layout,
                f,
                on_false_layout,
            )),
            (CpuStorage::F64(t), CpuStorage::F64(f)) => Ok(select_kernel(
                mask_data,
                mask_layout,
                t,
                on_true_layout,
                f,
                on_false_layout,
            )),
            (CpuStorage::I64(t), CpuStorage::I64(f)) => Ok(select_kernel(
                mask_data,
                mask_layout,
                t,
                on_true_layout,
                f,
                on_false_layout,
            )),
            _ => Err(Error::msg(format!(
                "where_cond branches must share a dtype, got {} and {}",
                on_true.dtype(),
                on_false.dtype()
            ))),
        }
    }

    fn cat(inputs: &[(&CpuStorage, &Layout)], out_shape: &Shape, dim: usize) -> Result<CpuStorage> {
        let Some(&(first, _)) = inputs.first() else {
            return Err(Error::msg("cat needs at least one input"));
        };
        match first {
            CpuStorage::F32(_) => {
                let parts = collect_parts(inputs, |s| match s {
                    CpuStorage::F32(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                Ok(cat_kernel(&parts, out_shape, dim))
            }
            CpuStorage::F64(_) => {
                let parts = collect_parts(inputs, |s| match s {
                    CpuStorage::F64(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                Ok(cat_kernel(&parts, out_shape, dim))
            }
            CpuStorage::U8(_) => {
                let parts = collect_parts(inputs, |s| match s {
                    CpuStorage::U8(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                Ok(cat_kernel(&parts, out_shape, dim))
            }
            CpuStorage::I64(_) => {
                let parts = collect_parts(inputs, |s| match s {
                    CpuStorage::I64(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                Ok(cat_kernel(&parts, out_shape, dim))
            }
        }
    }

    fn to_contiguous(input: &CpuStorage, layout: &Layout) -> Result<CpuStorage> {
        Ok(match input {
            CpuStorage::F32(v) => CpuStorage::F32(gather(v, layout).into_owned()),
            CpuStorage::F64(v) => CpuStorage::F64(gather(v, layout).into_owned()),
            CpuStorage::U8(v) => CpuStorage::U8(gather(v, layout).into_owned()),
            CpuStorage::I64(v) => CpuStorage::I64(gather(v, layout).into_owned()),
        })
    }

    fn to_f64_vec(input: &CpuStorage, layout: &Layout) -> Result<Vec<f64>> {
        Ok(match input {
            CpuStorage::F32(v) => layout
                .strided_indices()
                .map(|i| f64::from(v[i]))
                .collect(),
            CpuStorage::F64(v) => layout.strided_indices().map(|i| v[i]).collect(),
            CpuStorage::U8(v) => layout
                .strided_indices()
                .map(|i| f64::from(v[i]))
                .collect(),
            CpuStorage::I64(v) => layout.strided_indices().map(|i| v[i] as f64).collect(),
        })
    }
}

/// Gathers every cat input to a contiguous slice of one element type,
/// erroring if an input's dtype disagrees with the first.
fn collect_parts<'a, T: Copy>(
    inputs: &'a [(&'a CpuStorage, &'a Layout)],
    as_slice: impl Fn(&'a CpuStorage) -> Option<&'a [T]>,
) -> Result<Vec<(Cow<'a, [T]>, &'a Layout)>> {
    inputs
        .iter()
        .map(|&(storage, layout)| {
            let data = as_slice(storage).ok_or_else(|| {
                Error::msg(format!("cat inputs must share a dtype, got {}", storage.dtype()))
            })?;
            Ok((gather(data, layout), layout))
        })
        .collect()
}
