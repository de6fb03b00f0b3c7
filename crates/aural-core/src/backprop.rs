// Reverse-mode automatic differentiation.
//
// backward() walks the recorded op graph from a scalar root in reverse
// topological order, accumulating a gradient tensor per node id into a
// GradStore. Leaves (Op::None) stop the walk; trainable parameters are
// leaves whose gradients the optimizer looks up afterwards.

use std::collections::{HashMap, HashSet};

use crate::backend::{Backend, BinaryOp, ReduceOp, UnaryOp};
use crate::op::{Op, TensorId};
use crate::tensor::Tensor;
use crate::{bail, Error, Result, Shape};

/// Gradients keyed by tensor id, as produced by `Tensor::backward()`.
///
/// A fresh store is built per backward pass, so gradients from one batch
/// can never leak into the next.
pub struct GradStore<B: Backend> {
    grads: HashMap<TensorId, Tensor<B>>,
}

impl<B: Backend> Default for GradStore<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> GradStore<B> {
    pub fn new() -> Self {
        GradStore {
            grads: HashMap::new(),
        }
    }

    /// The gradient accumulated for `tensor`, if any.
    pub fn get(&self, tensor: &Tensor<B>) -> Option<&Tensor<B>> {
        self.grads.get(&tensor.id())
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    /// Add `grad` into the slot for `id`, summing with any existing gradient.
    pub fn accumulate(&mut self, id: TensorId, grad: Tensor<B>) -> Result<()> {
        let next = match self.grads.get(&id) {
            Some(existing) => existing.add(&grad)?,
            None => grad,
        };
        self.grads.insert(id, next);
        Ok(())
    }
}

/// Depth-first post-order over the op graph: every tensor appears after
/// all of its inputs.
fn build_topo<B: Backend>(root: &Tensor<B>) -> Vec<Tensor<B>> {
    fn visit<B: Backend>(
        tensor: &Tensor<B>,
        visited: &mut HashSet<TensorId>,
        order: &mut Vec<Tensor<B>>,
    ) {
        if !visited.insert(tensor.id()) {
            return;
        }
        for input in tensor.op().inputs() {
            visit(input, visited, order);
        }
        order.push(tensor.clone());
    }

    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(root, &mut visited, &mut order);
    order
}

/// Reverse-mode differentiation from a scalar root.
pub fn backward<B: Backend>(root: &Tensor<B>) -> Result<GradStore<B>> {
    if root.elem_count() != 1 {
        return Err(Error::msg(
            "backward() requires a scalar tensor; reduce with sum_all() or mean_all() first",
        ));
    }

    let topo = build_topo(root);
    let mut grads = GradStore::new();
    grads.grads.insert(root.id(), Tensor::ones_like(root)?);

    for tensor in topo.iter().rev() {
        let grad_output = match grads.grads.get(&tensor.id()) {
            Some(g) => g.clone(),
            None => continue,
        };

        match tensor.op() {
            Op::None => {}

            Op::Contiguous { input } => {
                grads.accumulate(input.id(), grad_output)?;
            }

            Op::Reshape { input, src_shape } => {
                let grad = grad_output.reshape(src_shape.clone())?;
                grads.accumulate(input.id(), grad)?;
            }

            Op::Transpose { input, dim0, dim1 } => {
                // Transposing back restores the input's orientation.
                let grad = grad_output.transpose(*dim0, *dim1)?;
                grads.accumulate(input.id(), grad)?;
            }

            Op::Narrow {
                input,
                dim,
                start,
                len,
            } => {
                narrow_grad(&grad_output, input, *dim, *start, *len, &mut grads)?;
            }

            Op::Affine { input, mul, .. } => {
                let grad = grad_output.affine(*mul, 0.0)?;
                grads.accumulate(input.id(), grad)?;
            }

            Op::Binary { lhs, rhs, op } => {
                binary_grad(*op, &grad_output, lhs, rhs, &mut grads)?;
            }

            Op::Unary { input, op } => {
                unary_grad(*op, &grad_output, input, &mut grads)?;
            }

            Op::Reduce {
                input, op, dim, ..
            } => {
                reduce_grad(*op, &grad_output, input, *dim, &mut grads)?;
            }

            Op::Matmul { lhs, rhs } => {
                // C = A B  =>  dA = dC B^T,  dB = A^T dC
                let grad_lhs = grad_output.matmul(&rhs.t()?)?;
                grads.accumulate(lhs.id(), grad_lhs)?;
                let grad_rhs = lhs.t()?.matmul(&grad_output)?;
                grads.accumulate(rhs.id(), grad_rhs)?;
            }

            Op::Cat { inputs, dim, sizes } => {
                // Slice the gradient back apart along the cat dimension.
                let mut offset = 0;
                for (input, &size) in inputs.iter().zip(sizes.iter()) {
                    let grad = grad_output.narrow(*dim, offset, size)?;
                    grads.accumulate(input.id(), grad)?;
                    offset += size;
                }
            }

            Op::WhereCond {
                mask,
                on_true,
                on_false,
            } => {
                // Route the gradient by the mask; the mask itself gets none.
                let mask_data = mask.to_f64_vec()?;
                let grad_data = grad_output.to_f64_vec()?;
                let mut true_grad = vec![0.0f64; grad_data.len()];
                let mut false_grad = vec![0.0f64; grad_data.len()];
                for (i, &m) in mask_data.iter().enumerate() {
                    if m != 0.0 {
                        true_grad[i] = grad_data[i];
                    } else {
                        false_grad[i] = grad_data[i];
                    }
                }
                let grad_true = Tensor::<B>::from_f64_slice(
                    &true_grad,
                    on_true.shape().clone(),
                    on_true.dtype(),
                    on_true.device(),
                )?;
                grads.accumulate(on_true.id(), grad_true)?;
                let grad_false = Tensor::<B>::from_f64_slice(
                    &false_grad,
                    on_false.shape().clone(),
                    on_false.dtype(),
                    on_false.device(),
                )?;
                grads.accumulate(on_false.id(), grad_false)?;
            }
        }
    }

    Ok(grads)
}

fn binary_grad<B: Backend>(
    op: BinaryOp,
    grad_output: &Tensor<B>,
    lhs: &Tensor<B>,
    rhs: &Tensor<B>,
    grads: &mut GradStore<B>,
) -> Result<()> {
    match op {
        BinaryOp::Add => {
            grads.accumulate(lhs.id(), sum_to_shape(grad_output, lhs.shape())?)?;
            grads.accumulate(rhs.id(), sum_to_shape(grad_output, rhs.shape())?)?;
        }
        BinaryOp::Sub => {
            grads.accumulate(lhs.id(), sum_to_shape(grad_output, lhs.shape())?)?;
            let neg = grad_output.neg()?;
            grads.accumulate(rhs.id(), sum_to_shape(&neg, rhs.shape())?)?;
        }
        BinaryOp::Mul => {
            let raw_lhs = grad_output.mul(rhs)?;
            grads.accumulate(lhs.id(), sum_to_shape(&raw_lhs, lhs.shape())?)?;
            let raw_rhs = grad_output.mul(lhs)?;
            grads.accumulate(rhs.id(), sum_to_shape(&raw_rhs, rhs.shape())?)?;
        }
        BinaryOp::Div => {
            // d(a/b)/da = 1/b,  d(a/b)/db = -a/b^2
            let raw_lhs = grad_output.div(rhs)?;
            grads.accumulate(lhs.id(), sum_to_shape(&raw_lhs, lhs.shape())?)?;
            let b_squared = rhs.mul(rhs)?;
            let raw_rhs = grad_output.neg()?.mul(lhs)?.div(&b_squared)?;
            grads.accumulate(rhs.id(), sum_to_shape(&raw_rhs, rhs.shape())?)?;
        }
    }
    Ok(())
}

/// Undo broadcasting: sum `grad` down to `target_shape`.
///
/// A [1, 4] operand broadcast against [3, 4] produced a [3, 4] gradient;
/// its own gradient is that summed over dim 0 back to [1, 4].
fn sum_to_shape<B: Backend>(grad: &Tensor<B>, target_shape: &Shape) -> Result<Tensor<B>> {
    let grad_dims = grad.dims();
    let target_dims = target_shape.dims();
    if grad_dims == target_dims {
        return Ok(grad.clone());
    }

    // Align the target on trailing dims, padding with leading 1s.
    let mut padded = vec![1usize; grad_dims.len()];
    let offset = grad_dims.len() - target_dims.len();
    padded[offset..].copy_from_slice(target_dims);

    let mut result = grad.clone();
    for d in (0..grad_dims.len()).rev() {
        if padded[d] == 1 && grad_dims[d] > 1 {
            result = result.sum(d, true)?;
        }
    }
    result.reshape(target_shape.clone())
}

fn unary_grad<B: Backend>(
    op: UnaryOp,
    grad_output: &Tensor<B>,
    input: &Tensor<B>,
    grads: &mut GradStore<B>,
) -> Result<()> {
    let grad = match op {
        UnaryOp::Neg => grad_output.neg()?,

        UnaryOp::Abs => {
            let sign: Vec<f64> = input
                .to_f64_vec()?
                .iter()
                .map(|&v| {
                    if v > 0.0 {
                        1.0
                    } else if v < 0.0 {
                        -1.0
                    } else {
                        0.0
                    }
                })
                .collect();
            let sign = Tensor::<B>::from_f64_slice(
                &sign,
                input.shape().clone(),
                input.dtype(),
                input.device(),
            )?;
            grad_output.mul(&sign)?
        }

        UnaryOp::Exp => grad_output.mul(&input.exp()?)?,

        UnaryOp::Log => grad_output.div(input)?,

        UnaryOp::Sqrt => {
            // d(sqrt x) = 1 / (2 sqrt x)
            let denom = input.sqrt()?.affine(2.0, 0.0)?;
            grad_output.div(&denom)?
        }

        UnaryOp::Square => grad_output.mul(&input.affine(2.0, 0.0)?)?,

        UnaryOp::Relu => {
            let mask: Vec<f64> = input
                .to_f64_vec()?
                .iter()
                .map(|&v| if v > 0.0 { 1.0 } else { 0.0 })
                .collect();
            let mask = Tensor::<B>::from_f64_slice(
                &mask,
                input.shape().clone(),
                input.dtype(),
                input.device(),
            )?;
            grad_output.mul(&mask)?
        }

        UnaryOp::Sigmoid => {
            // d(sigmoid x) = sigmoid(x) (1 - sigmoid(x))
            let sig = input.sigmoid()?;
            let one_minus = sig.affine(-1.0, 1.0)?;
            grad_output.mul(&sig.mul(&one_minus)?)?
        }

        UnaryOp::Tanh => {
            // d(tanh x) = 1 - tanh^2(x)
            let t = input.tanh()?;
            let d = t.mul(&t)?.affine(-1.0, 1.0)?;
            grad_output.mul(&d)?
        }
    };
    grads.accumulate(input.id(), grad)
}

fn reduce_grad<B: Backend>(
    op: ReduceOp,
    grad_output: &Tensor<B>,
    input: &Tensor<B>,
    dim: Option<usize>,
    grads: &mut GradStore<B>,
) -> Result<()> {
    match op {
        ReduceOp::Sum => {
            let grad = match dim {
                None => {
                    // Scalar sum: every element sees the full gradient.
                    let g = grad_output.to_scalar_f64()?;
                    Tensor::<B>::full(input.shape().clone(), g, input.dtype(), input.device())?
                }
                Some(d) => expand_reduce_grad(grad_output, input, d)?,
            };
            grads.accumulate(input.id(), grad)?;
        }

        ReduceOp::Mean => {
            let grad = match dim {
                None => {
                    let n = input.elem_count() as f64;
                    let g = grad_output.to_scalar_f64()? / n;
                    Tensor::<B>::full(input.shape().clone(), g, input.dtype(), input.device())?
                }
                Some(d) => {
                    let n = input.dims()[d] as f64;
                    expand_reduce_grad(grad_output, input, d)?.affine(1.0 / n, 0.0)?
                }
            };
            grads.accumulate(input.id(), grad)?;
        }

        ReduceOp::Max => {
            let Some(d) = dim else {
                bail!("max reduction recorded without a dimension");
            };
            // Gradient flows to the maximal element(s) of each slice;
            // ties split it evenly.
            let data = input.to_f64_vec()?;
            let grad_data = grad_output.to_f64_vec()?;
            let dims = input.dims();
            let n = dims[d];
            let inner: usize = dims[d + 1..].iter().product();
            let outer: usize = dims[..d].iter().product();
            let mut out = vec![0.0f64; data.len()];
            for o in 0..outer {
                for j in 0..inner {
                    let at = |i: usize| (o * n + i) * inner + j;
                    let mut best = f64::NEG_INFINITY;
                    for i in 0..n {
                        if data[at(i)] > best {
                            best = data[at(i)];
                        }
                    }
                    let count = (0..n).filter(|&i| data[at(i)] == best).count() as f64;
                    let g = grad_data[o * inner + j];
                    for i in 0..n {
                        if data[at(i)] == best {
                            out[at(i)] = g / count;
                        }
                    }
                }
            }
            let grad = Tensor::<B>::from_f64_slice(
                &out,
                input.shape().clone(),
                input.dtype(),
                input.device(),
            )?;
            grads.accumulate(input.id(), grad)?;
        }

        // Indices are not differentiable.
        ReduceOp::ArgMax => {}
    }
    Ok(())
}

/// Repeat a reduced gradient back along the reduced dimension.
///
/// Whether the reduction kept the dimension as size 1 or removed it, the
/// gradient holds `outer * inner` elements in the same order.
fn expand_reduce_grad<B: Backend>(
    grad: &Tensor<B>,
    input: &Tensor<B>,
    dim: usize,
) -> Result<Tensor<B>> {
    let grad_data = grad.to_f64_vec()?;
    let dims = input.dims();
    let n = dims[dim];
    let inner: usize = dims[dim + 1..].iter().product();
    let outer: usize = dims[..dim].iter().product();
    let mut out = vec![0.0f64; input.elem_count()];
    for o in 0..outer {
        for i in 0..n {
            for j in 0..inner {
                out[(o * n + i) * inner + j] = grad_data[o * inner + j];
            }
        }
    }
    Tensor::<B>::from_f64_slice(&out, input.shape().clone(), input.dtype(), input.device())
}

/// Scatter a narrowed slice's gradient back into a zero tensor of the
/// input's shape.
fn narrow_grad<B: Backend>(
    grad_output: &Tensor<B>,
    input: &Tensor<B>,
    dim: usize,
    start: usize,
    len: usize,
    grads: &mut GradStore<B>,
) -> Result<()> {
    let grad_data = grad_output.to_f64_vec()?;
    let dims = input.dims();
    let n = dims[dim];
    let inner: usize = dims[dim + 1..].iter().product();
    let outer: usize = dims[..dim].iter().product();
    let mut out = vec![0.0f64; input.elem_count()];
    for o in 0..outer {
        for i in 0..len {
            for j in 0..inner {
                out[(o * n + start + i) * inner + j] = grad_data[(o * len + i) * inner + j];
            }
        }
    }
    let grad =
        Tensor::<B>::from_f64_slice(&out, input.shape().clone(), input.dtype(), input.device())?;
    grads.accumulate(input.id(), grad)
}
