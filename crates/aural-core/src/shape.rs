// Shape — the dimensions of a tensor.
//
// A shape is an ordered list of dimension sizes. The empty shape `[]`
// denotes a scalar (one element, rank 0).

use crate::{Error, Result};

/// The dimensions of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a shape from a list of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions. A scalar has rank 0.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements. A scalar shape holds one element.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product()
    }

    /// The size of dimension `dim`, or an error if out of range.
    pub fn dim(&self, dim: usize) -> Result<usize> {
        self.0.get(dim).copied().ok_or(Error::DimOutOfRange {
            dim,
            rank: self.rank(),
        })
    }

    /// Row-major (C order) strides for a contiguous tensor of this shape.
    ///
    /// The last dimension has stride 1, and each earlier dimension's stride
    /// is the product of all later dimension sizes.
    pub fn stride_contiguous(&self) -> Vec<usize> {
        let mut strides = vec![0usize; self.0.len()];
        let mut acc = 1;
        for (stride, &dim) in strides.iter_mut().zip(self.0.iter()).rev() {
            *stride = acc;
            acc *= dim;
        }
        strides
    }

    /// Compute the shape that results from broadcasting `lhs` with `rhs`.
    ///
    /// Shapes are aligned on their trailing dimensions. At each position the
    /// sizes must be equal, or one of them must be 1 (which stretches to the
    /// other size).
    pub fn broadcast_shape(lhs: &Shape, rhs: &Shape) -> Result<Shape> {
        let lhs_dims = lhs.dims();
        let rhs_dims = rhs.dims();
        let rank = lhs_dims.len().max(rhs_dims.len());
        let mut out = vec![0usize; rank];
        for i in 0..rank {
            // Walk from the trailing dimension; missing dims act as size 1.
            let l = if i < lhs_dims.len() {
                lhs_dims[lhs_dims.len() - 1 - i]
            } else {
                1
            };
            let r = if i < rhs_dims.len() {
                rhs_dims[rhs_dims.len() - 1 - i]
            } else {
                1
            };
            out[rank - 1 - i] = if l == r || r == 1 {
                l
            } else if l == 1 {
                r
            } else {
                return Err(Error::msg(format!(
                    "cannot broadcast {lhs} with {rhs}: sizes {l} and {r} conflict"
                )));
            };
        }
        Ok(Shape(out))
    }

    /// Strides for reading a tensor of this shape as if it had `target` shape.
    ///
    /// Broadcast dimensions (size 1 stretched, or missing leading dims) get
    /// stride 0 so all positions along them read the same element. `strides`
    /// must be the source tensor's real strides.
    pub fn broadcast_strides(&self, strides: &[usize], target: &Shape) -> Result<Vec<usize>> {
        let src_dims = self.dims();
        let dst_dims = target.dims();
        if src_dims.len() > dst_dims.len() {
            return Err(Error::msg(format!(
                "cannot broadcast {self} to lower-rank shape {target}"
            )));
        }
        let offset = dst_dims.len() - src_dims.len();
        let mut out = vec![0usize; dst_dims.len()];
        for (i, &dst) in dst_dims.iter().enumerate() {
            if i < offset {
                continue;
            }
            let src = src_dims[i - offset];
            if src == dst {
                out[i] = strides[i - offset];
            } else if src == 1 {
                out[i] = 0;
            } else {
                return Err(Error::msg(format!(
                    "cannot broadcast {self} to {target}: size {src} vs {dst} at dim {i}"
                )));
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<()> for Shape {
    fn from(_: ()) -> Self {
        Shape(vec![])
    }
}

impl From<usize> for Shape {
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

impl From<(usize,)> for Shape {
    fn from(d: (usize,)) -> Self {
        Shape(vec![d.0])
    }
}

impl From<(usize, usize)> for Shape {
    fn from(d: (usize, usize)) -> Self {
        Shape(vec![d.0, d.1])
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from(d: (usize, usize, usize)) -> Self {
        Shape(vec![d.0, d.1, d.2])
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }
}
