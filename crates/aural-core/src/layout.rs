// Layout — how a tensor's logical shape maps onto flat storage.
//
// A layout is a shape plus per-dimension strides and a start offset.
// Views (transpose, narrow, broadcast) are just layout changes over the
// same storage; no data moves until `contiguous()` materializes a copy.

use crate::{Error, Result, Shape};

/// Shape, strides, and start offset of a tensor over its storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Shape,
    strides: Vec<usize>,
    offset: usize,
}

impl Layout {
    /// Build a layout from explicit parts.
    pub fn new(shape: Shape, strides: Vec<usize>, offset: usize) -> Self {
        Layout {
            shape,
            strides,
            offset,
        }
    }

    /// The canonical row-major layout for `shape`, starting at offset 0.
    pub fn contiguous(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let strides = shape.stride_contiguous();
        Layout {
            shape,
            strides,
            offset: 0,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the layout is exactly the canonical row-major layout.
    pub fn is_contiguous(&self) -> bool {
        self.offset == 0 && self.strides == self.shape.stride_contiguous()
    }

    /// Swap two dimensions. No data movement, only strides change.
    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Layout> {
        let rank = self.rank();
        if dim0 >= rank {
            return Err(Error::DimOutOfRange { dim: dim0, rank });
        }
        if dim1 >= rank {
            return Err(Error::DimOutOfRange { dim: dim1, rank });
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.swap(dim0, dim1);
        strides.swap(dim0, dim1);
        Ok(Layout::new(Shape::new(dims), strides, self.offset))
    }

    /// Restrict dimension `dim` to the range `[start, start + len)`.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Layout> {
        let rank = self.rank();
        if dim >= rank {
            return Err(Error::DimOutOfRange { dim, rank });
        }
        let dim_size = self.dims()[dim];
        if start + len > dim_size {
            return Err(Error::NarrowOutOfBounds {
                dim,
                start,
                len,
                dim_size,
            });
        }
        let mut dims = self.dims().to_vec();
        dims[dim] = len;
        let offset = self.offset + start * self.strides[dim];
        Ok(Layout::new(Shape::new(dims), self.strides.clone(), offset))
    }

    /// View this layout as `target` shape, with stride 0 on broadcast dims.
    pub fn broadcast_as(&self, target: &Shape) -> Result<Layout> {
        let strides = self.shape.broadcast_strides(&self.strides, target)?;
        Ok(Layout::new(target.clone(), strides, self.offset))
    }

    /// Iterate the storage indices of every element in logical row-major order.
    pub fn strided_indices(&self) -> StridedIter<'_> {
        StridedIter {
            dims: self.dims(),
            strides: &self.strides,
            multi_index: vec![0; self.rank()],
            storage_index: self.offset,
            remaining: self.elem_count(),
        }
    }
}

/// Iterator over storage indices in logical row-major order.
///
/// Walks the multi-index rightmost dimension first, keeping a running
/// storage position so each step is O(1) amortized.
pub struct StridedIter<'a> {
    dims: &'a [usize],
    strides: &'a [usize],
    multi_index: Vec<usize>,
    storage_index: usize,
    remaining: usize,
}

impl Iterator for StridedIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.storage_index;
        self.remaining -= 1;
        for d in (0..self.dims.len()).rev() {
            self.multi_index[d] += 1;
            self.storage_index += self.strides[d];
            if self.multi_index[d] < self.dims[d] {
                break;
            }
            // Wrapped: undo this dimension's contribution and carry left.
            self.storage_index -= self.multi_index[d] * self.strides[d];
            self.multi_index[d] = 0;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedIter<'_> {}
