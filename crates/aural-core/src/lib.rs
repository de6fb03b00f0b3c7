//! # aural-core
//!
//! Tensor substrate for the aural training stack.
//!
//! The core types are:
//! - [`Tensor`]: an n-dimensional array handle, generic over a [`Backend`],
//!   that records the ops applied to it for reverse-mode differentiation.
//! - [`Shape`] and [`Layout`]: dimensions plus strides/offset, so views
//!   (transpose, narrow) share storage without copying.
//! - [`DType`]: the element types a storage can hold.
//! - [`Backend`]: the trait compute backends implement; kernels receive
//!   raw layouts and return contiguous storage.
//! - [`GradStore`]: per-backward-pass gradients keyed by tensor id.

pub mod backend;
pub mod backprop;
pub mod dtype;
pub mod error;
pub mod layout;
pub mod op;
pub mod shape;
pub mod tensor;

pub use backend::{Backend, BackendDevice, BackendStorage, BinaryOp, CmpOp, ReduceOp, UnaryOp};
pub use backprop::GradStore;
pub use dtype::{DType, WithDType};
pub use error::{Error, Result};
pub use layout::Layout;
pub use op::{Op, TensorId};
pub use shape::Shape;
pub use tensor::Tensor;
