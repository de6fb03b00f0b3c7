//! # aural-optim
//!
//! Gradient-descent optimizers over [`aural_core`] tensors.
//!
//! Optimizers hold clones of the model's parameter tensors. Parameter
//! clones share storage, so values written by [`Optimizer::step`] are
//! visible to the model without any re-registration step.

use aural_core::{Backend, GradStore, Result, Tensor};

pub mod adam;

pub use adam::Adam;

/// Interface shared by gradient-descent optimizers.
///
/// There is no `zero_grad`: every backward pass returns a fresh
/// [`GradStore`], so gradients cannot leak across steps.
pub trait Optimizer<B: Backend> {
    /// Apply one update to each tracked parameter that has a gradient
    /// in `grads`. Parameters absent from the store are left untouched.
    fn step(&mut self, grads: &GradStore<B>) -> Result<()>;

    /// The parameters this optimizer updates.
    fn params(&self) -> &[Tensor<B>];

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}
