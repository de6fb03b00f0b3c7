// Dropout — regularization between the recurrent stack and the head
//
// In training mode each element is zeroed with probability p and the
// survivors are scaled by 1/(1-p), keeping the expected activation unchanged.
// In eval mode the layer is the identity. The mode flag lives in a
// Cell<bool> so it can be flipped through a shared reference.

use std::cell::Cell;

use aural_core::backend::Backend;
use aural_core::error::Result;
use aural_core::tensor::Tensor;

use crate::module::Module;

/// Applies dropout regularization.
pub struct Dropout {
    /// Probability of an element being zeroed.
    p: f64,
    training: Cell<bool>,
}

impl Dropout {
    /// Create a new Dropout layer. `p` must lie in [0, 1).
    pub fn new(p: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "dropout probability must be in [0, 1), got {p}"
        );
        Dropout {
            p,
            training: Cell::new(true),
        }
    }

    /// The drop probability.
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Set training/eval mode without naming a backend.
    pub fn set_training(&self, training: bool) {
        self.training.set(training);
    }

    /// Whether the layer is in training mode.
    pub fn is_training(&self) -> bool {
        self.training.get()
    }

    /// Apply dropout to `x`. Identity in eval mode or when p == 0.
    pub fn forward_t<B: Backend>(&self, x: &Tensor<B>) -> Result<Tensor<B>> {
        if !self.training.get() || self.p == 0.0 {
            return Ok(x.clone());
        }

        let scale = 1.0 / (1.0 - self.p);

        // keep where a fresh uniform draw lands at or above p
        let draw = Tensor::<B>::rand(x.shape().clone(), x.dtype(), x.device())?;
        let threshold = Tensor::<B>::full(x.shape().clone(), self.p, x.dtype(), x.device())?;
        let keep = draw.ge(&threshold)?;

        let zeros = Tensor::<B>::zeros(x.shape().clone(), x.dtype(), x.device())?;
        let scaled = x.affine(scale, 0.0)?;

        Tensor::<B>::where_cond(&keep, &scaled, &zeros)
    }
}

// No trainable parameters; only the mode flag matters.
impl<B: Backend> Module<B> for Dropout {
    fn forward(&self, x: &Tensor<B>) -> Result<Tensor<B>> {
        self.forward_t(x)
    }

    fn parameters(&self) -> Vec<Tensor<B>> {
        vec![]
    }

    fn set_training(&self, training: bool) {
        self.training.set(training);
    }

    fn is_training(&self) -> bool {
        self.training.get()
    }
}
