// Module trait — the interface every layer of the classifier implements
//
// Each layer (Linear, RNN, Dropout, the full AudioRnnClassifier) is a plain
// struct implementing this trait. Optimizers and the training loop only ever
// see the trait: forward() for computation, parameters() for the trainable
// tensors, set_training() for the train/eval switch that Dropout needs.
//
// Mode switching uses interior mutability (Cell<bool> inside the modules
// that care), so a shared &Module reference is enough to flip modes mid-run.

use aural_core::backend::Backend;
use aural_core::error::Result;
use aural_core::tensor::Tensor;

/// The interface shared by every network layer.
///
/// - `forward()`: compute the output tensor from the input
/// - `parameters()`: list the trainable tensors for the optimizer
/// - `set_training()` / `is_training()`: train vs eval behavior
/// - `to_device()`: migrate parameters between devices of the backend
pub trait Module<B: Backend> {
    /// Compute the output tensor from the input tensor.
    fn forward(&self, x: &Tensor<B>) -> Result<Tensor<B>>;

    /// Return all trainable parameters of this module.
    fn parameters(&self) -> Vec<Tensor<B>>;

    /// Switch between training and evaluation behavior.
    ///
    /// Override in modules that behave differently per mode (Dropout).
    /// Composite modules forward the call to their children.
    fn set_training(&self, _training: bool) {}

    /// Whether the module is in training mode (default: true).
    fn is_training(&self) -> bool {
        true
    }

    /// Convenience: set training mode.
    fn train(&self) {
        self.set_training(true);
    }

    /// Convenience: set evaluation mode.
    fn eval(&self) {
        self.set_training(false);
    }

    /// Move the module's parameters to the given device.
    ///
    /// Parameters are created on a device at construction time, so for a
    /// single-device backend this is a no-op. Backends with several devices
    /// override it to migrate storage.
    fn to_device(&self, _device: &B::Device) -> Result<()> {
        Ok(())
    }

    /// Total number of scalar parameters in this module.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.elem_count()).sum()
    }

    /// Return all trainable parameters with human-readable names.
    ///
    /// Leaf modules override this with names like `"weight"` / `"bias"`;
    /// composite modules prefix their children's names with a `"."`
    /// separator. The default uses positional indices.
    fn named_parameters(&self) -> Vec<(String, Tensor<B>)> {
        self.parameters()
            .into_iter()
            .enumerate()
            .map(|(i, p)| (format!("param_{i}"), p))
            .collect()
    }
}
