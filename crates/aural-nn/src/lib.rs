//! # aural-nn
//!
//! Neural network building blocks for the audio sequence classifier.
//!
//! Provides the layers the model is assembled from, all following the
//! [`Module`] trait pattern:
//!
//! 1. **Module trait** — every layer implements `forward()`
//! 2. **Linear** — fully connected: `y = xW^T + b`
//! 3. **RNNCell / RNN** — recurrent cell and its sequence unroller
//! 4. **Dropout** — regularization via random zeroing
//! 5. **cross_entropy_loss** — classification loss over class indices
//! 6. **init** — parameter initialization utilities
//!
//! Modules are generic over `Backend` (like `Tensor<B>`), so the same
//! network definition works on any backend the workspace provides.

pub mod dropout;
pub mod init;
pub mod linear;
pub mod loss;
pub mod module;
pub mod rnn;

pub use dropout::Dropout;
pub use linear::Linear;
pub use loss::cross_entropy_loss;
pub use module::Module;
pub use rnn::{RNNCell, RNN};
