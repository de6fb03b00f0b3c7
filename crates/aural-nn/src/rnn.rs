// Recurrent layers — RNNCell and its sequence unroller
//
// The audio classifier consumes a fixed-length feature sequence one frame at
// a time. RNNCell computes a single step:
//
//   h_t = tanh(x_t @ W_ih^T + b_ih + h_{t-1} @ W_hh^T + b_hh)
//
// RNN wraps the cell and unrolls it over the sequence dimension, collecting
// every hidden state into one output tensor via differentiable `cat`, so
// gradients flow back through all timesteps.
//
// SHAPES (batch_first convention):
//   input:  [batch, seq_len, input_size]
//   output: [batch, seq_len, hidden_size]
//   h_n:    [batch, hidden_size]
//
// All weights draw from U(-k, k) with k = sqrt(1/hidden_size), the usual
// recurrent-layer default.

use aural_core::backend::Backend;
use aural_core::dtype::DType;
use aural_core::error::Result;
use aural_core::tensor::Tensor;

/// A single-step recurrent cell.
///
/// Computes: `h' = tanh(x @ W_ih^T + b_ih + h @ W_hh^T + b_hh)`
///
/// # Shapes
/// - input x: `[batch, input_size]`
/// - hidden h: `[batch, hidden_size]`
/// - output h': `[batch, hidden_size]`
pub struct RNNCell<B: Backend> {
    w_ih: Tensor<B>,         // [hidden_size, input_size]
    w_hh: Tensor<B>,         // [hidden_size, hidden_size]
    b_ih: Option<Tensor<B>>, // [1, hidden_size]
    b_hh: Option<Tensor<B>>, // [1, hidden_size]
    pub input_size: usize,
    pub hidden_size: usize,
}

impl<B: Backend> RNNCell<B> {
    /// Create a new cell with the default uniform initialization.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        use_bias: bool,
        dtype: DType,
        device: &B::Device,
    ) -> Result<Self> {
        let k = (1.0 / hidden_size as f64).sqrt();

        let w_ih = crate::init::uniform::<B>((hidden_size, input_size), -k, k, dtype, device)?;
        let w_hh = crate::init::uniform::<B>((hidden_size, hidden_size), -k, k, dtype, device)?;

        let (b_ih, b_hh) = if use_bias {
            let bi = crate::init::uniform::<B>((1, hidden_size), -k, k, dtype, device)?;
            let bh = crate::init::uniform::<B>((1, hidden_size), -k, k, dtype, device)?;
            (Some(bi), Some(bh))
        } else {
            (None, None)
        };

        Ok(RNNCell {
            w_ih,
            w_hh,
            b_ih,
            b_hh,
            input_size,
            hidden_size,
        })
    }

    /// Forward: h' = tanh(x @ W_ih^T + b_ih + h @ W_hh^T + b_hh)
    pub fn forward(&self, x: &Tensor<B>, h: &Tensor<B>) -> Result<Tensor<B>> {
        // x @ W_ih^T → [batch, hidden_size]
        let mut gates = x.matmul(&self.w_ih.t()?)?;
        if let Some(ref b) = self.b_ih {
            gates = gates.add(b)?;
        }

        // h @ W_hh^T → [batch, hidden_size]
        let mut h_part = h.matmul(&self.w_hh.t()?)?;
        if let Some(ref b) = self.b_hh {
            h_part = h_part.add(b)?;
        }

        gates.add(&h_part)?.tanh()
    }

    /// Return all trainable parameters.
    pub fn parameters(&self) -> Vec<Tensor<B>> {
        let mut params = vec![self.w_ih.clone(), self.w_hh.clone()];
        if let Some(ref b) = self.b_ih {
            params.push(b.clone());
        }
        if let Some(ref b) = self.b_hh {
            params.push(b.clone());
        }
        params
    }

    /// Return all trainable parameters with names.
    pub fn named_parameters(&self) -> Vec<(String, Tensor<B>)> {
        let mut named = vec![
            ("w_ih".to_string(), self.w_ih.clone()),
            ("w_hh".to_string(), self.w_hh.clone()),
        ];
        if let Some(ref b) = self.b_ih {
            named.push(("b_ih".to_string(), b.clone()));
        }
        if let Some(ref b) = self.b_hh {
            named.push(("b_hh".to_string(), b.clone()));
        }
        named
    }
}

/// A full recurrent layer that unrolls an [`RNNCell`] over the sequence
/// dimension.
///
/// # Shapes
/// - input:  `[batch, seq_len, input_size]`
/// - output: `[batch, seq_len, hidden_size]` — all hidden states
/// - h_n:    `[batch, hidden_size]` — final hidden state
pub struct RNN<B: Backend> {
    cell: RNNCell<B>,
}

impl<B: Backend> RNN<B> {
    /// Create a new RNN layer.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        use_bias: bool,
        dtype: DType,
        device: &B::Device,
    ) -> Result<Self> {
        let cell = RNNCell::new(input_size, hidden_size, use_bias, dtype, device)?;
        Ok(RNN { cell })
    }

    /// Forward pass over the full sequence.
    ///
    /// - `x`: `[batch, seq_len, input_size]`
    /// - `h0`: optional initial hidden state `[batch, hidden_size]`.
    ///   If None, zeros are used.
    ///
    /// Returns `(output, h_n)` where:
    /// - `output`: `[batch, seq_len, hidden_size]`
    /// - `h_n`: `[batch, hidden_size]`
    pub fn forward(&self, x: &Tensor<B>, h0: Option<&Tensor<B>>) -> Result<(Tensor<B>, Tensor<B>)> {
        let dims = x.dims();
        let batch = dims[0];
        let seq_len = dims[1];

        let mut h = match h0 {
            Some(h) => h.clone(),
            None => Tensor::<B>::zeros((batch, self.cell.hidden_size), x.dtype(), x.device())?,
        };

        // Unroll over timesteps
        let mut outputs: Vec<Tensor<B>> = Vec::with_capacity(seq_len);
        for t in 0..seq_len {
            // x_t: [batch, 1, input_size] → [batch, input_size]
            let x_t = x.narrow(1, t, 1)?.reshape((batch, self.cell.input_size))?;
            h = self.cell.forward(&x_t, &h)?;
            // h: [batch, hidden_size] → [batch, 1, hidden_size] for stacking
            outputs.push(h.reshape((batch, 1, self.cell.hidden_size))?);
        }

        // Stack: [batch, seq_len, hidden_size]
        let output = Tensor::cat(&outputs, 1)?;
        Ok((output, h))
    }

    /// Return all trainable parameters.
    pub fn parameters(&self) -> Vec<Tensor<B>> {
        self.cell.parameters()
    }

    /// Return all trainable parameters with names.
    pub fn named_parameters(&self) -> Vec<(String, Tensor<B>)> {
        self.cell
            .named_parameters()
            .into_iter()
            .map(|(k, v)| (format!("cell.{k}"), v))
            .collect()
    }

    /// Access the underlying cell.
    pub fn cell(&self) -> &RNNCell<B> {
        &self.cell
    }
}
