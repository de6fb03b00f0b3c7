// Linear — fully-connected layer: y = x @ W^T + b
//
// The classifier head of the audio model is a Linear layer projecting the
// final hidden state onto the class logits.
//
// PARAMETER SHAPES:
//   weight: [out_features, in_features]  — stored transposed, matmul takes
//                                          the strided W^T view directly
//   bias:   [1, out_features]            — broadcast across the batch
//
// Default initialization draws both parameters from U(-k, k) with
// k = sqrt(1/in_features), via init::kaiming_uniform / init::uniform.

use aural_core::backend::Backend;
use aural_core::dtype::DType;
use aural_core::error::Result;
use aural_core::tensor::Tensor;

use crate::init::{self, FanMode};
use crate::module::Module;

/// A fully-connected layer: y = x @ W^T + b.
pub struct Linear<B: Backend> {
    /// Weight matrix: [out_features, in_features]
    weight: Tensor<B>,
    /// Optional bias vector: [1, out_features]
    bias: Option<Tensor<B>>,
    in_features: usize,
    out_features: usize,
}

impl<B: Backend> Linear<B> {
    /// Create a new Linear layer with the default uniform initialization.
    pub fn new(
        in_features: usize,
        out_features: usize,
        use_bias: bool,
        dtype: DType,
        device: &B::Device,
    ) -> Result<Self> {
        // a = sqrt(5) makes the Kaiming bound equal sqrt(1/in_features)
        let weight = init::kaiming_uniform::<B>(
            (out_features, in_features),
            5.0_f64.sqrt(),
            FanMode::FanIn,
            dtype,
            device,
        )?;

        let bias = if use_bias {
            let k = (1.0 / in_features as f64).sqrt();
            Some(init::uniform::<B>((1, out_features), -k, k, dtype, device)?)
        } else {
            None
        };

        Ok(Linear {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    /// Create a Linear layer from existing weight and bias tensors.
    ///
    /// Used when the caller wants explicit weights instead of the default
    /// random initialization.
    pub fn from_tensors(weight: Tensor<B>, bias: Option<Tensor<B>>) -> Result<Self> {
        let dims = weight.dims();
        if dims.len() != 2 {
            return Err(aural_core::Error::msg(format!(
                "Linear weight must be 2D, got shape {:?}",
                dims
            )));
        }
        let out_features = dims[0];
        let in_features = dims[1];
        Ok(Linear {
            weight: weight.set_variable(),
            bias: bias.map(|b| b.set_variable()),
            in_features,
            out_features,
        })
    }

    /// The input feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// The output feature dimension.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Direct access to the weight tensor.
    pub fn weight(&self) -> &Tensor<B> {
        &self.weight
    }

    /// Direct access to the bias tensor (if any).
    pub fn bias(&self) -> Option<&Tensor<B>> {
        self.bias.as_ref()
    }
}

impl<B: Backend> Module<B> for Linear<B> {
    /// Forward pass: y = x @ W^T + b
    ///
    /// Input shape:  [batch, in_features]
    /// Output shape: [batch, out_features]
    fn forward(&self, x: &Tensor<B>) -> Result<Tensor<B>> {
        // The backend matmul accepts strided operands, so the transposed
        // view goes in without materializing a contiguous copy.
        let output = x.matmul(&self.weight.t()?)?;

        match &self.bias {
            // [1, out_features] broadcasts over the batch dimension
            Some(bias) => output.add(bias),
            None => Ok(output),
        }
    }

    fn parameters(&self) -> Vec<Tensor<B>> {
        let mut params = vec![self.weight.clone()];
        if let Some(ref b) = self.bias {
            params.push(b.clone());
        }
        params
    }

    fn named_parameters(&self) -> Vec<(String, Tensor<B>)> {
        let mut named = vec![("weight".to_string(), self.weight.clone())];
        if let Some(ref b) = self.bias {
            named.push(("bias".to_string(), b.clone()));
        }
        named
    }
}
