//! The recurrent audio-clip classifier.

use aural_core::{Backend, DType, Result, Tensor};
use aural_nn::{Dropout, Linear, Module, RNN};

/// Single-layer tanh RNN over the padded feature sequence, classified
/// from the final hidden state through dropout and a linear head.
///
/// Input is `[batch, max_length, feature_dim]`; output is
/// `[batch, num_classes]` logits.
pub struct AudioRnnClassifier<B: Backend> {
    rnn: RNN<B>,
    dropout: Dropout,
    head: Linear<B>,
}

impl<B: Backend> AudioRnnClassifier<B> {
    pub fn new(
        feature_dim: usize,
        hidden_size: usize,
        num_classes: usize,
        dropout_p: f64,
        device: &B::Device,
    ) -> Result<Self> {
        Ok(AudioRnnClassifier {
            rnn: RNN::new(feature_dim, hidden_size, true, DType::F32, device)?,
            dropout: Dropout::new(dropout_p),
            head: Linear::new(hidden_size, num_classes, true, DType::F32, device)?,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.rnn.cell().hidden_size
    }

    pub fn num_classes(&self) -> usize {
        self.head.out_features()
    }
}

impl<B: Backend> Module<B> for AudioRnnClassifier<B> {
    fn forward(&self, x: &Tensor<B>) -> Result<Tensor<B>> {
        // h_n is the hidden state after the last timestep
        let (_output, h_n) = self.rnn.forward(x, None)?;
        let h = self.dropout.forward_t(&h_n)?;
        self.head.forward(&h)
    }

    fn parameters(&self) -> Vec<Tensor<B>> {
        let mut params = self.rnn.parameters();
        params.extend(self.head.parameters());
        params
    }

    fn set_training(&self, training: bool) {
        self.dropout.set_training(training);
    }

    fn is_training(&self) -> bool {
        self.dropout.is_training()
    }

    fn named_parameters(&self) -> Vec<(String, Tensor<B>)> {
        let mut named: Vec<(String, Tensor<B>)> = self
            .rnn
            .named_parameters()
            .into_iter()
            .map(|(k, v)| (format!("rnn.{k}"), v))
            .collect();
        named.extend(
            self.head
                .named_parameters()
                .into_iter()
                .map(|(k, v)| (format!("head.{k}"), v)),
        );
        named
    }
}
