//! Adam with bias-corrected first and second moment estimates.

use aural_core::{Backend, Error, GradStore, Result, Tensor};

use crate::Optimizer;

/// Adam optimizer (Kingma & Ba, 2015).
///
/// Moment buffers are kept host-side as `f64` vectors, one pair per
/// parameter. Each step reads the parameter's gradient from the
/// [`GradStore`], folds it into the moments, and writes the updated
/// values back through the parameter's shared storage.
pub struct Adam<B: Backend> {
    params: Vec<Tensor<B>>,
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    t: u64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl<B: Backend> Adam<B> {
    /// Standard defaults: `beta1 = 0.9`, `beta2 = 0.999`, `eps = 1e-8`.
    pub fn new(params: Vec<Tensor<B>>, lr: f64) -> Self {
        Self::with_betas(params, lr, 0.9, 0.999)
    }

    pub fn with_betas(params: Vec<Tensor<B>>, lr: f64, beta1: f64, beta2: f64) -> Self {
        let m = params.iter().map(|p| vec![0.0; p.elem_count()]).collect();
        let v = params.iter().map(|p| vec![0.0; p.elem_count()]).collect();
        Adam {
            params,
            lr,
            beta1,
            beta2,
            eps: 1e-8,
            t: 0,
            m,
            v,
        }
    }

    /// Number of steps taken so far.
    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl<B: Backend> Optimizer<B> for Adam<B> {
    fn step(&mut self, grads: &GradStore<B>) -> Result<()> {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);

        for (i, param) in self.params.iter().enumerate() {
            let grad = match grads.get(param) {
                Some(grad) => grad,
                None => continue,
            };
            let g = grad.to_f64_vec()?;
            let mut data = param.to_f64_vec()?;
            if g.len() != data.len() {
                return Err(Error::msg(format!(
                    "gradient has {} elements but parameter {} has {}",
                    g.len(),
                    i,
                    data.len()
                )));
            }

            let m = &mut self.m[i];
            let v = &mut self.v[i];
            for j in 0..data.len() {
                m[j] = self.beta1 * m[j] + (1.0 - self.beta1) * g[j];
                v[j] = self.beta2 * v[j] + (1.0 - self.beta2) * g[j] * g[j];
                let m_hat = m[j] / bias1;
                let v_hat = v[j] / bias2;
                data[j] -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
            }
            param.update_data_inplace(&data)?;
        }
        Ok(())
    }

    fn params(&self) -> &[Tensor<B>] {
        &self.params
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}
