//! The epoch training loop.

use aural_core::{Backend, GradStore, Tensor};
use aural_data::BatchProvider;
use aural_nn::Module;
use aural_optim::Optimizer;

use crate::error::Result;
use crate::eval::{evaluate, AccuracyReport};

/// Hook invoked after every optimizer step.
///
/// Observers see the 1-based batch index, the running average of the
/// per-batch losses so far this epoch, the model's parameters, and the
/// batch's gradient store. They log; they never feed back into training.
pub trait StepObserver<B: Backend> {
    fn on_step(
        &mut self,
        batch_index: usize,
        avg_loss: f64,
        params: &[Tensor<B>],
        grads: &GradStore<B>,
    ) -> aural_core::Result<()>;
}

/// Prints `t = {t}, avg_loss = {avg}, grad_mag = {mag}` on every
/// `every`-th batch.
pub struct GradMagnitudePrinter {
    every: usize,
}

impl GradMagnitudePrinter {
    /// Panics if `every` is zero; `Config::validate` rejects that upstream.
    pub fn new(every: usize) -> Self {
        assert!(every > 0, "print period must be positive");
        GradMagnitudePrinter { every }
    }
}

impl Default for GradMagnitudePrinter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<B: Backend> StepObserver<B> for GradMagnitudePrinter {
    fn on_step(
        &mut self,
        batch_index: usize,
        avg_loss: f64,
        params: &[Tensor<B>],
        grads: &GradStore<B>,
    ) -> aural_core::Result<()> {
        if batch_index % self.every != 0 {
            return Ok(());
        }
        let mag = gradient_magnitude(params, grads)?;
        println!("t = {batch_index}, avg_loss = {avg_loss:.4}, grad_mag = {mag:.2}");
        Ok(())
    }
}

/// `Σ |Σ grad_p|` over the parameters whose gradient sum is nonzero.
///
/// A coarse per-step magnitude diagnostic; parameters missing from the
/// store contribute nothing.
pub fn gradient_magnitude<B: Backend>(
    params: &[Tensor<B>],
    grads: &GradStore<B>,
) -> aural_core::Result<f64> {
    let mut total = 0.0;
    for param in params {
        if let Some(grad) = grads.get(param) {
            let sum = grad.sum_all()?.to_scalar_f64()?;
            if sum != 0.0 {
                total += sum.abs();
            }
        }
    }
    Ok(total)
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Average per-batch loss of each epoch.
    pub epoch_losses: Vec<f64>,
    pub final_train: AccuracyReport,
    pub final_val: AccuracyReport,
}

/// Run the full training loop: `num_epochs` epochs of forward, loss,
/// backward, and optimizer step over `train_data`, evaluating on both
/// providers after each epoch and once more at the end.
///
/// `loss_fn` maps `(scores, labels)` to a scalar loss tensor. Any error
/// from the forward pass, the loss, the backward pass, the optimizer, a
/// provider, or the observer aborts the run. Non-finite losses are not
/// intercepted; they flow into the optimizer like any other value.
pub fn train<B, F>(
    model: &dyn Module<B>,
    loss_fn: F,
    optimizer: &mut dyn Optimizer<B>,
    train_data: &dyn BatchProvider<B>,
    val_data: &dyn BatchProvider<B>,
    num_epochs: usize,
    observer: &mut dyn StepObserver<B>,
) -> Result<TrainReport>
where
    B: Backend,
    F: Fn(&Tensor<B>, &Tensor<B>) -> aural_core::Result<Tensor<B>>,
{
    let params = model.parameters();
    let mut epoch_losses = Vec::with_capacity(num_epochs);

    for epoch in 1..=num_epochs {
        println!("Starting epoch {} / {}", epoch, num_epochs);
        model.train();

        let mut loss_total = 0.0;
        let mut num_batches = 0usize;
        for batch in train_data.pass(epoch - 1)? {
            let batch = batch?;
            let scores = model.forward(&batch.features)?;
            let loss = loss_fn(&scores, &batch.labels)?;
            loss_total += loss.to_scalar_f64()?;

            let grads = loss.backward()?;
            optimizer.step(&grads)?;

            num_batches += 1;
            observer.on_step(num_batches, loss_total / num_batches as f64, &params, &grads)?;
        }
        epoch_losses.push(if num_batches > 0 {
            loss_total / num_batches as f64
        } else {
            0.0
        });

        println!("--- Evaluating ---");
        evaluate(model, train_data, "train")?;
        evaluate(model, val_data, "val")?;
        println!("\n");
    }

    println!("\n--- Final Evaluation ---");
    let final_train = evaluate(model, train_data, "train")?;
    let final_val = evaluate(model, val_data, "val")?;

    Ok(TrainReport {
        epoch_losses,
        final_train,
        final_val,
    })
}
