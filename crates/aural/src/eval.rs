//! Accuracy evaluation over one provider pass.

use aural_core::Backend;
use aural_data::BatchProvider;
use aural_nn::Module;

use crate::error::{Error, Result};

/// Classification accuracy over one subset.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    pub num_correct: usize,
    pub num_samples: usize,
    /// `num_correct / num_samples`, in `[0, 1]`.
    pub accuracy: f64,
}

/// Measure `model`'s accuracy over one pass of `provider`.
///
/// Prints `Checking accuracy on {subset} set` and the familiar
/// `Got {n} / {m} correct ({p:.2})` line. Puts the model in eval mode and
/// leaves it there; the training loop re-enters training mode at the top
/// of its next epoch.
///
/// An empty pass is an [`Error::EmptySubset`] named after `subset`, never
/// a zero-division.
pub fn evaluate<B: Backend>(
    model: &dyn Module<B>,
    provider: &dyn BatchProvider<B>,
    subset: &str,
) -> Result<AccuracyReport> {
    println!("Checking accuracy on {subset} set");
    model.eval();

    let mut num_correct = 0usize;
    let mut num_samples = 0usize;
    for batch in provider.pass(0)? {
        let batch = batch?;
        let scores = model.forward(&batch.features)?;
        // argmax breaks ties toward the lowest class index
        let preds = scores.argmax(1)?.to_f64_vec()?;
        let labels = batch.labels.to_f64_vec()?;
        num_correct += preds
            .iter()
            .zip(labels.iter())
            .filter(|(pred, label)| pred == label)
            .count();
        num_samples += batch.len();
    }

    if num_samples == 0 {
        return Err(Error::EmptySubset {
            subset: subset.to_string(),
        });
    }

    let accuracy = num_correct as f64 / num_samples as f64;
    println!(
        "Got {} / {} correct ({:.2})",
        num_correct,
        num_samples,
        100.0 * accuracy
    );
    Ok(AccuracyReport {
        num_correct,
        num_samples,
        accuracy,
    })
}
