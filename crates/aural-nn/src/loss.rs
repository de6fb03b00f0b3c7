// Loss — cross-entropy over class-index targets
//
// The classifier trains against integer labels, so the loss takes raw
// logits plus a vector of class indices and computes
//
//   -mean( log_softmax(logits)[i, target_i] )
//
// log_softmax handles the numerical stability (max subtraction happens at
// the tensor level) and the one-hot selection is built host-side, so the
// whole thing stays differentiable through the logits.

use aural_core::backend::Backend;
use aural_core::error::Result;
use aural_core::tensor::Tensor;

/// Cross-entropy loss with integer class indices.
///
/// # Arguments
/// - `logits`: raw scores `[batch, num_classes]` (NOT softmax-ed)
/// - `targets`: class indices `[batch]`, each in `0..num_classes`
///
/// Returns a scalar tensor ready for `backward()`.
pub fn cross_entropy_loss<B: Backend>(
    logits: &Tensor<B>,
    targets: &Tensor<B>,
) -> Result<Tensor<B>> {
    let dims = logits.dims();
    if dims.len() != 2 {
        return Err(aural_core::Error::msg(format!(
            "cross_entropy expects 2D logits [batch, classes], got {:?}",
            dims
        )));
    }
    let batch = dims[0];
    let num_classes = dims[1];
    if targets.elem_count() != batch {
        return Err(aural_core::Error::msg(format!(
            "cross_entropy: {} logit rows but {} targets",
            batch,
            targets.elem_count()
        )));
    }

    // One-hot selection mask from the class indices
    let target_vals = targets.to_f64_vec()?;
    let mut one_hot = vec![0.0f64; batch * num_classes];
    for (i, &t) in target_vals.iter().enumerate() {
        if t < 0.0 || t >= num_classes as f64 {
            return Err(aural_core::Error::msg(format!(
                "cross_entropy: target index {} out of range for {} classes",
                t, num_classes
            )));
        }
        one_hot[i * num_classes + t as usize] = 1.0;
    }
    let one_hot = Tensor::<B>::from_f64_slice(
        &one_hot,
        (batch, num_classes),
        logits.dtype(),
        logits.device(),
    )?;

    // -mean(sum_classes(one_hot * log_softmax))
    let log_sm = logits.log_softmax(1)?;
    let picked = one_hot.mul(&log_sm)?.sum(1, false)?;
    picked.mean_all()?.neg()
}
