// Train/validation index splitting and label distribution reporting

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};

use crate::dataset::Dataset;
use crate::DataError;

/// Split `0..len` into disjoint (train, val) index vectors.
///
/// The split is positional: after the optional shuffle, the first
/// `num_train` indices become the training subset and the next `num_val`
/// (or all remaining, when `num_val` is `None`) become the validation
/// subset. No class stratification is applied.
///
/// With `shuffle`, the indices are permuted first — seeded via
/// `StdRng::seed_from_u64` when `seed` is given, `thread_rng` otherwise.
///
/// Errors with [`DataError::Partition`] when the requested subset sizes
/// exceed `len`.
pub fn split_indices(
    len: usize,
    num_train: usize,
    num_val: Option<usize>,
    shuffle: bool,
    seed: Option<u64>,
) -> Result<(Vec<usize>, Vec<usize>), DataError> {
    if num_train > len {
        return Err(DataError::Partition {
            requested: num_train,
            available: len,
        });
    }
    if let Some(nv) = num_val {
        if num_train + nv > len {
            return Err(DataError::Partition {
                requested: num_train + nv,
                available: len,
            });
        }
    }

    let mut indices: Vec<usize> = (0..len).collect();
    if shuffle {
        match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                indices.shuffle(&mut rng);
            }
            None => {
                let mut rng = thread_rng();
                indices.shuffle(&mut rng);
            }
        }
    }

    let train = indices[..num_train].to_vec();
    let val = match num_val {
        Some(nv) => indices[num_train..num_train + nv].to_vec(),
        None => indices[num_train..].to_vec(),
    };
    Ok((train, val))
}

/// Count how many samples of each class the given subset contains.
///
/// Returns a vec of length `num_classes` where entry `c` is the number of
/// subset samples labeled `c`. Errors if a sample carries no target or a
/// label outside `0..num_classes`.
pub fn label_distribution(
    dataset: &dyn Dataset,
    indices: &[usize],
    num_classes: usize,
) -> Result<Vec<usize>, DataError> {
    let mut counts = vec![0usize; num_classes];
    for &index in indices {
        let sample = dataset.get(index);
        let raw = *sample.target.first().ok_or_else(|| {
            DataError::Format(format!("sample {index} has no target value"))
        })?;
        let label = raw as i64;
        if label < 0 || label >= num_classes as i64 {
            return Err(DataError::LabelOutOfRange {
                index,
                label,
                num_classes,
            });
        }
        counts[label as usize] += 1;
    }
    Ok(counts)
}
