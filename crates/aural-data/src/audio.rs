// AudioDataset — extracted audio features + labels from JSON files
//
// The feature file is a JSON array of clips, each clip a 2-D array of
// frames: [[f64; feature_dim]; clip_len]. The label file is a JSON array of
// integer class labels of the same length. Clips come in with varying
// lengths, so every clip is zero-padded or truncated to exactly
// `max_length` frames at load time (in parallel via rayon), giving the
// recurrent model a fixed-shape [max_length, feature_dim] input per sample.

use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::dataset::{Dataset, Sample};
use crate::DataError;

/// A dataset of fixed-length audio feature sequences with binary labels.
pub struct AudioDataset {
    /// One flattened [max_length * feature_dim] buffer per clip.
    features: Vec<Vec<f64>>,
    labels: Vec<i64>,
    feature_shape: Vec<usize>,
    target_shape: Vec<usize>,
}

impl AudioDataset {
    /// Number of label classes the dataset validates against.
    pub const NUM_CLASSES: usize = 2;

    /// Load features and labels from a pair of JSON files.
    pub fn from_json_files<P: AsRef<Path>>(
        features_path: P,
        labels_path: P,
        max_length: usize,
    ) -> Result<Self, DataError> {
        let features_json = read_file(features_path.as_ref())?;
        let labels_json = read_file(labels_path.as_ref())?;
        Self::from_json_str(&features_json, &labels_json, max_length)
    }

    /// Parse features and labels from in-memory JSON strings.
    pub fn from_json_str(
        features_json: &str,
        labels_json: &str,
        max_length: usize,
    ) -> Result<Self, DataError> {
        let clips: Vec<Vec<Vec<f64>>> =
            serde_json::from_str(features_json).map_err(|source| DataError::Json {
                what: "feature",
                source,
            })?;
        let labels: Vec<i64> =
            serde_json::from_str(labels_json).map_err(|source| DataError::Json {
                what: "label",
                source,
            })?;

        if clips.is_empty() {
            return Err(DataError::Format("feature file is empty".to_string()));
        }
        if clips.len() != labels.len() {
            return Err(DataError::LengthMismatch {
                features: clips.len(),
                labels: labels.len(),
            });
        }
        for (index, &label) in labels.iter().enumerate() {
            if label < 0 || label >= Self::NUM_CLASSES as i64 {
                return Err(DataError::LabelOutOfRange {
                    index,
                    label,
                    num_classes: Self::NUM_CLASSES,
                });
            }
        }

        // Feature width comes from the first non-empty clip; every frame in
        // every clip must agree with it.
        let feature_dim = clips
            .iter()
            .find_map(|clip| clip.first().map(|frame| frame.len()))
            .ok_or_else(|| {
                DataError::Format("all clips are empty; cannot infer feature dimension".to_string())
            })?;
        if feature_dim == 0 {
            return Err(DataError::Format(
                "feature frames have zero width".to_string(),
            ));
        }

        let features: Vec<Vec<f64>> = clips
            .into_par_iter()
            .enumerate()
            .map(|(clip_idx, clip)| pad_or_truncate(clip_idx, clip, max_length, feature_dim))
            .collect::<Result<_, _>>()?;

        Ok(AudioDataset {
            features,
            labels,
            feature_shape: vec![max_length, feature_dim],
            target_shape: vec![1],
        })
    }

    /// Frames per clip after padding/truncation.
    pub fn max_length(&self) -> usize {
        self.feature_shape[0]
    }

    /// Width of a single feature frame.
    pub fn feature_dim(&self) -> usize {
        self.feature_shape[1]
    }

    /// Number of label classes.
    pub fn num_classes(&self) -> usize {
        Self::NUM_CLASSES
    }

    /// The raw label of the sample at `index`.
    pub fn label(&self, index: usize) -> i64 {
        self.labels[index]
    }
}

impl Dataset for AudioDataset {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn get(&self, index: usize) -> Sample {
        Sample {
            features: self.features[index].clone(),
            feature_shape: self.feature_shape.clone(),
            target: vec![self.labels[index] as f64],
            target_shape: self.target_shape.clone(),
        }
    }

    fn feature_shape(&self) -> &[usize] {
        &self.feature_shape
    }

    fn target_shape(&self) -> &[usize] {
        &self.target_shape
    }

    fn name(&self) -> &str {
        "audio"
    }
}

fn read_file(path: &Path) -> Result<String, DataError> {
    fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Flatten a clip to exactly `max_length * feature_dim` values: frames past
/// `max_length` are dropped, missing frames become zeros.
fn pad_or_truncate(
    clip_idx: usize,
    clip: Vec<Vec<f64>>,
    max_length: usize,
    feature_dim: usize,
) -> Result<Vec<f64>, DataError> {
    let mut out = Vec::with_capacity(max_length * feature_dim);
    for (frame_idx, frame) in clip.iter().take(max_length).enumerate() {
        if frame.len() != feature_dim {
            return Err(DataError::Format(format!(
                "clip {} frame {} has width {}, expected {}",
                clip_idx,
                frame_idx,
                frame.len(),
                feature_dim
            )));
        }
        out.extend_from_slice(frame);
    }
    out.resize(max_length * feature_dim, 0.0);
    Ok(out)
}
