// BatchLoader — collation, worker prefetch, ordered hand-off
//
// A BatchLoader pairs a dataset with a sampler and serves one epoch at a
// time as a finite iterator of batches. With `num_workers == 0` batches are
// collated inline on the consumer's thread. With workers, background threads
// pull (batch_index, indices) jobs from a shared queue, collate, and send
// the results over a bounded channel; the consumer reorders them so batches
// always arrive in sampler order, whatever order the workers finish in.
//
// The channel capacity is `prefetch_factor * num_workers`, so at most that
// many batches are materialized ahead of the consumer. Dropping a pass
// mid-epoch closes the receiving end (unblocking any worker mid-send) and
// joins the workers.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use aural_core::backend::Backend;
use aural_core::error::{Error, Result};
use aural_core::tensor::Tensor;
use aural_core::DType;

use crate::dataset::{Dataset, Sample};
use crate::sampler::Sampler;

/// One collated batch.
///
/// `features` is `[n, ...feature_shape]` in the loader's dtype; `labels` is
/// `[n]` of I64 class indices, where `n` is this batch's sample count (the
/// final batch of a pass may be short).
pub struct Batch<B: Backend> {
    pub features: Tensor<B>,
    pub labels: Tensor<B>,
}

impl<B: Backend> Batch<B> {
    /// Number of samples in this batch.
    pub fn len(&self) -> usize {
        self.labels.elem_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration for a [`BatchLoader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of samples per batch.
    pub batch_size: usize,
    /// Number of background worker threads (0 = collate inline).
    pub num_workers: usize,
    /// How many batches each worker may run ahead of the consumer.
    pub prefetch_factor: usize,
    /// DType of the feature tensors (labels are always I64).
    pub dtype: DType,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            num_workers: 0,
            prefetch_factor: 2,
            dtype: DType::F32,
        }
    }
}

impl LoaderConfig {
    pub fn with_batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }
    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }
    pub fn with_prefetch_factor(mut self, pf: usize) -> Self {
        self.prefetch_factor = pf;
        self
    }
    pub fn with_dtype(mut self, d: DType) -> Self {
        self.dtype = d;
        self
    }
}

/// The seam the trainer and evaluator consume batches through.
///
/// A pass is finite, restartable, and covers the provider's subset exactly
/// once: no index is duplicated or dropped, the final batch may be short,
/// and delivery order equals sampler order regardless of worker count.
pub trait BatchProvider<B: Backend> {
    /// Iterate one epoch of batches.
    #[allow(clippy::type_complexity)]
    fn pass(&self, epoch: usize) -> Result<Box<dyn Iterator<Item = Result<Batch<B>>> + '_>>;

    /// Number of batches a pass yields.
    fn num_batches(&self) -> usize;
}

/// Serves batches of a dataset subset in sampler order.
pub struct BatchLoader<B: Backend> {
    dataset: Arc<dyn Dataset>,
    sampler: Box<dyn Sampler>,
    device: B::Device,
    config: LoaderConfig,
}

impl<B: Backend> BatchLoader<B> {
    /// Create a new loader over `dataset`, visiting the sampler's subset.
    pub fn new(
        dataset: Arc<dyn Dataset>,
        sampler: Box<dyn Sampler>,
        device: B::Device,
        config: LoaderConfig,
    ) -> Self {
        Self {
            dataset,
            sampler,
            device,
            config,
        }
    }

    /// Number of batches per pass.
    pub fn num_batches(&self) -> usize {
        self.sampler.len().div_ceil(self.config.batch_size)
    }

    /// Number of samples in the subset this loader serves.
    pub fn num_samples(&self) -> usize {
        self.sampler.len()
    }

    /// Start one epoch. Batches arrive in the sampler's order for `epoch`.
    #[allow(clippy::type_complexity)]
    pub fn pass(&self, epoch: usize) -> Result<Box<dyn Iterator<Item = Result<Batch<B>>> + '_>> {
        let order = self.sampler.order(epoch);
        let ranges: Vec<Vec<usize>> = order
            .chunks(self.config.batch_size)
            .map(|c| c.to_vec())
            .collect();

        if self.config.num_workers == 0 {
            let dataset = self.dataset.clone();
            let device = self.device.clone();
            let dtype = self.config.dtype;
            let iter = ranges.into_iter().map(move |indices| {
                let samples = fetch_samples(&*dataset, &indices);
                collate::<B>(&samples, dtype, &device)
            });
            Ok(Box::new(iter))
        } else {
            Ok(Box::new(self.spawn_pass(ranges)))
        }
    }

    /// Spawn the worker pool for one epoch and return the reordering
    /// consumer iterator.
    fn spawn_pass(&self, ranges: Vec<Vec<usize>>) -> OrderedPrefetch<B> {
        let workers = self.config.num_workers;
        let capacity = self.config.prefetch_factor * workers;
        let num_batches = ranges.len();

        let (tx, rx) = mpsc::sync_channel::<(usize, Result<Batch<B>>)>(capacity);

        // Shared work queue: each worker pops the next (index, range) job
        let jobs: Vec<(usize, Vec<usize>)> = ranges.into_iter().enumerate().collect();
        let queue = Arc::new(Mutex::new(jobs.into_iter()));

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let queue = queue.clone();
            let tx = tx.clone();
            let dataset = self.dataset.clone();
            let device = self.device.clone();
            let dtype = self.config.dtype;

            let handle = thread::spawn(move || loop {
                let job = {
                    let mut q = queue.lock().unwrap();
                    q.next()
                };
                let (batch_idx, indices) = match job {
                    Some(j) => j,
                    None => break,
                };

                let samples = fetch_samples(&*dataset, &indices);
                let result = collate::<B>(&samples, dtype, &device);

                // Consumer gone — stop quietly
                if tx.send((batch_idx, result)).is_err() {
                    break;
                }
            });
            handles.push(handle);
        }

        // Close our copy so the channel ends when the workers finish
        drop(tx);

        OrderedPrefetch {
            rx: Some(rx),
            handles: Some(handles),
            pending: HashMap::new(),
            next_idx: 0,
            remaining: num_batches,
        }
    }
}

impl<B: Backend> BatchProvider<B> for BatchLoader<B> {
    fn pass(&self, epoch: usize) -> Result<Box<dyn Iterator<Item = Result<Batch<B>>> + '_>> {
        BatchLoader::pass(self, epoch)
    }

    fn num_batches(&self) -> usize {
        BatchLoader::num_batches(self)
    }
}

/// Consumer side of a worker pass.
///
/// Workers finish in whatever order they finish; this iterator buffers
/// out-of-order arrivals and releases batch 0, 1, 2, ... strictly.
pub struct OrderedPrefetch<B: Backend> {
    rx: Option<mpsc::Receiver<(usize, Result<Batch<B>>)>>,
    handles: Option<Vec<thread::JoinHandle<()>>>,
    pending: HashMap<usize, Result<Batch<B>>>,
    next_idx: usize,
    remaining: usize,
}

impl<B: Backend> Iterator for OrderedPrefetch<B> {
    type Item = Result<Batch<B>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == 0 {
                return None;
            }
            if let Some(result) = self.pending.remove(&self.next_idx) {
                self.next_idx += 1;
                self.remaining -= 1;
                return Some(result);
            }
            let rx = self.rx.as_ref()?;
            match rx.recv() {
                Ok((idx, result)) => {
                    self.pending.insert(idx, result);
                }
                Err(_) => {
                    // Channel closed early — workers are gone
                    self.remaining = 0;
                    return None;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<B: Backend> ExactSizeIterator for OrderedPrefetch<B> {}

impl<B: Backend> Drop for OrderedPrefetch<B> {
    fn drop(&mut self) {
        // Closing the receiver makes any blocked send fail, so the workers
        // wind down even if the pass was abandoned mid-epoch.
        drop(self.rx.take());
        if let Some(handles) = self.handles.take() {
            for h in handles {
                let _ = h.join();
            }
        }
    }
}

fn fetch_samples(dataset: &dyn Dataset, indices: &[usize]) -> Vec<Sample> {
    indices.iter().map(|&i| dataset.get(i)).collect()
}

/// Stack samples into one [`Batch`]: features `[n, ...feature_shape]`,
/// labels `[n]` I64.
fn collate<B: Backend>(samples: &[Sample], dtype: DType, device: &B::Device) -> Result<Batch<B>> {
    let n = samples.len();
    if n == 0 {
        return Err(Error::msg("cannot collate an empty batch"));
    }

    let feat_shape = &samples[0].feature_shape;
    let feat_len: usize = feat_shape.iter().product();
    let mut features = Vec::with_capacity(n * feat_len);
    let mut labels = Vec::with_capacity(n);

    for s in samples {
        features.extend_from_slice(&s.features);
        let tgt_len: usize = s.target_shape.iter().product();
        if tgt_len != 1 {
            return Err(Error::msg(format!(
                "classification batches need one label per sample, got target shape {:?}",
                s.target_shape
            )));
        }
        labels.push(s.target[0]);
    }

    let mut batch_shape = vec![n];
    batch_shape.extend_from_slice(feat_shape);

    let features = Tensor::<B>::from_f64_slice(&features, batch_shape, dtype, device)?;
    let labels = Tensor::<B>::from_f64_slice(&labels, n, DType::I64, device)?;

    Ok(Batch { features, labels })
}
