// Trainer and evaluator tests through the facade prelude.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use aural::prelude::*;
use aural_core::Result as CoreResult;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

fn sample(features: Vec<f64>, feature_shape: Vec<usize>, label: f64) -> Sample {
    Sample {
        features,
        feature_shape,
        target: vec![label],
        target_shape: vec![1],
    }
}

fn seq_loader(
    dataset: Arc<VecDataset>,
    indices: Vec<usize>,
    batch_size: usize,
) -> BatchLoader<CpuBackend> {
    BatchLoader::new(
        dataset,
        Box::new(SubsetSequentialSampler::new(indices)),
        CpuDevice,
        LoaderConfig::default()
            .with_batch_size(batch_size)
            .with_dtype(DType::F64),
    )
}

/// Ignores its input and always scores the same rows.
struct FixedScores {
    scores: CpuTensor,
}

fn fixed_scores(rows: &[f64], n: usize) -> FixedScores {
    FixedScores {
        scores: CpuTensor::from_f64_slice(rows, (n, 2), DType::F64, &CpuDevice).unwrap(),
    }
}

impl Module<CpuBackend> for FixedScores {
    fn forward(&self, _x: &CpuTensor) -> CoreResult<CpuTensor> {
        Ok(self.scores.clone())
    }

    fn parameters(&self) -> Vec<CpuTensor> {
        Vec::new()
    }
}

/// Records the training flag it sees at every forward call.
struct ModeProbe {
    training: Cell<bool>,
    seen: RefCell<Vec<bool>>,
}

impl ModeProbe {
    fn new() -> Self {
        ModeProbe {
            training: Cell::new(true),
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Module<CpuBackend> for ModeProbe {
    fn forward(&self, x: &CpuTensor) -> CoreResult<CpuTensor> {
        self.seen.borrow_mut().push(self.training.get());
        CpuTensor::zeros((x.dims()[0], 2), DType::F64, &CpuDevice)
    }

    fn parameters(&self) -> Vec<CpuTensor> {
        Vec::new()
    }

    fn set_training(&self, training: bool) {
        self.training.set(training);
    }

    fn is_training(&self) -> bool {
        self.training.get()
    }
}

/// A linear head with identity weights, so scores equal the input features.
struct LinearProbe {
    head: Linear<CpuBackend>,
}

impl LinearProbe {
    fn identity() -> Self {
        let weight =
            CpuTensor::from_f64_slice(&[1.0, 0.0, 0.0, 1.0], (2, 2), DType::F64, &CpuDevice)
                .unwrap()
                .set_variable();
        LinearProbe {
            head: Linear::from_tensors(weight, None).unwrap(),
        }
    }
}

impl Module<CpuBackend> for LinearProbe {
    fn forward(&self, x: &CpuTensor) -> CoreResult<CpuTensor> {
        self.head.forward(x)
    }

    fn parameters(&self) -> Vec<CpuTensor> {
        self.head.parameters()
    }
}

/// Keeps every observation the trainer hands it.
#[derive(Default)]
struct Capture {
    batch_indices: Vec<usize>,
    avg_losses: Vec<f64>,
}

impl StepObserver<CpuBackend> for Capture {
    fn on_step(
        &mut self,
        batch_index: usize,
        avg_loss: f64,
        _params: &[CpuTensor],
        _grads: &GradStore<CpuBackend>,
    ) -> CoreResult<()> {
        self.batch_indices.push(batch_index);
        self.avg_losses.push(avg_loss);
        Ok(())
    }
}

// Evaluator

#[test]
fn test_evaluate_counts_hand_example() {
    let ds = Arc::new(VecDataset::new(
        vec![
            sample(vec![0.0], vec![1], 0.0),
            sample(vec![0.0], vec![1], 1.0),
            sample(vec![0.0], vec![1], 0.0),
        ],
        "hand",
    ));
    let loader = seq_loader(ds, vec![0, 1, 2], 3);
    // Row three ties; argmax picks class 0, which matches the label.
    let probe = fixed_scores(&[0.9, 0.1, 0.2, 0.8, 0.5, 0.5], 3);

    let report = evaluate(&probe, &loader, "train").unwrap();
    assert_eq!(
        report,
        AccuracyReport {
            num_correct: 3,
            num_samples: 3,
            accuracy: 1.0,
        }
    );
}

#[test]
fn test_evaluate_tie_prefers_lowest_index() {
    let ds = Arc::new(VecDataset::new(vec![sample(vec![0.0], vec![1], 1.0)], "tie"));
    let loader = seq_loader(ds, vec![0], 1);
    let probe = fixed_scores(&[0.5, 0.5], 1);

    let report = evaluate(&probe, &loader, "val").unwrap();
    assert_eq!(report.num_correct, 0);
    assert_eq!(report.num_samples, 1);
}

#[test]
fn test_evaluate_constant_model_reports_class_share() {
    let ds = Arc::new(VecDataset::new(
        vec![
            sample(vec![0.0], vec![1], 0.0),
            sample(vec![0.0], vec![1], 1.0),
            sample(vec![0.0], vec![1], 1.0),
            sample(vec![0.0], vec![1], 1.0),
        ],
        "share",
    ));
    let loader = seq_loader(ds, vec![0, 1, 2, 3], 4);
    // Always predicts class 0, so accuracy is the class-0 share.
    let probe = fixed_scores(&[5.0, 0.0, 5.0, 0.0, 5.0, 0.0, 5.0, 0.0], 4);

    let report = evaluate(&probe, &loader, "val").unwrap();
    assert_eq!(report.num_correct, 1);
    assert_eq!(report.num_samples, 4);
    assert!(approx_eq(report.accuracy, 0.25, 1e-12));
}

#[test]
fn test_evaluate_empty_subset_errors() {
    let ds = Arc::new(VecDataset::new(
        vec![sample(vec![0.0], vec![1], 0.0)],
        "empty",
    ));
    let loader = seq_loader(ds, vec![], 4);
    let probe = fixed_scores(&[1.0, 0.0], 1);

    let err = evaluate(&probe, &loader, "val").unwrap_err();
    match err {
        Error::EmptySubset { subset } => assert_eq!(subset, "val"),
        other => panic!("expected EmptySubset, got {other:?}"),
    }
}

// Gradient diagnostics

#[test]
fn test_gradient_magnitude_sums_nonzero_grads() {
    let p1 = CpuTensor::from_f64_slice(&[1.0, 1.0], 2, DType::F64, &CpuDevice)
        .unwrap()
        .set_variable();
    let p2 = CpuTensor::from_f64_slice(&[1.0, 1.0], 2, DType::F64, &CpuDevice)
        .unwrap()
        .set_variable();
    let p3 = CpuTensor::from_f64_slice(&[1.0], 1, DType::F64, &CpuDevice)
        .unwrap()
        .set_variable();
    let params = vec![p1.clone(), p2.clone(), p3.clone()];

    let mut grads = GradStore::new();
    grads
        .accumulate(
            p1.id(),
            CpuTensor::from_f64_slice(&[1.5, -0.5], 2, DType::F64, &CpuDevice).unwrap(),
        )
        .unwrap();
    grads
        .accumulate(
            p2.id(),
            CpuTensor::from_f64_slice(&[2.0, -2.0], 2, DType::F64, &CpuDevice).unwrap(),
        )
        .unwrap();

    // p2's gradient sums to zero and p3 has none; only p1 contributes.
    let mag = gradient_magnitude(&params, &grads).unwrap();
    assert!(approx_eq(mag, 1.0, 1e-12), "got {mag}");

    grads
        .accumulate(
            p3.id(),
            CpuTensor::from_f64_slice(&[-3.0], 1, DType::F64, &CpuDevice).unwrap(),
        )
        .unwrap();
    let mag = gradient_magnitude(&params, &grads).unwrap();
    assert!(approx_eq(mag, 4.0, 1e-12), "got {mag}");
}

#[test]
#[should_panic]
fn test_printer_rejects_zero_period() {
    let _ = GradMagnitudePrinter::new(0);
}

#[test]
fn test_printer_runs_on_and_off_period() {
    let mut printer = GradMagnitudePrinter::new(2);
    let grads = GradStore::new();
    <GradMagnitudePrinter as StepObserver<CpuBackend>>::on_step(&mut printer, 1, 0.5, &[], &grads)
        .unwrap();
    <GradMagnitudePrinter as StepObserver<CpuBackend>>::on_step(&mut printer, 2, 0.5, &[], &grads)
        .unwrap();
}

// Training loop

#[test]
fn test_observer_running_average_matches_hand_losses() {
    // Identity head: the score rows are the feature rows themselves.
    let ds = Arc::new(VecDataset::new(
        vec![
            sample(vec![2.0, 0.0], vec![2], 0.0),
            sample(vec![0.0, 3.0], vec![2], 1.0),
            sample(vec![2.0, 0.0], vec![2], 0.0),
            sample(vec![0.0, 3.0], vec![2], 0.0),
        ],
        "loss-probe",
    ));
    let train_loader = seq_loader(ds.clone(), vec![0, 1, 2, 3], 2);
    let val_loader = seq_loader(ds, vec![0, 1], 2);

    let probe = LinearProbe::identity();
    // Zero learning rate keeps the scores constant across batches.
    let mut optimizer = Adam::new(probe.parameters(), 0.0);
    let mut capture = Capture::default();

    let report = train(
        &probe,
        cross_entropy_loss,
        &mut optimizer,
        &train_loader,
        &val_loader,
        1,
        &mut capture,
    )
    .unwrap();

    let batch1 = ((1.0_f64 + (-2.0_f64).exp()).ln() + (1.0_f64 + (-3.0_f64).exp()).ln()) / 2.0;
    let batch2 = ((1.0_f64 + (-2.0_f64).exp()).ln() + (1.0_f64 + 3.0_f64.exp()).ln()) / 2.0;

    assert_eq!(capture.batch_indices, vec![1, 2]);
    assert!(approx_eq(capture.avg_losses[0], batch1, 1e-9));
    assert!(approx_eq(capture.avg_losses[1], (batch1 + batch2) / 2.0, 1e-9));

    assert_eq!(report.epoch_losses.len(), 1);
    assert!(approx_eq(report.epoch_losses[0], (batch1 + batch2) / 2.0, 1e-9));

    // Sample four scores [0, 3] against label 0; everything else matches.
    assert_eq!(
        report.final_train,
        AccuracyReport {
            num_correct: 3,
            num_samples: 4,
            accuracy: 0.75,
        }
    );
    assert_eq!(
        report.final_val,
        AccuracyReport {
            num_correct: 2,
            num_samples: 2,
            accuracy: 1.0,
        }
    );
}

#[test]
fn test_training_mode_restored_each_epoch() {
    let ds = Arc::new(VecDataset::new(
        vec![
            sample(vec![0.0], vec![1], 0.0),
            sample(vec![0.0], vec![1], 1.0),
            sample(vec![0.0], vec![1], 0.0),
            sample(vec![0.0], vec![1], 1.0),
        ],
        "mode-probe",
    ));
    let train_loader = seq_loader(ds.clone(), vec![0, 1, 2, 3], 2);
    let val_loader = seq_loader(ds, vec![0, 1], 2);

    let probe = ModeProbe::new();
    let mut optimizer = Adam::new(probe.parameters(), 1e-3);
    let mut printer = GradMagnitudePrinter::default();

    let report = train(
        &probe,
        cross_entropy_loss,
        &mut optimizer,
        &train_loader,
        &val_loader,
        2,
        &mut printer,
    )
    .unwrap();

    // Per epoch: two training-pass forwards, then three eval forwards
    // (train subset twice, val once). The final evaluation adds three more.
    let expected = vec![
        true, true, false, false, false, // epoch 1
        true, true, false, false, false, // epoch 2
        false, false, false, // final evaluation
    ];
    assert_eq!(*probe.seen.borrow(), expected);

    // Uniform zero scores price every sample at ln 2.
    assert_eq!(report.epoch_losses.len(), 2);
    for loss in &report.epoch_losses {
        assert!(approx_eq(*loss, std::f64::consts::LN_2, 1e-12));
    }
}

#[test]
fn test_end_to_end_training_run() {
    // Twenty clips, ten per class, with the class baked into the features.
    let mut samples = Vec::new();
    for i in 0..20 {
        let x = i as f64 * 0.1;
        let y = if i < 10 { 0.0 } else { 1.0 };
        samples.push(sample(vec![x, y, x, y, x, y], vec![3, 2], y));
    }
    let ds = Arc::new(VecDataset::new(samples, "clips"));

    let (train_idx, val_idx) = split_indices(20, 16, Some(4), false, None).unwrap();
    assert_eq!(train_idx, (0..16).collect::<Vec<_>>());
    assert_eq!(val_idx, vec![16, 17, 18, 19]);

    let train_loader = BatchLoader::<CpuBackend>::new(
        ds.clone(),
        Box::new(SubsetRandomSampler::with_seed(train_idx, 7)),
        CpuDevice,
        LoaderConfig::default()
            .with_batch_size(4)
            .with_num_workers(3)
            .with_dtype(DType::F32),
    );
    let val_loader = BatchLoader::<CpuBackend>::new(
        ds,
        Box::new(SubsetRandomSampler::with_seed(val_idx, 7)),
        CpuDevice,
        LoaderConfig::default()
            .with_batch_size(4)
            .with_num_workers(1)
            .with_dtype(DType::F32),
    );
    assert_eq!(train_loader.num_batches(), 4);

    let model = AudioRnnClassifier::new(2, 8, 2, 0.5, &CpuDevice).unwrap();
    let mut optimizer = Adam::new(model.parameters(), 1e-2);
    let mut capture = Capture::default();

    let report = train(
        &model,
        cross_entropy_loss,
        &mut optimizer,
        &train_loader,
        &val_loader,
        2,
        &mut capture,
    )
    .unwrap();

    assert_eq!(capture.batch_indices, vec![1, 2, 3, 4, 1, 2, 3, 4]);
    assert_eq!(report.epoch_losses.len(), 2);
    for loss in &report.epoch_losses {
        assert!(loss.is_finite() && *loss > 0.0, "loss {loss}");
    }

    assert_eq!(report.final_train.num_samples, 16);
    assert_eq!(report.final_val.num_samples, 4);
    assert!(report.final_train.num_correct <= 16);
    assert!((0.0..=1.0).contains(&report.final_train.accuracy));
    assert!((0.0..=1.0).contains(&report.final_val.accuracy));
}
