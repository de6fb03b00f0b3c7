// Train the recurrent audio-clip classifier from the command line.
//
// Usage:
//   aural-train --feats features.json --labels labels.json
//   aural-train --e 20 --bs 32 --lr 0.0005

use std::sync::Arc;

use aural::prelude::*;

const DROPOUT: f64 = 0.5;

fn parse_args() -> Config {
    let mut config = Config::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--feats" => {
                i += 1;
                config.features_path = args[i].clone();
            }
            "--labels" => {
                i += 1;
                config.labels_path = args[i].clone();
            }
            "--length" => {
                i += 1;
                config.max_length = args[i].parse().expect("invalid --length");
            }
            "--bs" => {
                i += 1;
                config.batch_size = args[i].parse().expect("invalid --bs");
            }
            "--e" => {
                i += 1;
                config.epochs = args[i].parse().expect("invalid --e");
            }
            "--nt" => {
                i += 1;
                config.num_train = args[i].parse().expect("invalid --nt");
            }
            "--nv" => {
                i += 1;
                config.num_val = Some(args[i].parse().expect("invalid --nv"));
            }
            "--hs" => {
                i += 1;
                config.hidden_size = args[i].parse().expect("invalid --hs");
            }
            "--lr" => {
                i += 1;
                config.lr = args[i].parse().expect("invalid --lr");
            }
            "--pe" => {
                i += 1;
                config.print_every = Some(args[i].parse().expect("invalid --pe"));
            }
            "--gpu" => {
                config.use_gpu = true;
            }
            "--help" | "-h" => {
                println!("Train the recurrent audio-clip classifier");
                println!();
                println!("Options:");
                println!("  --feats <path>   Feature JSON file");
                println!("  --labels <path>  Label JSON file");
                println!("  --length <n>     Frames per clip after pad/truncate (default: 300)");
                println!("  --bs <n>         Batch size (default: 20)");
                println!("  --e <n>          Number of training epochs (default: 10)");
                println!("  --nt <n>         Training subset size (default: 100)");
                println!("  --nv <n>         Validation subset size (default: all remaining)");
                println!("  --hs <n>         RNN hidden state size (default: 100)");
                println!("  --lr <f>         Learning rate (default: 0.001)");
                println!("  --pe <n>         Training diagnostic period (default: 10)");
                println!("  --gpu            Train on the GPU (not supported by this build)");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    config
}

fn print_distribution(title: &str, counts: &[usize]) {
    println!("--- {title} Label Distribution ---");
    for (class, count) in counts.iter().enumerate() {
        println!("{class} : {count}");
    }
}

fn main() -> aural::Result<()> {
    let config = parse_args();
    config.validate()?;
    println!("{config}");

    let dataset = Arc::new(AudioDataset::from_json_files(
        &config.features_path,
        &config.labels_path,
        config.max_length,
    )?);
    let feature_dim = dataset.feature_shape()[1];

    let (train_idx, val_idx) =
        split_indices(dataset.len(), config.num_train, config.num_val, true, None)?;
    print_distribution(
        "Training",
        &label_distribution(dataset.as_ref(), &train_idx, config.num_classes)?,
    );
    print_distribution(
        "Val",
        &label_distribution(dataset.as_ref(), &val_idx, config.num_classes)?,
    );

    let model = AudioRnnClassifier::new(
        feature_dim,
        config.hidden_size,
        config.num_classes,
        DROPOUT,
        &CpuDevice,
    )?;

    let train_loader = BatchLoader::<CpuBackend>::new(
        dataset.clone(),
        Box::new(SubsetRandomSampler::new(train_idx)),
        CpuDevice,
        LoaderConfig::default()
            .with_batch_size(config.batch_size)
            .with_num_workers(3)
            .with_dtype(config.dtype),
    );
    let val_loader = BatchLoader::<CpuBackend>::new(
        dataset,
        Box::new(SubsetRandomSampler::new(val_idx)),
        CpuDevice,
        LoaderConfig::default()
            .with_batch_size(config.batch_size)
            .with_num_workers(1)
            .with_dtype(config.dtype),
    );

    let mut optimizer = Adam::new(model.parameters(), config.lr);
    let mut printer = GradMagnitudePrinter::new(config.print_every.unwrap_or(10));

    train(
        &model,
        cross_entropy_loss,
        &mut optimizer,
        &train_loader,
        &val_loader,
        config.epochs,
        &mut printer,
    )?;

    Ok(())
}
