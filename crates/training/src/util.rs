use burn::backend::Autodiff;
use burn::module::AutodiffModule;
use burn::tensor::backend::Backend;
use class_map::prelude::{colorize, mask_background, render, save_png, scatter, ColorTable};
use clap::{Parser, ValueEnum};
use cli_support::{ProfileArgs, RunOverrideArgs};
use data_contracts::DatasetProfile;
use ndarray::Array2;
use patch_dataset::{
    load_profile_arrays, standardize_bands, summarize_labels, BuildConfig, DatasetBuilder,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use crate::classifier::{evaluate, fit, load_from_checkpoint, predict_classes, FitConfig};
use crate::metrics::{ClassificationMetrics, ConfusionMatrix};
use crate::report::{ExperimentReport, IterationStats};
use crate::{SpectralDenseNet, SpectralDenseNetConfig, TrainBackend};

type ADBackend = Autodiff<TrainBackend>;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

#[derive(Parser, Debug)]
#[command(
    name = "train",
    about = "Train the 3-D DenseNet once per seed and report OA/AA/kappa"
)]
pub struct TrainArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
    #[command(flatten)]
    pub overrides: RunOverrideArgs,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
    /// Print the per-class split table and exit without training.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "classify",
    about = "Predict every pixel with a trained checkpoint and render a class map"
)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
    /// Backend to use (ndarray or wgpu if enabled).
    #[arg(long, value_enum, default_value_t = BackendKind::NdArray)]
    pub backend: BackendKind,
    /// Checkpoint path (defaults to the profile's best checkpoint for --iteration).
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    /// Iteration whose best checkpoint to load.
    #[arg(long, default_value_t = 1)]
    pub iteration: usize,
    /// Output PNG (defaults to the profile's map_path).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Paint unlabelled pixels black.
    #[arg(long, default_value_t = false)]
    pub mask_background: bool,
    /// Predict labelled pixels only; implies --mask-background.
    #[arg(long, default_value_t = false)]
    pub labelled_only: bool,
    /// Pixels materialized per prediction chunk.
    #[arg(long, default_value_t = 4096)]
    pub chunk: usize,
}

pub fn validate_backend_choice(kind: BackendKind) -> anyhow::Result<()> {
    let built_wgpu = cfg!(feature = "backend-wgpu");
    match (kind, built_wgpu) {
        (BackendKind::Wgpu, false) => {
            anyhow::bail!("backend-wgpu feature not enabled; rebuild with --features backend-wgpu or choose ndarray backend")
        }
        (BackendKind::NdArray, true) => {
            log::warn!("built with backend-wgpu; running on WGPU despite --backend nd-array");
        }
        _ => {}
    }
    Ok(())
}

pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    validate_backend_choice(args.backend)?;
    let mut profile = args.profile.load()?;
    args.overrides.apply(&mut profile);
    profile.validate()?;

    if args.dry_run {
        print!("{}", split_table(&profile)?);
        return Ok(());
    }
    let report = run_experiment(&profile)?;
    print!("{}", report.render_text());
    Ok(())
}

/// Load, optionally standardize, and wrap the profile's arrays in a builder.
fn prepare(profile: &DatasetProfile) -> anyhow::Result<(DatasetBuilder, Array2<u16>)> {
    let (mut cube, labels) = load_profile_arrays(profile)?;
    if profile.standardize {
        standardize_bands(&mut cube);
    }
    let summary = summarize_labels(labels.view());
    log::info!(
        "{}: {} labelled pixels in {} classes, {} background",
        profile.name,
        summary.labelled(),
        summary.num_classes(),
        summary.background
    );
    let empty = summary.empty_classes();
    if !empty.is_empty() {
        log::warn!("{}: labels {empty:?} have no pixels", profile.name);
    }
    let cfg = BuildConfig::new(profile.patch_length, profile.eval_fraction)
        .with_padding(profile.padding)
        .with_num_classes(profile.classes);
    let builder = DatasetBuilder::new(cube.view(), labels.view(), cfg)?;
    Ok((builder, labels))
}

/// Per-class split counts for the first seed, without materializing patches.
pub fn split_table(profile: &DatasetProfile) -> anyhow::Result<String> {
    let (builder, _) = prepare(profile)?;
    let seed = profile.seeds.first().copied().unwrap_or_default();
    let split = builder.split(&mut StdRng::seed_from_u64(seed))?;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} split (eval_fraction {}, seed {seed})",
        profile.name, profile.eval_fraction
    );
    let _ = writeln!(out, "{:>5} {:>8} {:>8} {:>8}", "class", "total", "train", "eval");
    for cs in &split.classes {
        let _ = writeln!(out, "{:>5} {:>8} {:>8} {:>8}", cs.class, cs.total, cs.train, cs.eval);
    }
    let _ = writeln!(
        out,
        "{:>5} {:>8} {:>8} {:>8}",
        "all",
        split.train.len() + split.eval.len(),
        split.train.len(),
        split.eval.len()
    );
    let eval = split.eval.len();
    if profile.val_size < eval {
        let _ = writeln!(
            out,
            "eval -> {} test + {} validation",
            eval - profile.val_size,
            profile.val_size
        );
    } else {
        let _ = writeln!(
            out,
            "val_size {} does not fit an eval set of {eval}",
            profile.val_size
        );
    }
    for d in &split.degenerate {
        let _ = writeln!(
            out,
            "degenerate: class {} has {} pixels, {} in eval",
            d.class, d.count, d.n_eval
        );
    }
    Ok(out)
}

/// One seeded train/test iteration per profile seed, then the report files.
pub fn run_experiment(profile: &DatasetProfile) -> anyhow::Result<ExperimentReport> {
    let (builder, _) = prepare(profile)?;
    let device = <ADBackend as Backend>::Device::default();
    let model_cfg = SpectralDenseNetConfig::for_input(profile.classes, profile.bands);
    let training = &profile.training;
    let mut report = ExperimentReport::new(profile.name.clone(), profile.classes);

    for (i, &seed) in profile.seeds.iter().enumerate() {
        let iteration = i + 1;
        log::info!(">>> iteration {iteration} (seed {seed})");
        let ds = builder.build(seed)?;
        let (test, validation) = ds.eval.split_tail(profile.val_size)?;
        log::info!(
            "train {} / validation {} / test {}",
            ds.train.len(),
            validation.len(),
            test.len()
        );

        <ADBackend as Backend>::seed(seed);
        let model = SpectralDenseNet::<ADBackend>::new(&model_cfg, &device);
        let fit_cfg = FitConfig {
            batch_size: training.batch_size,
            epochs: training.epochs,
            patience: training.patience,
            learning_rate: training.learning_rate,
            optimizer: training.optimizer,
            seed,
            checkpoint: Some(profile.output.checkpoint_path(&profile.name, iteration)),
        };

        let started = Instant::now();
        let outcome = fit(model, &ds.train, &validation, &fit_cfg, &device)?;
        let training_secs = started.elapsed().as_secs_f64();

        let model = outcome.model.valid();
        let started = Instant::now();
        let eval = evaluate(&model, &test, training.batch_size, &device)?;
        let testing_secs = started.elapsed().as_secs_f64();

        let cm = ConfusionMatrix::from_predictions(&eval.predictions, &test.classes, profile.classes)?;
        let metrics = ClassificationMetrics::from(&cm);
        log::info!(
            "<<< iteration {iteration}: OA {:.4}, AA {:.4}, kappa {:.4}, test loss {:.4}",
            metrics.overall_accuracy,
            metrics.average_accuracy,
            metrics.kappa,
            eval.loss
        );
        report.push(IterationStats {
            iteration,
            seed,
            metrics,
            test_loss: eval.loss,
            test_accuracy: eval.accuracy,
            best_epoch: outcome.best_epoch,
            epochs_run: outcome.epochs_run,
            training_secs,
            testing_secs,
        });
    }

    report.write_text(&profile.output.report_path)?;
    report.write_elements(&profile.output.element_report_path)?;
    report.write_json(&profile.output.summary_path)?;
    Ok(report)
}

#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub checkpoint: PathBuf,
    pub output: PathBuf,
    pub mask_background: bool,
    pub labelled_only: bool,
    pub chunk: usize,
}

pub fn run_classify(args: ClassifyArgs) -> anyhow::Result<PathBuf> {
    validate_backend_choice(args.backend)?;
    let profile = args.profile.load()?;
    let opts = ClassifyOptions {
        checkpoint: match args.checkpoint.clone() {
            Some(path) => path,
            None => existing_checkpoint(&profile, args.iteration).ok_or_else(|| {
                anyhow::anyhow!(
                    "no checkpoint for iteration {} in {}; train first or pass --checkpoint",
                    args.iteration,
                    profile.output.checkpoint_dir.display()
                )
            })?,
        },
        output: args
            .output
            .clone()
            .unwrap_or_else(|| profile.output.map_path.clone()),
        mask_background: args.mask_background,
        labelled_only: args.labelled_only,
        chunk: args.chunk,
    };
    classify_image(&profile, &opts)?;
    Ok(opts.output)
}

/// Predict pixels with a checkpoint and write the colorized map.
///
/// Returns 0-based predictions in flat pixel order.
pub fn classify_image(profile: &DatasetProfile, opts: &ClassifyOptions) -> anyhow::Result<Vec<usize>> {
    let table = ColorTable::from_optional(profile.palette.as_deref());
    table.validate(profile.classes)?;
    let (builder, labels) = prepare(profile)?;

    let device = <TrainBackend as Backend>::Device::default();
    let cfg = SpectralDenseNetConfig::for_input(profile.classes, profile.bands);
    let model = load_from_checkpoint::<TrainBackend, _>(&cfg, &opts.checkpoint, &device).map_err(|e| {
        anyhow::anyhow!("failed to load checkpoint {}: {e}", opts.checkpoint.display())
    })?;

    let pixels = profile.pixel_count();
    let indices: Vec<usize> = if opts.labelled_only {
        (0..pixels).filter(|&i| builder.labels()[i] > 0).collect()
    } else {
        (0..pixels).collect()
    };
    let mut predicted = Vec::with_capacity(indices.len());
    for chunk in indices.chunks(opts.chunk.max(1)) {
        let patches = builder.materialize(chunk)?;
        predicted.extend(predict_classes(
            &model,
            patches.view(),
            profile.training.batch_size,
            &device,
        )?);
        log::debug!("predicted {}/{} pixels", predicted.len(), indices.len());
    }

    let predictions = scatter(&indices, &predicted, pixels, 0)?;
    let mut rgb = colorize(&predictions, profile.rows, profile.cols, &table)?;
    if opts.mask_background || opts.labelled_only {
        mask_background(&mut rgb, labels.view())?;
    }
    save_png(&render(rgb.view(), profile.output.map_scale), &opts.output)?;
    Ok(predictions)
}

/// Best-checkpoint path for `iteration`, if it was written.
pub fn existing_checkpoint(profile: &DatasetProfile, iteration: usize) -> Option<PathBuf> {
    let path = profile.output.checkpoint_path(&profile.name, iteration);
    path.exists().then_some(path)
}
