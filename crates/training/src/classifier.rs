//! Fit, evaluate and predict for [`SpectralDenseNet`] on patch sets.

use crate::metrics::argmax_rows;
use burn::module::{AutodiffModule, Module};
use burn::optim::{AdamConfig, GradientsParams, Optimizer, RmsPropConfig};
use burn::record::{BinFileRecorder, FullPrecisionSettings, RecorderError};
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use data_contracts::OptimizerKind;
use models::{SpectralDenseNet, SpectralDenseNetConfig};
use ndarray::{Array2, ArrayView4, Axis};
use patch_dataset::{to_model_input, BatchIter, PatchSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FitConfig {
    pub batch_size: usize,
    pub epochs: usize,
    /// Epochs without validation-loss improvement before stopping.
    pub patience: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
    /// Base seed for the per-epoch shuffle.
    pub seed: u64,
    /// Written each time validation loss improves.
    pub checkpoint: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f32,
    pub val_loss: f32,
    pub val_accuracy: f32,
}

pub struct FitOutcome<B: AutodiffBackend> {
    /// Weights from the epoch with the lowest validation loss.
    pub model: SpectralDenseNet<B>,
    pub best_epoch: usize,
    pub best_val_loss: f32,
    pub epochs_run: usize,
    pub history: Vec<EpochStats>,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
    /// 0-based predicted class per row, in set order.
    pub predictions: Vec<usize>,
}

/// Mean categorical cross-entropy of `logits` against one-hot `targets`.
pub fn categorical_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    (targets * log_softmax(logits, 1)).sum_dim(1).neg().mean()
}

fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> anyhow::Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("failed to read tensor data: {e:?}"))
}

pub fn fit<B: AutodiffBackend>(
    model: SpectralDenseNet<B>,
    train: &PatchSet,
    validation: &PatchSet,
    cfg: &FitConfig,
    device: &B::Device,
) -> anyhow::Result<FitOutcome<B>> {
    match cfg.optimizer {
        OptimizerKind::RmsProp => {
            let optim = RmsPropConfig::new().with_alpha(0.9).with_epsilon(1e-7).init();
            fit_with(model, optim, train, validation, cfg, device)
        }
        OptimizerKind::Adam => fit_with(model, AdamConfig::new().init(), train, validation, cfg, device),
    }
}

fn fit_with<B, O>(
    mut model: SpectralDenseNet<B>,
    mut optim: O,
    train: &PatchSet,
    validation: &PatchSet,
    cfg: &FitConfig,
    device: &B::Device,
) -> anyhow::Result<FitOutcome<B>>
where
    B: AutodiffBackend,
    O: Optimizer<SpectralDenseNet<B>, B>,
{
    if train.is_empty() {
        anyhow::bail!("training set is empty");
    }
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    if let Some(dir) = cfg.checkpoint.as_deref().and_then(Path::parent) {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let mut best: Option<SpectralDenseNet<B>> = None;
    let mut best_val_loss = f32::INFINITY;
    let mut best_epoch = 0;
    let mut wait = 0;
    let mut history = Vec::with_capacity(cfg.epochs);

    for epoch in 0..cfg.epochs {
        let mut iter = BatchIter::shuffled(train, cfg.batch_size, cfg.seed.wrapping_add(epoch as u64));
        let mut loss_sum = 0f32;
        let mut seen = 0usize;
        while let Some(batch) = iter.next_batch::<B>(device) {
            let n = batch.classes.len();
            let logits = model.forward(batch.patches);
            let loss = categorical_cross_entropy(logits, batch.targets);
            let loss_val = to_host(loss.clone().detach())?.first().copied().unwrap_or(f32::NAN);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.learning_rate, model, grads);
            loss_sum += loss_val * n as f32;
            seen += n;
        }
        let train_loss = loss_sum / seen.max(1) as f32;

        let val = evaluate(&model.valid(), validation, cfg.batch_size, device)?;
        log::info!(
            "epoch {epoch}: train loss {train_loss:.4}, val loss {:.4}, val acc {:.4}",
            val.loss,
            val.accuracy
        );
        history.push(EpochStats {
            epoch,
            train_loss,
            val_loss: val.loss,
            val_accuracy: val.accuracy,
        });

        if val.loss < best_val_loss {
            best_val_loss = val.loss;
            best_epoch = epoch;
            wait = 0;
            if let Some(path) = &cfg.checkpoint {
                model
                    .clone()
                    .save_file(path.clone(), &recorder)
                    .map_err(|e| anyhow::anyhow!("failed to save checkpoint {}: {e}", path.display()))?;
                log::info!("val loss improved to {best_val_loss:.4}; saved {}", path.display());
            }
            best = Some(model.clone());
        } else {
            wait += 1;
            if wait >= cfg.patience {
                log::warn!(
                    "early stop at epoch {epoch}: no val loss improvement for {wait} epochs"
                );
                break;
            }
        }
    }

    Ok(FitOutcome {
        model: best.unwrap_or(model),
        best_epoch,
        best_val_loss,
        epochs_run: history.len(),
        history,
    })
}

/// Mean loss and accuracy of `model` over `set`, plus per-row predictions.
pub fn evaluate<B: Backend>(
    model: &SpectralDenseNet<B>,
    set: &PatchSet,
    batch_size: usize,
    device: &B::Device,
) -> anyhow::Result<Evaluation> {
    let k = set.num_classes();
    let mut iter = BatchIter::new(set, batch_size);
    let mut loss_sum = 0f32;
    let mut predictions = Vec::with_capacity(set.len());
    while let Some(batch) = iter.next_batch::<B>(device) {
        let n = batch.classes.len();
        let logits = model.forward(batch.patches);
        let loss = categorical_cross_entropy(logits.clone(), batch.targets);
        loss_sum += to_host(loss)?.first().copied().unwrap_or(f32::NAN) * n as f32;
        predictions.extend(argmax_rows(&to_host(logits)?, k));
    }
    let n = set.len();
    let correct = predictions
        .iter()
        .zip(&set.classes)
        .filter(|(p, t)| p == t)
        .count();
    let (loss, accuracy) = if n == 0 {
        (f32::NAN, f32::NAN)
    } else {
        (loss_sum / n as f32, correct as f32 / n as f32)
    };
    Ok(Evaluation {
        loss,
        accuracy,
        predictions,
    })
}

/// Class probabilities `(N, K)` for `(N, R, C, B)` patches, run in chunks of `batch_size`.
pub fn predict<B: Backend>(
    model: &SpectralDenseNet<B>,
    patches: ArrayView4<'_, f32>,
    batch_size: usize,
    device: &B::Device,
) -> anyhow::Result<Array2<f32>> {
    let n = patches.len_of(Axis(0));
    let k = model.num_classes();
    let mut probs = Vec::with_capacity(n * k);
    for chunk in patches.axis_chunks_iter(Axis(0), batch_size.max(1)) {
        let input = to_model_input::<B>(chunk, device);
        probs.extend(to_host(model.predict_proba(input))?);
    }
    Ok(Array2::from_shape_vec((n, k), probs)?)
}

/// Argmax of [`predict`].
pub fn predict_classes<B: Backend>(
    model: &SpectralDenseNet<B>,
    patches: ArrayView4<'_, f32>,
    batch_size: usize,
    device: &B::Device,
) -> anyhow::Result<Vec<usize>> {
    let probs = predict(model, patches, batch_size, device)?;
    let k = probs.ncols();
    Ok(argmax_rows(&probs.into_raw_vec_and_offset().0, k))
}

pub fn load_from_checkpoint<B: Backend, P: AsRef<Path>>(
    cfg: &SpectralDenseNetConfig,
    path: P,
    device: &B::Device,
) -> Result<SpectralDenseNet<B>, RecorderError> {
    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    SpectralDenseNet::<B>::new(cfg, device).load_file(path.as_ref(), &recorder, device)
}
