//! Class-stratified train/eval splitting of labelled pixels.

use crate::types::{DatasetResult, PatchDatasetError};
use ndarray::ArrayView2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Per-class sample counts of one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassSplit {
    /// Stored (1-based) label.
    pub class: u16,
    pub total: usize,
    pub train: usize,
    pub eval: usize,
}

/// A class that contributes nothing to the eval set under the current fraction.
///
/// Non-fatal: the split proceeds, but per-class metrics for this class are undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DegenerateClass {
    pub class: u16,
    pub count: usize,
    pub n_eval: usize,
}

#[derive(Debug, Clone)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
    /// One entry per class 1..=K, in class order.
    pub classes: Vec<ClassSplit>,
    pub degenerate: Vec<DegenerateClass>,
}

impl StratifiedSplit {
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Split flat label values (row-major, 0 = background) into train/eval indices.
///
/// Each class is shuffled, its last `floor(eval_fraction * count)` entries go to
/// eval and the rest to train; the merged sequences are then shuffled again,
/// train first. All randomness comes from `rng`.
pub fn split_stratified<R: Rng + ?Sized>(
    eval_fraction: f64,
    labels: &[u16],
    rng: &mut R,
) -> DatasetResult<StratifiedSplit> {
    if eval_fraction.is_nan() || eval_fraction <= 0.0 || eval_fraction >= 1.0 {
        return Err(PatchDatasetError::Configuration(format!(
            "eval_fraction must lie in (0, 1), got {eval_fraction}"
        )));
    }
    let max_label = labels.iter().copied().max().unwrap_or(0);
    if max_label == 0 {
        return Err(PatchDatasetError::Configuration(
            "label map contains no labelled pixels".to_string(),
        ));
    }

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); max_label as usize];
    for (i, &label) in labels.iter().enumerate() {
        if label > 0 {
            by_class[label as usize - 1].push(i);
        }
    }

    let mut train = Vec::new();
    let mut eval = Vec::new();
    let mut classes = Vec::with_capacity(by_class.len());
    let mut degenerate = Vec::new();
    for (k, mut indices) in by_class.into_iter().enumerate() {
        let class = (k + 1) as u16;
        indices.shuffle(rng);
        let count = indices.len();
        let n_eval = (eval_fraction * count as f64).floor() as usize;
        let cut = count - n_eval;
        train.extend_from_slice(&indices[..cut]);
        eval.extend_from_slice(&indices[cut..]);
        if n_eval == 0 {
            log::warn!(
                "class {class} has {count} samples; none go to the eval set at fraction {eval_fraction}"
            );
            degenerate.push(DegenerateClass {
                class,
                count,
                n_eval,
            });
        }
        classes.push(ClassSplit {
            class,
            total: count,
            train: cut,
            eval: n_eval,
        });
    }

    train.shuffle(rng);
    eval.shuffle(rng);

    Ok(StratifiedSplit {
        train,
        eval,
        classes,
        degenerate,
    })
}

/// [`split_stratified`] over a 2-D label map, flattened row-major.
pub fn split_label_map<R: Rng + ?Sized>(
    eval_fraction: f64,
    labels: ArrayView2<'_, u16>,
    rng: &mut R,
) -> DatasetResult<StratifiedSplit> {
    let flat: Vec<u16> = labels.iter().copied().collect();
    split_stratified(eval_fraction, &flat, rng)
}
