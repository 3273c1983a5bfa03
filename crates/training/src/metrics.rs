//! Classification metrics over 0-based class predictions.

use serde::Serialize;

/// Square count matrix; rows are ground truth, columns are predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    classes: usize,
    counts: Vec<u64>,
}

impl ConfusionMatrix {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            counts: vec![0; classes * classes],
        }
    }

    /// Build from paired predictions and ground truth.
    pub fn from_predictions(
        predictions: &[usize],
        truth: &[usize],
        classes: usize,
    ) -> anyhow::Result<Self> {
        if predictions.len() != truth.len() {
            anyhow::bail!(
                "{} predictions for {} ground-truth labels",
                predictions.len(),
                truth.len()
            );
        }
        let mut cm = Self::new(classes);
        for (&p, &t) in predictions.iter().zip(truth) {
            if p >= classes || t >= classes {
                anyhow::bail!("class pair ({t}, {p}) outside 0..{classes}");
            }
            cm.counts[t * classes + p] += 1;
        }
        Ok(cm)
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u64 {
        self.counts[truth * self.classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn row_sum(&self, truth: usize) -> u64 {
        (0..self.classes).map(|p| self.get(truth, p)).sum()
    }

    fn col_sum(&self, predicted: usize) -> u64 {
        (0..self.classes).map(|t| self.get(t, predicted)).sum()
    }

    fn trace(&self) -> u64 {
        (0..self.classes).map(|k| self.get(k, k)).sum()
    }

    pub fn overall_accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return f64::NAN;
        }
        self.trace() as f64 / total as f64
    }

    /// Recall per class; `NaN` for a class with no ground-truth samples.
    pub fn per_class_accuracy(&self) -> Vec<f64> {
        (0..self.classes)
            .map(|k| {
                let row = self.row_sum(k);
                if row == 0 {
                    f64::NAN
                } else {
                    self.get(k, k) as f64 / row as f64
                }
            })
            .collect()
    }

    /// 0-based classes with no ground-truth samples.
    pub fn undefined_classes(&self) -> Vec<usize> {
        (0..self.classes).filter(|&k| self.row_sum(k) == 0).collect()
    }

    /// Mean of the defined per-class accuracies.
    ///
    /// Classes listed by [`Self::undefined_classes`] are excluded and logged.
    pub fn average_accuracy(&self) -> f64 {
        let undefined = self.undefined_classes();
        if !undefined.is_empty() {
            let ids: Vec<usize> = undefined.iter().map(|k| k + 1).collect();
            log::warn!("AA excludes classes {ids:?}: no test samples");
        }
        let defined: Vec<f64> = self
            .per_class_accuracy()
            .into_iter()
            .filter(|a| a.is_finite())
            .collect();
        if defined.is_empty() {
            return f64::NAN;
        }
        defined.iter().sum::<f64>() / defined.len() as f64
    }

    /// Cohen's kappa; `NaN` when expected agreement is 1.
    pub fn kappa(&self) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return f64::NAN;
        }
        let p_o = self.trace() as f64 / total;
        let p_e = (0..self.classes)
            .map(|k| self.row_sum(k) as f64 * self.col_sum(k) as f64)
            .sum::<f64>()
            / (total * total);
        if (1.0 - p_e).abs() < f64::EPSILON {
            return f64::NAN;
        }
        (p_o - p_e) / (1.0 - p_e)
    }

    /// Rows of counts, for reports.
    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.counts.chunks(self.classes.max(1)).map(<[u64]>::to_vec).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationMetrics {
    pub overall_accuracy: f64,
    pub average_accuracy: f64,
    pub kappa: f64,
    pub per_class: Vec<f64>,
    /// 0-based classes left out of `average_accuracy`.
    pub undefined_classes: Vec<usize>,
}

impl From<&ConfusionMatrix> for ClassificationMetrics {
    fn from(cm: &ConfusionMatrix) -> Self {
        Self {
            overall_accuracy: cm.overall_accuracy(),
            average_accuracy: cm.average_accuracy(),
            kappa: cm.kappa(),
            per_class: cm.per_class_accuracy(),
            undefined_classes: cm.undefined_classes(),
        }
    }
}

/// Index of the largest value in each row of a row-major `[n, k]` buffer.
pub fn argmax_rows(values: &[f32], k: usize) -> Vec<usize> {
    values
        .chunks(k.max(1))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 {
                        (i, v)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}
