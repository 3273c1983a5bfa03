//! Per-iteration statistics and the report files written after a run.

use crate::metrics::ClassificationMetrics;
use anyhow::Context;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct IterationStats {
    pub iteration: usize,
    pub seed: u64,
    pub metrics: ClassificationMetrics,
    pub test_loss: f32,
    pub test_accuracy: f32,
    pub best_epoch: usize,
    pub epochs_run: usize,
    pub training_secs: f64,
    pub testing_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub name: String,
    pub classes: usize,
    pub iterations: Vec<IterationStats>,
}

/// Mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn list(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

impl ExperimentReport {
    pub fn new(name: impl Into<String>, classes: usize) -> Self {
        Self {
            name: name.into(),
            classes,
            iterations: Vec::new(),
        }
    }

    pub fn push(&mut self, stats: IterationStats) {
        self.iterations.push(stats);
    }

    fn column(&self, f: impl Fn(&IterationStats) -> f64) -> Vec<f64> {
        self.iterations.iter().map(f).collect()
    }

    /// Per-class accuracy across iterations; absent classes stay `NaN`.
    fn class_column(&self, class: usize) -> Vec<f64> {
        self.column(|s| s.metrics.per_class.get(class).copied().unwrap_or(f64::NAN))
    }

    pub fn render_text(&self) -> String {
        let kappa = self.column(|s| s.metrics.kappa);
        let oa = self.column(|s| s.metrics.overall_accuracy);
        let aa = self.column(|s| s.metrics.average_accuracy);
        let train = self.column(|s| s.training_secs);
        let test = self.column(|s| s.testing_secs);

        let mut out = String::new();
        let _ = writeln!(out, "{} ({} iterations)", self.name, self.iterations.len());
        let seeds: Vec<u64> = self.iterations.iter().map(|s| s.seed).collect();
        let _ = writeln!(out, "seeds: {seeds:?}");
        let _ = writeln!(out, "KAPPA: {}", list(&kappa));
        let _ = writeln!(out, "OA: {}", list(&oa));
        let _ = writeln!(out, "AA: {}", list(&aa));
        for it in self.iterations.iter().filter(|s| !s.metrics.undefined_classes.is_empty()) {
            let ids: Vec<usize> = it.metrics.undefined_classes.iter().map(|k| k + 1).collect();
            let _ = writeln!(out, "AA of iteration {} excludes classes {ids:?}", it.iteration);
        }
        let _ = writeln!(out, "TRAINING TIME: {}", list(&train));
        let _ = writeln!(out, "TESTING TIME: {}", list(&test));
        let _ = writeln!(out);
        for (label, values) in [
            ("KAPPA", &kappa),
            ("OA", &oa),
            ("AA", &aa),
            ("TRAINING TIME", &train),
            ("TESTING TIME", &test),
        ] {
            let (m, s) = mean_std(values);
            let _ = writeln!(out, "{label} mean: {m:.4} +- {s:.4}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Mean of all elements in confusion matrix:");
        for k in 0..self.classes {
            let (m, s) = mean_std(&self.class_column(k));
            let _ = writeln!(out, "class {:>2}: {m:.4} +- {s:.4}", k + 1);
        }
        if let Some(last) = self.iterations.last() {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "last iteration: test loss {:.4}, test accuracy {:.4}, best epoch {} of {}",
                last.test_loss, last.test_accuracy, last.best_epoch, last.epochs_run
            );
        }
        out
    }

    /// One line of per-class accuracies per iteration.
    pub fn render_elements(&self) -> String {
        let mut out = String::new();
        for it in &self.iterations {
            let row: Vec<String> = (0..self.classes)
                .map(|k| format!("{:.4}", it.metrics.per_class.get(k).copied().unwrap_or(f64::NAN)))
                .collect();
            let _ = writeln!(out, "{}", row.join(" "));
        }
        out
    }

    pub fn write_text(&self, path: &Path) -> anyhow::Result<()> {
        write_file(path, &self.render_text())
    }

    pub fn write_elements(&self, path: &Path) -> anyhow::Result<()> {
        write_file(path, &self.render_elements())
    }

    /// JSON summary. `NaN` metrics serialize as `null`.
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_file(path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(iteration: usize, per_class: Vec<f64>) -> IterationStats {
        let undefined_classes = (0..per_class.len()).filter(|&k| per_class[k].is_nan()).collect();
        IterationStats {
            iteration,
            seed: 1220 + iteration as u64,
            metrics: ClassificationMetrics {
                overall_accuracy: 0.9,
                average_accuracy: 0.8,
                kappa: 0.85,
                per_class,
                undefined_classes,
            },
            test_loss: 0.3,
            test_accuracy: 0.9,
            best_epoch: 3,
            epochs_run: 5,
            training_secs: 1.5,
            testing_secs: 0.25,
        }
    }

    #[test]
    fn mean_std_is_population() {
        let (m, s) = mean_std(&[1.0, 3.0]);
        assert_eq!((m, s), (2.0, 1.0));
        assert!(mean_std(&[]).0.is_nan());
    }

    #[test]
    fn text_report_keeps_nan_classes() {
        let mut report = ExperimentReport::new("toy", 2);
        report.push(stats(0, vec![1.0, f64::NAN]));
        report.push(stats(1, vec![0.5, 1.0]));
        let text = report.render_text();
        assert!(text.contains("OA mean: 0.9000 +- 0.0000"));
        assert!(text.contains("class  1: 0.7500 +- 0.2500"));
        assert!(text.contains("class  2: NaN"));
        assert!(text.contains("AA of iteration 0 excludes classes [2]"));
        assert!(!text.contains("AA of iteration 1"));
        assert_eq!(report.render_elements(), "1.0000 NaN\n0.5000 1.0000\n");
    }
}
