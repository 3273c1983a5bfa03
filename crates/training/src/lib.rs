#![recursion_limit = "256"]

pub mod classifier;
pub mod metrics;
pub mod report;
pub mod util;

pub use classifier::{
    categorical_cross_entropy, evaluate, fit, load_from_checkpoint, predict, predict_classes,
    EpochStats, Evaluation, FitConfig, FitOutcome,
};
pub use metrics::{ClassificationMetrics, ConfusionMatrix};
pub use models::{SpectralDenseNet, SpectralDenseNetConfig};
pub use report::{ExperimentReport, IterationStats};
pub use util::{run_classify, run_experiment, run_train, split_table, ClassifyArgs, TrainArgs};
/// Backend alias for training/eval (NdArray by default; WGPU if enabled).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn_wgpu::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn_ndarray::NdArray<f32>;
