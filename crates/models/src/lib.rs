//! Burn models for hyperspectral patch classification.
//!
//! `SpectralDenseNet` takes `[N, 1, rows, cols, bands]` patches and returns
//! `[N, K]` logits. It is a pure Burn `Module`; training and evaluation live
//! in the `training` crate.

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv3d, Conv3dConfig};
use burn::nn::PaddingConfig3d;
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

pub const DEFAULT_SPECTRAL_KERNEL: usize = 7;

#[derive(Debug, Clone)]
pub struct SpectralDenseNetConfig {
    pub num_classes: usize,
    /// Channels produced by the spectral stem.
    pub init_channels: usize,
    /// Channels added by each dense layer.
    pub growth: usize,
    pub layers: usize,
    /// Stem kernel length along the band axis.
    pub spectral_kernel: usize,
    pub dropout: f64,
}

impl Default for SpectralDenseNetConfig {
    fn default() -> Self {
        Self {
            num_classes: 9,
            init_channels: 24,
            growth: 12,
            layers: 3,
            spectral_kernel: DEFAULT_SPECTRAL_KERNEL,
            dropout: 0.5,
        }
    }
}

impl SpectralDenseNetConfig {
    /// Defaults sized for `num_classes` outputs and `bands` input bands.
    pub fn for_input(num_classes: usize, bands: usize) -> Self {
        Self {
            num_classes,
            spectral_kernel: DEFAULT_SPECTRAL_KERNEL.min(bands.max(1)),
            ..Self::default()
        }
    }

    pub fn with_layers(mut self, layers: usize, growth: usize) -> Self {
        self.layers = layers;
        self.growth = growth;
        self
    }

    pub fn with_init_channels(mut self, init_channels: usize) -> Self {
        self.init_channels = init_channels;
        self
    }

    /// Channel count after the dense block.
    pub fn block_channels(&self) -> usize {
        self.init_channels + self.layers * self.growth
    }
}

#[derive(Debug, Module)]
pub struct SpectralDenseNet<B: Backend> {
    stem: Conv3d<B>,
    dense: Vec<Conv3d<B>>,
    transition: Conv3d<B>,
    dropout: nn::Dropout,
    head: nn::Linear<B>,
    num_classes: usize,
}

impl<B: Backend> SpectralDenseNet<B> {
    pub fn new(cfg: &SpectralDenseNetConfig, device: &B::Device) -> Self {
        let init = cfg.init_channels.max(1);
        let stem = Conv3dConfig::new([1, init], [1, 1, cfg.spectral_kernel.max(1)])
            .with_stride([1, 1, 2])
            .init(device);
        let mut dense = Vec::with_capacity(cfg.layers);
        let mut channels = init;
        for _ in 0..cfg.layers {
            dense.push(
                Conv3dConfig::new([channels, cfg.growth.max(1)], [3, 3, 3])
                    .with_padding(PaddingConfig3d::Explicit(1, 1, 1))
                    .init(device),
            );
            channels += cfg.growth.max(1);
        }
        let transition = Conv3dConfig::new([channels, channels], [1, 1, 1]).init(device);
        let dropout = nn::DropoutConfig::new(cfg.dropout).init();
        let head = nn::LinearConfig::new(channels, cfg.num_classes).init(device);
        Self {
            stem,
            dense,
            transition,
            dropout,
            head,
            num_classes: cfg.num_classes,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Logits `[N, K]`.
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 2> {
        let mut x = relu(self.stem.forward(input));
        for layer in &self.dense {
            let y = relu(layer.forward(x.clone()));
            x = Tensor::cat(vec![x, y], 1);
        }
        let x = relu(self.transition.forward(x));
        let x = x.mean_dim(4).mean_dim(3).mean_dim(2);
        let [n, c, _, _, _] = x.dims();
        let x = self.dropout.forward(x.reshape([n, c]));
        self.head.forward(x)
    }

    /// Class probabilities `[N, K]`; rows sum to 1.
    pub fn predict_proba(&self, input: Tensor<B, 5>) -> Tensor<B, 2> {
        softmax(self.forward(input), 1)
    }
}
