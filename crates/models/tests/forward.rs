use burn::tensor::{Distribution, Tensor};
use burn_ndarray::NdArray;
use models::{SpectralDenseNet, SpectralDenseNetConfig};

type B = NdArray<f32>;

#[test]
fn forward_returns_one_logit_row_per_patch() {
    let device = Default::default();
    let cfg = SpectralDenseNetConfig::for_input(4, 12).with_layers(2, 4).with_init_channels(4);
    let model = SpectralDenseNet::<B>::new(&cfg, &device);
    let input = Tensor::<B, 5>::random([3, 1, 5, 5, 12], Distribution::Default, &device);
    assert_eq!(model.forward(input).dims(), [3, 4]);
}

#[test]
fn probabilities_sum_to_one() {
    let device = Default::default();
    let cfg = SpectralDenseNetConfig::for_input(3, 7).with_layers(1, 2).with_init_channels(2);
    let model = SpectralDenseNet::<B>::new(&cfg, &device);
    let input = Tensor::<B, 5>::random([2, 1, 3, 3, 7], Distribution::Default, &device);
    let probs = model.predict_proba(input).into_data().to_vec::<f32>().unwrap();
    assert_eq!(probs.len(), 6);
    for row in probs.chunks(3) {
        assert!(row.iter().all(|p| *p >= 0.0));
        assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }
}
