//! Per-band standardization of the cube.

use ndarray::{Array3, ArrayView3, Axis};
use serde::Serialize;

/// Mean and population standard deviation of each band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

pub fn band_statistics(cube: ArrayView3<'_, f32>) -> BandStats {
    let bands = cube.len_of(Axis(2));
    let mut mean = Vec::with_capacity(bands);
    let mut std = Vec::with_capacity(bands);
    for band in cube.axis_iter(Axis(2)) {
        let n = band.len().max(1) as f64;
        let m = band.iter().map(|v| *v as f64).sum::<f64>() / n;
        let var = band.iter().map(|v| (*v as f64 - m).powi(2)).sum::<f64>() / n;
        mean.push(m);
        std.push(var.sqrt());
    }
    BandStats { mean, std }
}

/// Rescale every band to zero mean and unit variance in place.
///
/// A constant band is only centred.
pub fn standardize_bands(cube: &mut Array3<f32>) -> BandStats {
    let stats = band_statistics(cube.view());
    for (b, mut band) in cube.axis_iter_mut(Axis(2)).enumerate() {
        let m = stats.mean[b];
        let s = if stats.std[b] > 0.0 { stats.std[b] } else { 1.0 };
        band.mapv_inplace(|v| ((v as f64 - m) / s) as f32);
    }
    log::debug!("standardized {} bands", stats.mean.len());
    stats
}
