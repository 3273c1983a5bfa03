//! Burn tensors and mini-batch iteration over a [`PatchSet`].

use crate::types::PatchSet;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::{s, ArrayView4};
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// `(N, R, C, B)` patches as a `[N, 1, R, C, B]` model input.
pub fn to_model_input<B: Backend>(patches: ArrayView4<'_, f32>, device: &B::Device) -> Tensor<B, 5> {
    let (n, r, c, b) = patches.dim();
    let values: Vec<f32> = patches.iter().copied().collect();
    Tensor::from_data(TensorData::new(values, [n, 1, r, c, b]), device)
}

pub struct PatchBatch<B: Backend> {
    /// `[n, 1, 2P+1, 2P+1, bands]`.
    pub patches: Tensor<B, 5>,
    /// One-hot `[n, K]`.
    pub targets: Tensor<B, 2>,
    /// 0-based class per row.
    pub classes: Vec<usize>,
    /// Row positions within the source set.
    pub positions: Vec<usize>,
}

/// Yields consecutive batches of `batch_size` rows; the last one may be short.
pub struct BatchIter<'a> {
    set: &'a PatchSet,
    order: Vec<usize>,
    cursor: usize,
    batch_size: usize,
}

impl<'a> BatchIter<'a> {
    /// Rows in set order.
    pub fn new(set: &'a PatchSet, batch_size: usize) -> Self {
        Self {
            set,
            order: (0..set.len()).collect(),
            cursor: 0,
            batch_size: batch_size.max(1),
        }
    }

    /// Rows in an order shuffled by `seed`.
    pub fn shuffled(set: &'a PatchSet, batch_size: usize, seed: u64) -> Self {
        let mut iter = Self::new(set, batch_size);
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        iter.order.shuffle(&mut rng);
        iter
    }

    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    pub fn next_batch<B: Backend>(&mut self, device: &B::Device) -> Option<PatchBatch<B>> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let positions = self.order[self.cursor..end].to_vec();
        self.cursor = end;

        let (_, r, c, b) = self.set.patches.dim();
        let k = self.set.num_classes();
        let mut patch_buf = Vec::with_capacity(positions.len() * r * c * b);
        let mut target_buf = Vec::with_capacity(positions.len() * k);
        let mut classes = Vec::with_capacity(positions.len());
        for &pos in &positions {
            patch_buf.extend(self.set.patches.slice(s![pos, .., .., ..]).iter().copied());
            target_buf.extend(self.set.labels.row(pos).iter().copied());
            classes.push(self.set.classes[pos]);
        }
        let n = positions.len();
        log::debug!("batch of {n} rows ({} of {})", end, self.order.len());
        Some(PatchBatch {
            patches: Tensor::from_data(TensorData::new(patch_buf, [n, 1, r, c, b]), device),
            targets: Tensor::from_data(TensorData::new(target_buf, [n, k]), device),
            classes,
            positions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ndarray::{Array, Array2};

    type B = NdArray<f32>;

    fn set(n: usize) -> PatchSet {
        PatchSet {
            indices: (0..n).collect(),
            patches: Array::from_shape_fn((n, 3, 3, 4), |(i, r, c, b)| {
                (i * 1000 + r * 100 + c * 10 + b) as f32
            }),
            labels: Array2::from_shape_fn((n, 2), |(i, k)| if i % 2 == k { 1.0 } else { 0.0 }),
            classes: (0..n).map(|i| i % 2).collect(),
        }
    }

    #[test]
    fn model_input_inserts_channel_axis() {
        let device = Default::default();
        let set = set(3);
        let input = to_model_input::<B>(set.patches.view(), &device);
        assert_eq!(input.dims(), [3, 1, 3, 3, 4]);
        let values = input.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values[36 * 2 + 12 + 1], 2101.0);
    }

    #[test]
    fn batches_cover_set_with_short_tail() {
        let device = Default::default();
        let set = set(5);
        let mut iter = BatchIter::new(&set, 2);
        assert_eq!(iter.num_batches(), 3);
        let mut sizes = Vec::new();
        while let Some(batch) = iter.next_batch::<B>(&device) {
            assert_eq!(batch.targets.dims()[1], 2);
            sizes.push(batch.patches.dims()[0]);
        }
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn shuffled_batches_keep_rows_aligned() {
        let device = Default::default();
        let set = set(6);
        let mut iter = BatchIter::shuffled(&set, 4, 9);
        let mut seen = Vec::new();
        while let Some(batch) = iter.next_batch::<B>(&device) {
            let patches = batch.patches.into_data().to_vec::<f32>().unwrap();
            let targets = batch.targets.into_data().to_vec::<f32>().unwrap();
            for (row, &pos) in batch.positions.iter().enumerate() {
                assert_eq!(patches[row * 36], (pos * 1000) as f32);
                assert_eq!(targets[row * 2 + pos % 2], 1.0);
                assert_eq!(batch.classes[row], pos % 2);
            }
            seen.extend(batch.positions);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..6).collect::<Vec<_>>());
    }
}
