//! Per-seed materialization of train/eval patch tensors.

use crate::indexer::PixelIndexer;
use crate::pad::{pad_cube, PaddedCube};
use crate::splits::{split_stratified, StratifiedSplit};
use crate::types::{try_zeroed, BuildConfig, DatasetResult, PatchDatasetError, PatchSet, SplitDataset};
use crate::validation::validate_shapes;
use ndarray::{s, Array2, Array4, ArrayView2, ArrayView3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Holds the padded cube and flattened labels for a run; builds one
/// [`SplitDataset`] per seed.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    padded: PaddedCube,
    labels: Vec<u16>,
    indexer: PixelIndexer,
    num_classes: usize,
    cfg: BuildConfig,
}

impl DatasetBuilder {
    pub fn new(
        cube: ArrayView3<'_, f32>,
        labels: ArrayView2<'_, u16>,
        cfg: BuildConfig,
    ) -> DatasetResult<Self> {
        validate_shapes(cube, labels)?;
        let (rows, cols, _) = cube.dim();
        let size = cfg.patch_size();
        if size > rows || size > cols {
            return Err(PatchDatasetError::Configuration(format!(
                "patch size {size} exceeds image {rows}x{cols}"
            )));
        }

        let max_label = labels.iter().copied().max().unwrap_or(0) as usize;
        let num_classes = match cfg.num_classes {
            Some(k) if max_label > k => {
                return Err(PatchDatasetError::Configuration(format!(
                    "label {max_label} exceeds declared class count {k}"
                )))
            }
            Some(k) => k,
            None => max_label,
        };
        if num_classes == 0 {
            return Err(PatchDatasetError::Configuration(
                "label map contains no labelled pixels".to_string(),
            ));
        }

        let padded = pad_cube(cube, cfg.pad_length, cfg.padding)?;
        Ok(Self {
            padded,
            labels: labels.iter().copied().collect(),
            indexer: PixelIndexer::new(rows, cols, cfg.pad_length),
            num_classes,
            cfg,
        })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.cfg
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn padded(&self) -> &PaddedCube {
        &self.padded
    }

    /// Flat row-major label values, 0 = background.
    pub fn labels(&self) -> &[u16] {
        &self.labels
    }

    pub fn indexer(&self) -> PixelIndexer {
        self.indexer
    }

    /// Split with a fresh `StdRng` seeded from `seed` and materialize both halves.
    pub fn build(&self, seed: u64) -> DatasetResult<SplitDataset> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ds = self.build_with_rng(&mut rng)?;
        ds.seed = seed;
        Ok(ds)
    }

    pub fn build_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> DatasetResult<SplitDataset> {
        let split = self.split(rng)?;
        let train = self.patch_set(&split.train)?;
        let eval = self.patch_set(&split.eval)?;
        log::info!(
            "split {} train / {} eval samples over {} classes",
            train.len(),
            eval.len(),
            self.num_classes
        );
        Ok(SplitDataset {
            seed: 0,
            train,
            eval,
            split,
        })
    }

    /// Only the index split, without allocating patch tensors.
    pub fn split<R: Rng + ?Sized>(&self, rng: &mut R) -> DatasetResult<StratifiedSplit> {
        split_stratified(self.cfg.eval_fraction, &self.labels, rng)
    }

    /// Dense `(n, 2P+1, 2P+1, B)` tensor whose row `i` is the patch of `indices[i]`.
    ///
    /// Works for any pixel, labelled or not.
    pub fn materialize(&self, indices: &[usize]) -> DatasetResult<Array4<f32>> {
        let size = self.cfg.patch_size();
        let (_, _, bands) = self.padded.dim();
        let shape = [indices.len(), size, size, bands];
        let buf = try_zeroed(&shape)?;
        let mut out = Array4::from_shape_vec(shape, buf)
            .map_err(|e| PatchDatasetError::Configuration(e.to_string()))?;
        for (i, &index) in indices.iter().enumerate() {
            let (r, c) = self.indexer.padded_coordinate(index)?;
            let patch = self.padded.patch(r, c)?;
            out.slice_mut(s![i, .., .., ..]).assign(&patch);
        }
        Ok(out)
    }

    /// 0-based classes and their one-hot rows for `indices`.
    pub fn one_hot(&self, indices: &[usize]) -> DatasetResult<(Vec<usize>, Array2<f32>)> {
        let mut classes = Vec::with_capacity(indices.len());
        let shape = [indices.len(), self.num_classes];
        let mut onehot = Array2::from_shape_vec(shape, try_zeroed(&shape)?)
            .map_err(|e| PatchDatasetError::Configuration(e.to_string()))?;
        for (i, &index) in indices.iter().enumerate() {
            let label = *self.labels.get(index).ok_or(PatchDatasetError::PixelOutOfRange {
                index,
                pixels: self.labels.len(),
            })?;
            if label == 0 {
                return Err(PatchDatasetError::Unlabeled { index });
            }
            let class = label as usize - 1;
            onehot[[i, class]] = 1.0;
            classes.push(class);
        }
        Ok((classes, onehot))
    }

    pub fn patch_set(&self, indices: &[usize]) -> DatasetResult<PatchSet> {
        let patches = self.materialize(indices)?;
        let (classes, labels) = self.one_hot(indices)?;
        Ok(PatchSet {
            indices: indices.to_vec(),
            patches,
            labels,
            classes,
        })
    }
}

/// Zero-padded build with the class count taken from the labels.
pub fn build(
    cube: ArrayView3<'_, f32>,
    labels: ArrayView2<'_, u16>,
    pad_length: usize,
    eval_fraction: f64,
    seed: u64,
) -> DatasetResult<SplitDataset> {
    DatasetBuilder::new(cube, labels, BuildConfig::new(pad_length, eval_fraction))?.build(seed)
}
