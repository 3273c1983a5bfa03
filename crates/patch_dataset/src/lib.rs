//! Patch extraction and stratified splitting for hyperspectral cubes.
//!
//! This crate provides utilities for:
//! - Loading raw cube/label files named by a `DatasetProfile`
//! - Per-band standardization and spatial padding
//! - Class-stratified train/eval splits with an explicit seeded RNG
//! - Dense patch tensors and one-hot labels per split
//! - Burn-compatible batch iteration

// Module declarations
pub mod builder;
pub mod indexer;
pub mod loader;
pub mod pad;
pub mod patch;
pub mod splits;
pub mod standardize;
pub mod types;
pub mod validation;

#[cfg(feature = "burn-runtime")]
pub mod batch;

// Re-export public API
pub use builder::{build, DatasetBuilder};
pub use indexer::{to_coordinate, to_flat_index, PixelIndexer};
pub use loader::{load_cube, load_labels, load_profile_arrays, write_cube, write_labels};
pub use pad::{pad_cube, PaddedCube};
pub use patch::extract_patch;
pub use splits::{split_label_map, split_stratified, ClassSplit, DegenerateClass, StratifiedSplit};
pub use standardize::{band_statistics, standardize_bands, BandStats};
pub use types::*;
pub use validation::{summarize_labels, validate_shapes, LabelSummary};

#[cfg(feature = "burn-runtime")]
pub use batch::{to_model_input, BatchIter, PatchBatch};
