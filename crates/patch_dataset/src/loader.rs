//! Raw little-endian cube and label-map files.
//!
//! The cube is `rows * cols * bands` `f32` values, row-major with the band
//! index fastest. The label map is `rows * cols` `u16` values, row-major.

use crate::types::{DatasetResult, PatchDatasetError};
use data_contracts::DatasetProfile;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use std::fs;
use std::path::Path;

fn read_exact_len(path: &Path, expected: usize) -> DatasetResult<Vec<u8>> {
    let bytes = fs::read(path).map_err(|source| PatchDatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() != expected {
        return Err(PatchDatasetError::Configuration(format!(
            "{} holds {} bytes, expected {expected}",
            path.display(),
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> DatasetResult<()> {
    let io_err = |source| PatchDatasetError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, bytes).map_err(io_err)
}

fn byte_len(dims: &[usize], width: usize) -> DatasetResult<usize> {
    dims.iter()
        .try_fold(width, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| PatchDatasetError::ResourceExhaustion {
            shape: dims.to_vec(),
        })
}

pub fn load_cube(path: &Path, rows: usize, cols: usize, bands: usize) -> DatasetResult<Array3<f32>> {
    let len = byte_len(&[rows, cols, bands], 4)?;
    let bytes = read_exact_len(path, len)?;
    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Array3::from_shape_vec((rows, cols, bands), values)
        .map_err(|e| PatchDatasetError::Configuration(e.to_string()))
}

pub fn load_labels(path: &Path, rows: usize, cols: usize) -> DatasetResult<Array2<u16>> {
    let len = byte_len(&[rows, cols], 2)?;
    let bytes = read_exact_len(path, len)?;
    let values: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();
    Array2::from_shape_vec((rows, cols), values)
        .map_err(|e| PatchDatasetError::Configuration(e.to_string()))
}

pub fn write_cube(path: &Path, cube: ArrayView3<'_, f32>) -> DatasetResult<()> {
    let bytes: Vec<u8> = cube.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_bytes(path, &bytes)
}

pub fn write_labels(path: &Path, labels: ArrayView2<'_, u16>) -> DatasetResult<()> {
    let bytes: Vec<u8> = labels.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_bytes(path, &bytes)
}

/// Cube and label map named by `profile`, with its dimensions.
pub fn load_profile_arrays(profile: &DatasetProfile) -> DatasetResult<(Array3<f32>, Array2<u16>)> {
    let cube = load_cube(&profile.cube_path, profile.rows, profile.cols, profile.bands)?;
    let labels = load_labels(&profile.labels_path, profile.rows, profile.cols)?;
    log::info!(
        "loaded {} cube {:?} and labels from {}",
        profile.name,
        cube.dim(),
        profile.labels_path.display()
    );
    Ok((cube, labels))
}
