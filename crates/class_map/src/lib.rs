//! class_map: color tables and class-map rendering for per-pixel predictions.

pub mod palette;
pub mod render;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassMapError {
    #[error("class {class} at pixel {pixel} has no color (table holds {colors})")]
    UnmappedClass {
        class: usize,
        pixel: usize,
        colors: usize,
    },
    #[error("color table holds {colors} colors but {classes} classes need one")]
    TableTooSmall { colors: usize, classes: usize },
    #[error("sample index {index} out of range for {pixels} pixels")]
    IndexOutOfRange { index: usize, pixels: usize },
    #[error("{what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type ClassMapResult<T> = Result<T, ClassMapError>;

pub mod prelude {
    pub use crate::palette::{ColorTable, DEFAULT_PALETTE};
    pub use crate::render::{colorize, mask_background, render, save_png, scatter};
    pub use crate::{ClassMapError, ClassMapResult};
}
