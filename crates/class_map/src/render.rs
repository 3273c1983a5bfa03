//! Predictions -> RGB array -> PNG.

use crate::palette::ColorTable;
use crate::{ClassMapError, ClassMapResult};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::{Array3, ArrayView2, ArrayView3};
use std::fs;
use std::path::Path;

/// Place sample-ordered predictions at their flat pixel indices.
///
/// Pixels with no sample get `fill`.
pub fn scatter(
    indices: &[usize],
    predictions: &[usize],
    pixels: usize,
    fill: usize,
) -> ClassMapResult<Vec<usize>> {
    if indices.len() != predictions.len() {
        return Err(ClassMapError::ShapeMismatch {
            what: "predictions per index",
            expected: indices.len(),
            actual: predictions.len(),
        });
    }
    let mut out = vec![fill; pixels];
    for (&index, &pred) in indices.iter().zip(predictions) {
        let slot = out
            .get_mut(index)
            .ok_or(ClassMapError::IndexOutOfRange { index, pixels })?;
        *slot = pred;
    }
    Ok(out)
}

/// `(rows, cols, 3)` RGB in `[0, 1]` for row-major 0-based class predictions.
pub fn colorize(
    predictions: &[usize],
    rows: usize,
    cols: usize,
    table: &ColorTable,
) -> ClassMapResult<Array3<f32>> {
    if predictions.len() != rows * cols {
        return Err(ClassMapError::ShapeMismatch {
            what: "predictions for image",
            expected: rows * cols,
            actual: predictions.len(),
        });
    }
    let mut rgb = Array3::<f32>::zeros((rows, cols, 3));
    for (pixel, &class) in predictions.iter().enumerate() {
        let color = table.unit(class).ok_or(ClassMapError::UnmappedClass {
            class,
            pixel,
            colors: table.len(),
        })?;
        let (r, c) = (pixel / cols, pixel % cols);
        for (ch, v) in color.into_iter().enumerate() {
            rgb[[r, c, ch]] = v;
        }
    }
    Ok(rgb)
}

/// Paint pixels whose stored label is 0 black.
pub fn mask_background(rgb: &mut Array3<f32>, labels: ArrayView2<'_, u16>) -> ClassMapResult<()> {
    let (rows, cols, _) = rgb.dim();
    if labels.dim() != (rows, cols) {
        return Err(ClassMapError::ShapeMismatch {
            what: "label map for image",
            expected: rows * cols,
            actual: labels.len(),
        });
    }
    for ((r, c), &label) in labels.indexed_iter() {
        if label == 0 {
            for ch in 0..3 {
                rgb[[r, c, ch]] = 0.0;
            }
        }
    }
    Ok(())
}

/// Convert to 8-bit, each source pixel becoming a `scale x scale` block.
pub fn render(rgb: ArrayView3<'_, f32>, scale: u32) -> RgbImage {
    let (rows, cols, _) = rgb.dim();
    let scale = scale.max(1);
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbImage::from_fn(cols as u32 * scale, rows as u32 * scale, |x, y| {
        let (r, c) = ((y / scale) as usize, (x / scale) as usize);
        Rgb([to_u8(rgb[[r, c, 0]]), to_u8(rgb[[r, c, 1]]), to_u8(rgb[[r, c, 2]])])
    })
}

pub fn save_png(img: &RgbImage, path: &Path) -> ClassMapResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ClassMapError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|source| ClassMapError::Image {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!("wrote class map {} ({}x{})", path.display(), img.width(), img.height());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_rejects_out_of_range_index() {
        assert!(matches!(
            scatter(&[0, 4], &[1, 1], 4, 0),
            Err(ClassMapError::IndexOutOfRange { index: 4, pixels: 4 })
        ));
        assert!(scatter(&[0], &[1, 2], 4, 0).is_err());
    }

    #[test]
    fn render_upscales_by_nearest_neighbour() {
        let mut rgb = Array3::<f32>::zeros((1, 2, 3));
        rgb[[0, 1, 2]] = 1.0;
        let img = render(rgb.view(), 3);
        assert_eq!(img.dimensions(), (6, 3));
        assert_eq!(img.get_pixel(2, 2), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(3, 0), &Rgb([0, 0, 255]));
    }
}
