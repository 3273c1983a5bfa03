use class_map::prelude::*;
use ndarray::array;

#[test]
fn colorize_scattered_predictions() {
    let table = ColorTable::default();
    let preds = scatter(&[3, 0, 2], &[1, 0, 2], 4, 0).expect("scatter");
    assert_eq!(preds, vec![0, 0, 2, 1]);

    let rgb = colorize(&preds, 2, 2, &table).expect("colorize");
    assert_eq!(rgb.dim(), (2, 2, 3));
    assert_eq!(rgb[[0, 0, 0]], 1.0);
    assert_eq!(rgb[[1, 0, 2]], 1.0);
    assert_eq!(rgb[[1, 1, 1]], 1.0);
}

#[test]
fn unmapped_class_fails_loudly() {
    let table = ColorTable::new(vec![[0, 0, 0], [255, 255, 255]]);
    let err = colorize(&[0, 1, 2, 0], 2, 2, &table).unwrap_err();
    assert!(matches!(
        err,
        ClassMapError::UnmappedClass {
            class: 2,
            pixel: 2,
            colors: 2
        }
    ));
}

#[test]
fn background_mask_and_png_output() {
    let table = ColorTable::default();
    let mut rgb = colorize(&[0, 1, 2, 3], 2, 2, &table).expect("colorize");
    mask_background(&mut rgb, array![[0u16, 2], [3, 0]].view()).expect("mask");
    assert!(rgb.slice(ndarray::s![0, 0, ..]).iter().all(|v| *v == 0.0));
    assert_eq!(rgb[[0, 1, 1]], 1.0);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("maps/class_map.png");
    let img = render(rgb.view(), 2);
    save_png(&img, &path).expect("save");
    let back = image::open(&path).expect("open").to_rgb8();
    assert_eq!(back.dimensions(), (4, 4));
    assert_eq!(back.get_pixel(3, 0), &image::Rgb([0, 255, 0]));
    assert_eq!(back.get_pixel(0, 3), &image::Rgb([0, 0, 255]));
}
