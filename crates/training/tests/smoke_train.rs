use data_contracts::DatasetProfile;
use ndarray::Array;
use patch_dataset::{write_cube, write_labels};
use std::path::Path;
use training::util::{classify_image, existing_checkpoint, run_experiment, split_table, ClassifyOptions};

const ROWS: usize = 8;
const COLS: usize = 8;
const BANDS: usize = 8;

/// Two spectrally distinct classes on the left/right halves, a background column between.
fn write_scene(dir: &Path) -> anyhow::Result<()> {
    let labels = Array::from_shape_fn((ROWS, COLS), |(_, c)| match c {
        0..=2 => 1u16,
        3 => 0,
        _ => 2,
    });
    let cube = Array::from_shape_fn((ROWS, COLS, BANDS), |(r, c, b)| {
        let class_shift = if c < 4 { 0.0 } else { 5.0 };
        class_shift + b as f32 * 0.1 + r as f32 * 0.01
    });
    write_cube(&dir.join("cube.f32"), cube.view())?;
    write_labels(&dir.join("gt.u16"), labels.view())?;
    Ok(())
}

fn profile(dir: &Path) -> anyhow::Result<DatasetProfile> {
    let d = dir.display();
    let raw = format!(
        r#"
name = "toy"
cube_path = "{d}/cube.f32"
labels_path = "{d}/gt.u16"
rows = {ROWS}
cols = {COLS}
bands = {BANDS}
classes = 2
patch_length = 1
eval_fraction = 0.5
val_size = 4
seeds = [1220]

[training]
batch_size = 8
epochs = 1
patience = 1

[output]
checkpoint_dir = "{d}/ckpt"
report_path = "{d}/out/report.txt"
element_report_path = "{d}/out/report_element.txt"
summary_path = "{d}/out/summary.json"
map_path = "{d}/out/map.png"
map_scale = 2
"#
    );
    Ok(DatasetProfile::from_toml_str(&raw)?)
}

#[test]
fn dry_run_table_lists_every_class() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    write_scene(tmp.path())?;
    let profile = profile(tmp.path())?;
    let table = split_table(&profile)?;
    // 24 + 32 labelled pixels, half of each class to eval
    assert!(table.contains("    1       24       12       12"));
    assert!(table.contains("    2       32       16       16"));
    assert!(table.contains("eval -> 24 test + 4 validation"));
    Ok(())
}

#[test]
fn experiment_writes_reports_checkpoints_and_map() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    write_scene(tmp.path())?;
    let profile = profile(tmp.path())?;

    let report = run_experiment(&profile)?;
    assert_eq!(report.iterations.len(), 1);
    for stats in &report.iterations {
        assert_eq!(stats.epochs_run, 1);
        assert_eq!(stats.best_epoch, 0);
        assert_eq!(stats.metrics.per_class.len(), 2);
        assert!((0.0..=1.0).contains(&stats.metrics.overall_accuracy));
    }
    assert!(profile.output.report_path.exists());
    assert!(profile.output.element_report_path.exists());
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&profile.output.summary_path)?)?;
    assert_eq!(summary["iterations"].as_array().map(Vec::len), Some(1));

    let checkpoint = existing_checkpoint(&profile, 1).expect("best checkpoint for iteration 1");
    assert!(existing_checkpoint(&profile, 2).is_none());
    assert!(checkpoint.ends_with("toy_best_1.bin"));

    let opts = ClassifyOptions {
        checkpoint,
        output: profile.output.map_path.clone(),
        mask_background: true,
        labelled_only: false,
        chunk: 20,
    };
    let predictions = classify_image(&profile, &opts)?;
    assert_eq!(predictions.len(), ROWS * COLS);
    assert!(predictions.iter().all(|p| *p < 2));

    let img = image::open(&opts.output)?.to_rgb8();
    assert_eq!(img.dimensions(), (COLS as u32 * 2, ROWS as u32 * 2));
    // column 3 is background and masked
    assert_eq!(img.get_pixel(7, 0), &image::Rgb([0, 0, 0]));
    Ok(())
}
