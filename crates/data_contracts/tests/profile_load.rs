use data_contracts::{DatasetProfile, OptimizerKind, PaddingMode, ProfileError};
use std::fs;
use std::path::PathBuf;

const MINIMAL: &str = r#"
name = "paviau"
cube_path = "datasets/paviau_cube.f32"
labels_path = "datasets/paviau_gt.u16"
rows = 610
cols = 340
bands = 103
classes = 9
patch_length = 5
eval_fraction = 0.9
val_size = 4281
seeds = [1220, 1221, 1222]
"#;

#[test]
fn loads_minimal_profile_with_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("paviau.toml");
    fs::write(&path, MINIMAL).unwrap();

    let profile = DatasetProfile::from_path(&path).expect("load profile");
    assert_eq!(profile.name, "paviau");
    assert_eq!(profile.patch_size(), 11);
    assert_eq!(profile.pixel_count(), 610 * 340);
    assert_eq!(profile.padding, PaddingMode::Zero);
    assert!(profile.standardize);
    assert_eq!(profile.training.batch_size, 16);
    assert_eq!(profile.training.optimizer, OptimizerKind::RmsProp);
    assert_eq!(
        profile.output.report_path,
        PathBuf::from("training_results/paviau/paviau_report.txt")
    );
    assert_eq!(profile.output.map_scale, 1);
}

#[test]
fn parses_explicit_sections() {
    let raw = format!(
        "{MINIMAL}\npadding = \"replicate\"\nstandardize = false\n\n[training]\noptimizer = \"adam\"\nepochs = 3\n\n[output]\ncheckpoint_dir = \"ckpt\"\nmap_scale = 4\n"
    );
    let profile = DatasetProfile::from_toml_str(&raw).expect("parse");
    assert_eq!(profile.padding, PaddingMode::Replicate);
    assert!(!profile.standardize);
    assert_eq!(profile.training.optimizer, OptimizerKind::Adam);
    assert_eq!(profile.training.epochs, 3);
    assert_eq!(profile.training.patience, 200);
    assert_eq!(profile.output.checkpoint_dir, PathBuf::from("ckpt"));
    assert_eq!(profile.output.map_scale, 4);
}

#[test]
fn rejects_eval_fraction_out_of_range() {
    let raw = MINIMAL.replace("eval_fraction = 0.9", "eval_fraction = 1.0");
    let err = DatasetProfile::from_toml_str(&raw).unwrap_err();
    assert!(matches!(err, ProfileError::EvalFraction(_)));
}

#[test]
fn rejects_patch_larger_than_image() {
    let raw = MINIMAL.replace("patch_length = 5", "patch_length = 200");
    let err = DatasetProfile::from_toml_str(&raw).unwrap_err();
    assert!(matches!(err, ProfileError::PatchTooLarge { patch: 401, .. }));
}

#[test]
fn rejects_short_palette() {
    let raw = format!("{MINIMAL}palette = [[255, 0, 0], [0, 255, 0]]\n");
    let err = DatasetProfile::from_toml_str(&raw).unwrap_err();
    assert!(matches!(
        err,
        ProfileError::PaletteTooSmall {
            colors: 2,
            classes: 9
        }
    ));
}

#[test]
fn rejects_empty_seed_list() {
    let raw = MINIMAL.replace("seeds = [1220, 1221, 1222]", "seeds = []");
    let err = DatasetProfile::from_toml_str(&raw).unwrap_err();
    assert!(matches!(err, ProfileError::NoSeeds));
}
