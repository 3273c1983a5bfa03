use clap::Parser;
use cli_support::{resolve_seeds, ProfileArgs, RunOverrideArgs};
use data_contracts::DatasetProfile;

#[derive(Parser, Debug)]
struct Cli {
    #[command(flatten)]
    profile: ProfileArgs,
    #[command(flatten)]
    overrides: RunOverrideArgs,
}

const PROFILE: &str = r#"
name = "toy"
cube_path = "cube.f32"
labels_path = "gt.u16"
rows = 6
cols = 6
bands = 8
classes = 2
patch_length = 1
eval_fraction = 0.5
val_size = 2
seeds = [1220, 1221, 1222]
"#;

#[test]
fn seeds_prefer_cli_then_env_then_profile() {
    let profile = [1220, 1221];
    assert_eq!(resolve_seeds(&[5], Some("7,8"), &profile), vec![5]);
    assert_eq!(resolve_seeds(&[], Some("7, 8"), &profile), vec![7, 8]);
    assert_eq!(resolve_seeds(&[], Some("seven"), &profile), vec![1220, 1221]);
    assert_eq!(resolve_seeds(&[], None, &profile), vec![1220, 1221]);
}

#[test]
fn flattened_args_parse_and_override_profile() {
    let cli = Cli::parse_from([
        "train",
        "--profile",
        "profiles/toy.toml",
        "--seeds",
        "3,4",
        "--epochs",
        "2",
    ]);
    assert_eq!(
        cli.profile.profile.as_deref(),
        Some(std::path::Path::new("profiles/toy.toml"))
    );

    let mut profile = DatasetProfile::from_toml_str(PROFILE).expect("profile");
    cli.overrides.apply(&mut profile);
    assert_eq!(profile.seeds, vec![3, 4]);
    assert_eq!(profile.training.epochs, 2);
    assert_eq!(profile.training.patience, 200);
}
