use clap::Args;
use data_contracts::{DatasetProfile, ProfileError};
use std::path::PathBuf;

/// Env var holding a comma-separated seed list that overrides the profile.
pub const SEEDS_ENV: &str = "HSI_SEEDS";

/// Dataset profile selection shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    /// Dataset profile TOML (falls back to $HSI_PROFILE).
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

impl ProfileArgs {
    pub fn new(profile: Option<PathBuf>) -> Self {
        Self { profile }
    }

    pub fn load(&self) -> Result<DatasetProfile, ProfileError> {
        DatasetProfile::load(self.profile.as_deref())
    }
}

/// Optional per-run overrides of profile values.
#[derive(Debug, Clone, Default, Args)]
pub struct RunOverrideArgs {
    /// Comma-separated seeds replacing the profile's list.
    #[arg(long, value_delimiter = ',')]
    pub seeds: Vec<u64>,
    /// Override the number of training epochs.
    #[arg(long)]
    pub epochs: Option<usize>,
    /// Override the early-stopping patience.
    #[arg(long)]
    pub patience: Option<usize>,
}

impl RunOverrideArgs {
    /// Apply overrides in place; seeds resolve CLI first, then `$HSI_SEEDS`.
    pub fn apply(&self, profile: &mut DatasetProfile) {
        profile.seeds = resolve_seeds(&self.seeds, std::env::var(SEEDS_ENV).ok().as_deref(), &profile.seeds);
        if let Some(epochs) = self.epochs {
            profile.training.epochs = epochs;
        }
        if let Some(patience) = self.patience {
            profile.training.patience = patience;
        }
    }
}

/// Resolve seeds from CLI, then an env value, else the profile.
///
/// An env value that does not parse as a list of `u64` is ignored.
pub fn resolve_seeds(cli: &[u64], env_value: Option<&str>, profile: &[u64]) -> Vec<u64> {
    if !cli.is_empty() {
        return cli.to_vec();
    }
    if let Some(raw) = env_value {
        let parsed: Result<Vec<u64>, _> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<u64>)
            .collect();
        match parsed {
            Ok(seeds) if !seeds.is_empty() => return seeds,
            _ => log::warn!("ignoring unparsable {SEEDS_ENV}={raw:?}"),
        }
    }
    profile.to_vec()
}
