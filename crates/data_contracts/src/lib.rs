//! Shared data contracts for dataset profiles.

pub mod profile;

pub use profile::{
    DatasetProfile, OptimizerKind, OutputSection, PaddingMode, ProfileError, TrainingSection,
    PROFILE_ENV,
};
