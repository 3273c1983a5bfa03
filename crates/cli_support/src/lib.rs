//! cli_support: argument groups and logging setup shared by the binaries.

pub mod common;

pub use common::{resolve_seeds, ProfileArgs, RunOverrideArgs, SEEDS_ENV};

use env_logger::{Builder, Env};

/// Install `env_logger` with an `info` default, overridable through `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();
    let _ = builder.try_init();
}
