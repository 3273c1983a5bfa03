use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable consulted when no `--profile` is given.
pub const PROFILE_ENV: &str = "HSI_PROFILE";

const DEFAULT_RESULTS_ROOT: &str = "training_results";

/// Border strategy used when padding the cube before patch extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingMode {
    /// Fill the margin with 0.0.
    #[default]
    Zero,
    /// Copy the nearest edge pixel into the margin.
    Replicate,
}

impl PaddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaddingMode::Zero => "zero",
            PaddingMode::Replicate => "replicate",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    #[default]
    #[serde(rename = "rmsprop")]
    RmsProp,
    #[serde(rename = "adam")]
    Adam,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("toml parse error at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("eval_fraction must lie in (0, 1), got {0}")]
    EvalFraction(f64),
    #[error("patch of {patch}x{patch} does not fit a {rows}x{cols} image")]
    PatchTooLarge {
        patch: usize,
        rows: usize,
        cols: usize,
    },
    #[error("no seeds configured; at least one iteration is required")]
    NoSeeds,
    #[error("palette has {colors} colors but the profile declares {classes} classes")]
    PaletteTooSmall { colors: usize, classes: usize },
    #[error("learning_rate must be finite and positive, got {0}")]
    LearningRate(f64),
}

/// Training hyper-parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    pub batch_size: usize,
    pub epochs: usize,
    /// Epochs without validation-loss improvement before stopping.
    pub patience: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerKind,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            batch_size: 16,
            epochs: 200,
            patience: 200,
            learning_rate: 3e-4,
            optimizer: OptimizerKind::RmsProp,
        }
    }
}

/// Resolved output locations.
#[derive(Debug, Clone, Serialize)]
pub struct OutputSection {
    pub checkpoint_dir: PathBuf,
    pub report_path: PathBuf,
    pub element_report_path: PathBuf,
    pub summary_path: PathBuf,
    pub map_path: PathBuf,
    /// Integer upscaling applied when rendering the class map.
    pub map_scale: u32,
}

impl OutputSection {
    /// Checkpoint path for a 1-based iteration number.
    pub fn checkpoint_path(&self, name: &str, iteration: usize) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{name}_best_{iteration}.bin"))
    }
}

/// A dataset identity reduced to configuration: where the arrays live, their
/// dimensions, and how the pipeline samples and trains on them.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetProfile {
    pub name: String,
    pub cube_path: PathBuf,
    pub labels_path: PathBuf,
    pub rows: usize,
    pub cols: usize,
    pub bands: usize,
    pub classes: usize,
    /// Neighbours on each side of the centre pixel; patches are `2P+1` wide.
    pub patch_length: usize,
    pub eval_fraction: f64,
    /// Trailing slice of the eval set held out for validation.
    pub val_size: usize,
    pub padding: PaddingMode,
    pub standardize: bool,
    pub seeds: Vec<u64>,
    pub training: TrainingSection,
    pub output: OutputSection,
    pub palette: Option<Vec<[u8; 3]>>,
}

#[derive(Debug, Deserialize)]
struct DatasetProfileFile {
    name: String,
    cube_path: String,
    labels_path: String,
    rows: usize,
    cols: usize,
    bands: usize,
    classes: usize,
    patch_length: usize,
    eval_fraction: f64,
    val_size: usize,
    #[serde(default)]
    padding: PaddingMode,
    #[serde(default = "default_true")]
    standardize: bool,
    seeds: Vec<u64>,
    #[serde(default)]
    training: TrainingSection,
    #[serde(default)]
    output: OutputFileSection,
    palette: Option<Vec<[u8; 3]>>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputFileSection {
    checkpoint_dir: Option<String>,
    report_path: Option<String>,
    element_report_path: Option<String>,
    summary_path: Option<String>,
    map_path: Option<String>,
    map_scale: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl DatasetProfile {
    /// Load from an explicit path, or from `HSI_PROFILE` when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ProfileError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var(PROFILE_ENV) {
                Ok(v) if !v.trim().is_empty() => expand_path(&v),
                _ => {
                    return Err(ProfileError::Io {
                        path: PathBuf::from(format!("${PROFILE_ENV}")),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "no profile path given and HSI_PROFILE is unset",
                        ),
                    })
                }
            },
        };
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ProfileError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ProfileError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: DatasetProfileFile = toml::from_str(&raw).map_err(|e| ProfileError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        let profile = Self::from_file(file);
        profile.validate()?;
        Ok(profile)
    }

    /// Parse and validate a profile held in memory. Relative paths stay relative.
    pub fn from_toml_str(raw: &str) -> Result<Self, ProfileError> {
        let file: DatasetProfileFile = toml::from_str(raw).map_err(|e| ProfileError::Parse {
            path: PathBuf::from("<memory>"),
            source: e,
        })?;
        let profile = Self::from_file(file);
        profile.validate()?;
        Ok(profile)
    }

    fn from_file(file: DatasetProfileFile) -> Self {
        let results_root = PathBuf::from(DEFAULT_RESULTS_ROOT).join(&file.name);
        let out = file.output;
        let checkpoint_dir = out
            .checkpoint_dir
            .map(|v| expand_path(&v))
            .unwrap_or_else(|| results_root.clone());
        let report_path = out
            .report_path
            .map(|v| expand_path(&v))
            .unwrap_or_else(|| results_root.join(format!("{}_report.txt", file.name)));
        let element_report_path = out
            .element_report_path
            .map(|v| expand_path(&v))
            .unwrap_or_else(|| results_root.join(format!("{}_report_element.txt", file.name)));
        let summary_path = out
            .summary_path
            .map(|v| expand_path(&v))
            .unwrap_or_else(|| results_root.join(format!("{}_summary.json", file.name)));
        let map_path = out
            .map_path
            .map(|v| expand_path(&v))
            .unwrap_or_else(|| results_root.join(format!("{}_classification_map.png", file.name)));

        DatasetProfile {
            cube_path: expand_path(&file.cube_path),
            labels_path: expand_path(&file.labels_path),
            rows: file.rows,
            cols: file.cols,
            bands: file.bands,
            classes: file.classes,
            patch_length: file.patch_length,
            eval_fraction: file.eval_fraction,
            val_size: file.val_size,
            padding: file.padding,
            standardize: file.standardize,
            seeds: file.seeds,
            training: file.training,
            output: OutputSection {
                checkpoint_dir,
                report_path,
                element_report_path,
                summary_path,
                map_path,
                map_scale: out.map_scale.unwrap_or(1).max(1),
            },
            palette: file.palette,
            name: file.name,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        for (field, value) in [
            ("rows", self.rows),
            ("cols", self.cols),
            ("bands", self.bands),
            ("classes", self.classes),
            ("val_size", self.val_size),
            ("training.batch_size", self.training.batch_size),
        ] {
            if value == 0 {
                return Err(ProfileError::Zero { field });
            }
        }
        if self.eval_fraction.is_nan() || self.eval_fraction <= 0.0 || self.eval_fraction >= 1.0 {
            return Err(ProfileError::EvalFraction(self.eval_fraction));
        }
        let patch = self.patch_size();
        if patch > self.rows || patch > self.cols {
            return Err(ProfileError::PatchTooLarge {
                patch,
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.seeds.is_empty() {
            return Err(ProfileError::NoSeeds);
        }
        let lr = self.training.learning_rate;
        if !lr.is_finite() || lr <= 0.0 {
            return Err(ProfileError::LearningRate(lr));
        }
        if let Some(palette) = &self.palette {
            if palette.len() < self.classes {
                return Err(ProfileError::PaletteTooSmall {
                    colors: palette.len(),
                    classes: self.classes,
                });
            }
        }
        Ok(())
    }

    /// Spatial side of a patch: `2 * patch_length + 1`.
    pub fn patch_size(&self) -> usize {
        2 * self.patch_length + 1
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&format!("${{{key}}}")),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
