use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::combine::CombineMethod;
use crate::consts::{DEFAULT_BLANK, DEFAULT_STAGE};
use crate::error::{MasterFrameError, Result};
use crate::io::loader::{LoadOptions, StatSection};
use crate::reject::RejectionPolicy;
use crate::scale::ScalingPolicy;

/// One "process" request: which frames to combine, where to put the master,
/// and how to combine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    #[serde(default = "default_stage")]
    pub stage: String,
    /// Input frames in stack order.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    #[serde(default)]
    pub combine: CombineConfig,
}

fn default_stage() -> String {
    DEFAULT_STAGE.to_string()
}

impl StageConfig {
    pub fn new(stage: &str, inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            stage: stage.to_string(),
            inputs,
            output: output.into(),
            combine: CombineConfig::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| MasterFrameError::InvalidConfig(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MasterFrameError::InvalidConfig(e.to_string()))
    }
}

/// Rejection method keyword as it appears in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RejectMethod {
    #[default]
    None,
    Minmax,
    Sigclip,
    Pclip,
}

impl std::fmt::Display for RejectMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Minmax => write!(f, "minmax"),
            Self::Sigclip => write!(f, "sigclip"),
            Self::Pclip => write!(f, "pclip"),
        }
    }
}

/// Combination options. Parameters of inactive rejection methods are kept but
/// ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CombineConfig {
    pub combine_method: CombineMethod,
    pub reject_method: RejectMethod,
    pub nlow: usize,
    pub nhigh: usize,
    pub low_sigma: f32,
    pub high_sigma: f32,
    pub max_iterations: u32,
    pub low_pct: f32,
    pub high_pct: f32,
    pub scale: ScalingPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statsec: Option<StatSection>,
    /// Fill value for NaN/Inf input samples.
    pub blank: f32,
    /// Allow replacing an existing master.
    pub overwrite: bool,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            combine_method: CombineMethod::Median,
            reject_method: RejectMethod::None,
            nlow: 1,
            nhigh: 1,
            low_sigma: 3.0,
            high_sigma: 3.0,
            max_iterations: 10,
            low_pct: 10.0,
            high_pct: 90.0,
            scale: ScalingPolicy::None,
            statsec: None,
            blank: DEFAULT_BLANK,
            overwrite: false,
        }
    }
}

impl CombineConfig {
    /// The active rejection policy with its parameters.
    pub fn rejection_policy(&self) -> RejectionPolicy {
        match self.reject_method {
            RejectMethod::None => RejectionPolicy::None,
            RejectMethod::Minmax => RejectionPolicy::MinMax {
                nlow: self.nlow,
                nhigh: self.nhigh,
            },
            RejectMethod::Sigclip => RejectionPolicy::SigmaClip {
                low_sigma: self.low_sigma,
                high_sigma: self.high_sigma,
                max_iterations: self.max_iterations,
            },
            RejectMethod::Pclip => RejectionPolicy::PercentileClip {
                low_pct: self.low_pct,
                high_pct: self.high_pct,
            },
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            blank: self.blank,
            statsec: self.statsec,
        }
    }

    /// Check every frame-independent constraint.
    pub fn validate(&self) -> Result<()> {
        self.rejection_policy().validate()?;
        if let Some(sec) = self.statsec {
            sec.check_order()?;
        }
        if !self.blank.is_finite() {
            return Err(MasterFrameError::InvalidConfig(format!(
                "blank must be a finite number, got {}",
                self.blank
            )));
        }
        Ok(())
    }
}
