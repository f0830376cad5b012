//! Pointer-analysis configuration
//!
//! `PtaConfig` is passed by value into the analysis; there is no global state.
//! YAML files use the same field names:
//!
//! ```yaml
//! k_limit: 2
//! output_dir: out/pta
//! detect_type_diff: true
//! dot_dump: false
//! call_graph_algorithm: rta
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Deepest supported call-string length
pub const MAX_K_LIMIT: usize = 5;

/// Direct call-graph algorithm (used for default entries and `callgraph` output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallGraphKind {
    /// Class hierarchy analysis
    #[default]
    Cha,
    /// Rapid type analysis
    Rta,
}

/// Pointer-analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PtaConfig {
    /// Call-string depth (0 = context-insensitive)
    pub k_limit: usize,

    /// Directory for dot dumps and reports
    pub output_dir: PathBuf,

    /// Report pointees whose class disagrees with the declared type
    pub detect_type_diff: bool,

    /// Dump PAG and call graph in dot format
    pub dot_dump: bool,

    pub call_graph_algorithm: CallGraphKind,
}

impl Default for PtaConfig {
    fn default() -> Self {
        Self {
            k_limit: 1,
            output_dir: PathBuf::from("out/pta"),
            detect_type_diff: false,
            dot_dump: false,
            call_graph_algorithm: CallGraphKind::Cha,
        }
    }
}

impl PtaConfig {
    /// Validated constructor
    pub fn new(k_limit: usize, output_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config = Self {
            k_limit,
            output_dir: output_dir.into(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.k_limit > MAX_K_LIMIT {
            return Err(ConfigError::range_with_hint(
                "k_limit",
                self.k_limit,
                0,
                MAX_K_LIMIT,
                "Call-string depth beyond 5 is not supported",
            ));
        }
        Ok(())
    }

    /// Builder: Set k_limit
    pub fn k_limit(mut self, v: usize) -> Self {
        self.k_limit = v;
        self
    }

    /// Builder: Set output_dir
    pub fn output_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.output_dir = v.into();
        self
    }

    /// Builder: Set detect_type_diff
    pub fn detect_type_diff(mut self, v: bool) -> Self {
        self.detect_type_diff = v;
        self
    }

    /// Builder: Set dot_dump
    pub fn dot_dump(mut self, v: bool) -> Self {
        self.dot_dump = v;
        self
    }

    /// Builder: Set call_graph_algorithm
    pub fn call_graph_algorithm(mut self, v: CallGraphKind) -> Self {
        self.call_graph_algorithm = v;
        self
    }

    /// Whether anything is written under `output_dir`
    pub fn writes_output(&self) -> bool {
        self.dot_dump || self.detect_type_diff
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
