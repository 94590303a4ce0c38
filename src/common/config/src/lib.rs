//! Configuration management for Sluice.
//!
//! Provides settings for the optimizer, the code generator and the plan
//! registry. Every section has a serde default, so a configuration file only
//! needs to name the values it overrides.

use std::path::{Path, PathBuf};

use common_error::{SluiceError, SluiceResult};
use serde::{Deserialize, Serialize};

/// Global Sluice configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SluiceConfig {
    /// Optimizer configuration.
    pub optimizer: OptimizerSettings,
    /// Code generation configuration.
    pub codegen: CodegenSettings,
    /// Plan registry configuration.
    pub runtime: RuntimeSettings,
}

impl SluiceConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> SluiceResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SluiceError::parse(format!("invalid configuration: {e}")))
    }

    /// Read a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> SluiceResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize the configuration as pretty-printed JSON.
    pub fn to_json_string(&self) -> SluiceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Override the optimization level, keeping the other settings.
    pub fn with_optimization_level(mut self, level: u32) -> Self {
        self.optimizer.level = level;
        self
    }
}

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Optimization level: 0 runs no passes, 1 pushes predicates down,
    /// 2 and above also fuse projections.
    pub level: u32,
    /// Maximum number of fixpoint iterations over the pass list.
    pub max_iterations: usize,
    /// Record a before/after explain trace for every rule application.
    pub enable_trace: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            level: 1,
            max_iterations: 16,
            enable_trace: false,
        }
    }
}

/// Code generation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenSettings {
    /// File name of the generated source.
    pub source_file: PathBuf,
    /// File name of the generated header.
    pub header_file: PathBuf,
    /// Emit a comment before every operator's declaration.
    pub emit_comments: bool,
}

impl Default for CodegenSettings {
    fn default() -> Self {
        Self {
            source_file: PathBuf::from("execute.cpp"),
            header_file: PathBuf::from("execute.h"),
            emit_comments: true,
        }
    }
}

/// Plan registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Upper bound on registered plans; `None` means unbounded.
    pub max_plans: Option<usize>,
}
