//! Engine configuration.
//!
//! Every section is optional in TOML; missing keys fall back to
//! [`Config::default`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clause scheduling switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Group clauses by shared synonyms and schedule them. When off, every
    /// clause runs in declaration order as one group.
    pub enabled: bool,
    /// Order groups by synonym count. When off, groups keep creation order
    /// behind the constant-only group.
    pub group_ordering: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            group_ordering: true,
        }
    }
}

/// Join behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Groups sharing no synonym with the select list are checked for a
    /// result and then dropped instead of joined.
    pub prune_unselected_groups: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            prune_unselected_groups: true,
        }
    }
}

/// Log filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pkbql=info".to_string(),
        }
    }
}

/// Counter collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilingConfig {
    /// Collect evaluation counters, see [`crate::query::profile`].
    pub enabled: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[optimizer]`
    pub optimizer: OptimizerConfig,
    /// `[evaluator]`
    pub evaluator: EvaluatorConfig,
    /// `[logging]`
    pub logging: LoggingConfig,
    /// `[profiling]`
    pub profiling: ProfilingConfig,
}

impl Config {
    /// Verbose logging and profiling, no pruning so every group shows up in
    /// the final table.
    pub fn debugging() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            evaluator: EvaluatorConfig {
                prune_unselected_groups: false,
            },
            logging: LoggingConfig {
                filter: "pkbql=trace".to_string(),
            },
            profiling: ProfilingConfig { enabled: true },
        }
    }

    /// Quiet logging with profiling on.
    pub fn benchmark() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            evaluator: EvaluatorConfig::default(),
            logging: LoggingConfig {
                filter: "pkbql=warn".to_string(),
            },
            profiling: ProfilingConfig { enabled: true },
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::ParseStr { source })
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let serialized =
            toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })?;
        fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Failures loading or saving a [`Config`].
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse config: {source}")]
    ParseStr { source: toml::de::Error },
    #[error("failed to serialize config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "ConfigRead",
            ConfigError::Parse { .. } | ConfigError::ParseStr { .. } => "ConfigParse",
            ConfigError::Serialize { .. } => "ConfigSerialize",
            ConfigError::Write { .. } => "ConfigWrite",
        }
    }
}
