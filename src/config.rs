//! Configuration file schema for securegen.
//!
//! Every field has a default, so an empty file (or no file at all) is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::detect::RulePackSelector;

/// Config file names searched for in the current directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["securegen.yaml", ".securegen.yaml"];

/// Errors loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Parent directory for temporary project roots (default: system temp dir)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a configuration from YAML text. Empty text yields the defaults.
    pub fn parse_str(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load `explicit` if given, else the first default file found in `dir`,
    /// else the built-in defaults. Returns the path that was loaded, if any.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::parse_file(path)?, Some(path.to_path_buf())));
        }
        match discover(dir) {
            Some(path) => Ok((Self::parse_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Rule-pack selector configured by the `analysis` section.
    pub fn pack_selector(&self) -> RulePackSelector {
        let mut selector = RulePackSelector::new();
        if let Some(baseline) = &self.analysis.baseline_packs {
            selector = selector.baseline(baseline.iter().cloned());
        }
        for (lang, packs) in &self.analysis.extra_packs {
            selector = selector.extra_packs(lang, packs.iter().cloned());
        }
        selector
    }
}

/// Find a default config file in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Settings for the analysis tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Analysis binary name or path (default: semgrep)
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Per-rule timeout passed to the tool in seconds (default: 180)
    #[serde(default = "default_rule_timeout")]
    pub rule_timeout_secs: u64,
    /// Wall-clock limit for the whole scan in seconds (default: 600)
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,
    /// Replaces the built-in baseline packs when set
    #[serde(default)]
    pub baseline_packs: Option<Vec<String>>,
    /// Additional packs per language, selected after the built-in ones
    #[serde(default)]
    pub extra_packs: BTreeMap<String, Vec<String>>,
    /// Extra raw arguments for the tool
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary() -> String {
    "semgrep".to_string()
}

fn default_rule_timeout() -> u64 {
    180
}

fn default_scan_timeout() -> u64 {
    600
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            rule_timeout_secs: default_rule_timeout(),
            scan_timeout_secs: default_scan_timeout(),
            baseline_packs: None,
            extra_packs: BTreeMap::new(),
            extra_args: Vec::new(),
        }
    }
}

/// Settings for the generation service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// URL of the streaming generation service
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Limit for receiving the whole generated stream in seconds (default: 120)
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_generation_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_generation_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Settings for prompt handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptConfig {
    /// Version tag reported with every run
    #[serde(default = "default_policy_version")]
    pub policy_version: String,
    /// Maximum prompt length in characters after sanitization (default: 8000)
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_policy_version() -> String {
    crate::collab::DEFAULT_POLICY_VERSION.to_string()
}

fn default_max_chars() -> usize {
    8000
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            policy_version: default_policy_version(),
            max_chars: default_max_chars(),
        }
    }
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let analysis = &config.analysis;
    if analysis.binary.trim().is_empty() {
        return Err(ConfigError::Invalid("analysis.binary is empty".to_string()));
    }
    if analysis.rule_timeout_secs == 0 || analysis.scan_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "analysis timeouts must be greater than zero".to_string(),
        ));
    }

    let all_packs = analysis
        .baseline_packs
        .iter()
        .flatten()
        .chain(analysis.extra_packs.values().flatten());
    for pack in all_packs {
        if pack.trim().is_empty() {
            return Err(ConfigError::Invalid("empty rule pack identifier".to_string()));
        }
    }

    if let Some(endpoint) = &config.generation.endpoint {
        let url = reqwest::Url::parse(endpoint).map_err(|e| {
            ConfigError::Invalid(format!("invalid generation.endpoint {:?}: {}", endpoint, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "generation.endpoint must be http or https, got {:?}",
                url.scheme()
            )));
        }
    }
    if config.generation.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "generation.timeout_secs must be greater than zero".to_string(),
        ));
    }

    if config.prompt.max_chars == 0 {
        return Err(ConfigError::Invalid(
            "prompt.max_chars must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
