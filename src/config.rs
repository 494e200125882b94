//! Chain configuration files
//!
//! A chain can be described in JSON instead of picking a built-in algorithm:
//!
//! ```json
//! {
//!   "name": "tt10-like",
//!   "prefix": [],
//!   "permuted": {
//!     "pool": ["blake", "bmw", "groestl", "skein", "jh"],
//!     "base_timestamp": 1492973331,
//!     "strategy": "generative",
//!     "midstate": true
//!   },
//!   "output": "final"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algorithm::{
    Algorithm, ChainSpec, OutputWindow, PermutedSection, PrimitiveId, Strategy, UnknownPrimitive,
};

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Invalid chain configuration: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error(transparent)]
    UnknownPrimitive(#[from] UnknownPrimitive),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyConfig {
    Table,
    #[default]
    Generative,
}

impl From<StrategyConfig> for Strategy {
    fn from(config: StrategyConfig) -> Self {
        match config {
            StrategyConfig::Table => Strategy::Table,
            StrategyConfig::Generative => Strategy::Generative,
        }
    }
}

impl From<Strategy> for StrategyConfig {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Table => StrategyConfig::Table,
            Strategy::Generative => StrategyConfig::Generative,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PermutedConfig {
    pub pool: Vec<String>,
    pub base_timestamp: u32,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub midstate: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputConfig {
    #[default]
    Final,
    Stage(usize),
}

/// A chain as written in a configuration file
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    pub name: String,
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default)]
    pub permuted: Option<PermutedConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn parse_ids(names: &[String]) -> Result<Vec<PrimitiveId>, UnknownPrimitive> {
    names.iter().map(|name| name.parse()).collect()
}

fn names(ids: &[PrimitiveId]) -> Vec<String> {
    ids.iter().map(|id| id.name().to_string()).collect()
}

impl ChainConfig {
    /// Load a configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigFileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigFileError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve primitive names into a chain description
    pub fn to_spec(&self) -> Result<ChainSpec, ConfigFileError> {
        let permuted = match &self.permuted {
            Some(section) => Some(PermutedSection {
                pool: parse_ids(&section.pool)?,
                base_timestamp: section.base_timestamp,
                strategy: section.strategy.into(),
                midstate: section.midstate,
            }),
            None => None,
        };

        Ok(ChainSpec {
            name: self.name.clone(),
            prefix: parse_ids(&self.prefix)?,
            permuted,
            output: match self.output {
                OutputConfig::Final => OutputWindow::Final,
                OutputConfig::Stage(stage) => OutputWindow::Stage(stage),
            },
        })
    }
}

impl From<&ChainSpec> for ChainConfig {
    fn from(spec: &ChainSpec) -> Self {
        Self {
            name: spec.name.clone(),
            prefix: names(&spec.prefix),
            permuted: spec.permuted.as_ref().map(|section| PermutedConfig {
                pool: names(&section.pool),
                base_timestamp: section.base_timestamp,
                strategy: section.strategy.into(),
                midstate: section.midstate,
            }),
            output: match spec.output {
                OutputWindow::Final => OutputConfig::Final,
                OutputWindow::Stage(stage) => OutputConfig::Stage(stage),
            },
        }
    }
}

impl From<Algorithm> for ChainConfig {
    fn from(algorithm: Algorithm) -> Self {
        Self::from(&algorithm.spec())
    }
}

/// Directory searched for configurations given by bare name
#[cfg(feature = "cli")]
pub fn default_config_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".chainhash")
}

/// `reference` itself if it exists, otherwise `<dir>/<reference>.json`
pub fn resolve_config_path(reference: &str, dir: &Path) -> PathBuf {
    let direct = PathBuf::from(reference);
    if direct.exists() {
        return direct;
    }
    dir.join(format!("{reference}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_documented_example() {
        let config = ChainConfig::from_json(
            r#"{
                "name": "tt10-like",
                "prefix": [],
                "permuted": {
                    "pool": ["blake", "bmw", "groestl", "skein", "jh"],
                    "base_timestamp": 1492973331,
                    "strategy": "generative",
                    "midstate": true
                },
                "output": "final"
            }"#,
        )
        .unwrap();

        let spec = config.to_spec().unwrap();
        assert_eq!(spec.stage_count(), 5);
        let section = spec.permuted.unwrap();
        assert_eq!(section.pool[4], PrimitiveId::Jh);
        assert_eq!(section.strategy, Strategy::Generative);
        assert!(section.midstate);
    }

    #[test]
    fn test_defaults_and_stage_window() {
        let config =
            ChainConfig::from_json(r#"{"name": "pair", "prefix": ["jh", "keccak"], "output": {"stage": 0}}"#)
                .unwrap();
        assert_eq!(config.permuted, None);
        assert_eq!(config.output, OutputConfig::Stage(0));
        assert_eq!(config.to_spec().unwrap().output, OutputWindow::Stage(0));

        let minimal = ChainConfig::from_json(r#"{"name": "x"}"#).unwrap();
        assert!(minimal.prefix.is_empty());
        assert_eq!(minimal.output, OutputConfig::Final);
    }

    #[test]
    fn test_unknown_primitive() {
        let config = ChainConfig::from_json(r#"{"name": "bad", "prefix": ["sha256"]}"#).unwrap();
        assert!(matches!(
            config.to_spec(),
            Err(ConfigFileError::UnknownPrimitive(UnknownPrimitive(name))) if name == "sha256"
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ChainConfig::from_json(r#"{"prefix": []}"#),
            Err(ConfigFileError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_builtin_algorithms_survive_conversion() {
        for algorithm in Algorithm::ALL {
            let config = ChainConfig::from(algorithm);
            let json = serde_json::to_string(&config).unwrap();
            let parsed = ChainConfig::from_json(&json).unwrap();
            assert_eq!(parsed.to_spec().unwrap(), algorithm.spec());
        }
    }

    #[test]
    fn test_file_round_trip_and_resolution() {
        let dir = std::env::temp_dir().join(format!("chainhash-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let config = ChainConfig::from(Algorithm::Timetravel);
        let path = dir.join("legacy.json");
        config.save_to_file(&path).unwrap();

        assert_eq!(resolve_config_path("legacy", &dir), path);
        assert_eq!(ChainConfig::load_from_file(&path).unwrap(), config);
        assert!(matches!(
            ChainConfig::load_from_file(&dir.join("missing.json")),
            Err(ConfigFileError::FileError(_))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
