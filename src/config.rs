use crate::application::ArrivalMode;
use crate::common::{ConfigError, ConfigResult};
use crate::domains::bridge::AdmissionPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use anyhow::Result;

/// Environment variables with this prefix override file settings,
/// e.g. `BRIDGE__SIMULATION__NORTHBOUND_AGENTS=8`.
pub const ENV_PREFIX: &str = "BRIDGE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub crossing: CrossingConfig,
    pub arrival: ArrivalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub northbound_agents: usize,
    pub southbound_agents: usize,
    pub policy: AdmissionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrivalConfig {
    pub mode: ArrivalMode,
    pub max_stagger_ms: u64,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub file: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            northbound_agents: 5,
            southbound_agents: 5,
            policy: AdmissionPolicy::Classic,
        }
    }
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self {
            min_ms: 1000,
            max_ms: 3000,
        }
    }
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            mode: ArrivalMode::Staggered,
            max_stagger_ms: 500,
            seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_toml_str(&content)?)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Layered load: built-in defaults, then the optional TOML file, then
    /// `BRIDGE__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.crossing.min_ms > self.crossing.max_ms {
            return Err(ConfigError::InvalidCrossingWindow {
                min_ms: self.crossing.min_ms,
                max_ms: self.crossing.max_ms,
            });
        }
        Ok(())
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .filter
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}
