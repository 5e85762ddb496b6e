use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid crossing window: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidCrossingWindow { min_ms: u64, max_ms: u64 },

    #[error("Unknown admission policy: {0}")]
    UnknownPolicy(String),

    #[error("Unknown arrival mode: {0}")]
    UnknownArrivalMode(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Agent task failed: {0}")]
    AgentTask(#[from] tokio::task::JoinError),

    #[error("Bridge event actor failed: {0}")]
    EventActor(tokio::task::JoinError),

    #[error("Bridge invariant violated: {0}")]
    InvariantViolated(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type SimulationResult<T> = Result<T, SimulationError>;
