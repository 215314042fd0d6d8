//! Configuration errors

use thiserror::Error;

/// Failure to produce a usable [`super::AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A loaded value that the engine cannot run with.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    #[error("database url must use the postgres:// or postgresql:// scheme")]
    UnsupportedDatabaseScheme,

    #[error("database pool min_connections ({min}) exceeds max_connections ({max})")]
    PoolBoundsInverted { min: u32, max: u32 },

    #[error("database pool max_connections ({max}) is above the limit of {limit}")]
    PoolTooLarge { max: u32, limit: u32 },

    #[error("generation concurrency must be between 1 and {limit}, got {value}")]
    InvalidConcurrency { value: usize, limit: usize },
}
