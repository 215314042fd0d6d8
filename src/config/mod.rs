//! Process configuration for the `dues-engine` binary.
//!
//! Read from `DUES_ENGINE__*` environment variables (a `.env` file is
//! honoured in development). Sections nest with `__`, so
//! `DUES_ENGINE__DATABASE__MAX_CONNECTIONS=20` sets `database.max_connections`.
//!
//! Business settings such as base-amount overrides and discount lookup tables
//! are not process configuration; they live behind the `ConfigStore` port.
//!
//! ```no_run
//! use dues_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("configuration");
//! config.validate().expect("valid configuration");
//! assert!(config.engine.generation_concurrency >= 1);
//! ```

mod database;
mod engine;
mod error;
mod logging;

pub use database::DatabaseConfig;
pub use engine::{EngineConfig, MAX_GENERATION_CONCURRENCY};
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;

use serde::Deserialize;

/// Everything the binary needs to run one command.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and the `DUES_ENGINE__*` environment.
    ///
    /// Fails when `database.url` is absent or a value does not parse into
    /// its field's type. Range checks are left to [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("DUES_ENGINE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.engine.validate()?;
        self.logging.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Environment variables are process-wide.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("DUES_ENGINE__DATABASE__URL", "postgresql://test@localhost/test");
    }

    fn clear_env() {
        env::remove_var("DUES_ENGINE__DATABASE__URL");
        env::remove_var("DUES_ENGINE__ENGINE__GENERATION_CONCURRENCY");
        env::remove_var("DUES_ENGINE__ENGINE__APPLY_DISCOUNT_RULES_ON_GENERATE");
        env::remove_var("DUES_ENGINE__LOGGING__JSON");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.engine.generation_concurrency, 1);
        assert!(!config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("DUES_ENGINE__ENGINE__GENERATION_CONCURRENCY", "8");
        env::set_var("DUES_ENGINE__ENGINE__APPLY_DISCOUNT_RULES_ON_GENERATE", "false");
        env::set_var("DUES_ENGINE__LOGGING__JSON", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.engine.generation_concurrency, 8);
        assert!(!config.engine.apply_discount_rules_on_generate);
        assert!(config.logging.json);
    }

    #[test]
    fn test_invalid_concurrency_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("DUES_ENGINE__ENGINE__GENERATION_CONCURRENCY", "64");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidConcurrency { value: 64, .. })
        ));
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
