//! Fee engine configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::DEFAULT_BASE_AMOUNT_KEY_PREFIX;

/// Upper bound for members generated concurrently.
pub const MAX_GENERATION_CONCURRENCY: usize = 32;

/// Fee engine behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Actor recorded in history rows when a command names none
    #[serde(default = "default_actor")]
    pub default_actor: String,

    /// Run the discount-rule layer during generation
    #[serde(default = "default_true")]
    pub apply_discount_rules_on_generate: bool,

    /// Run the discount-rule layer during recalculation and preview
    #[serde(default = "default_true")]
    pub apply_discount_rules_on_recalculate: bool,

    /// Members generated at once, each in its own transaction
    #[serde(default = "default_generation_concurrency")]
    pub generation_concurrency: usize,

    /// Configuration-store key prefix for per-category base amount overrides
    #[serde(default = "default_base_amount_key_prefix")]
    pub base_amount_key_prefix: String,
}

impl EngineConfig {
    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_actor.trim().is_empty() {
            return Err(ValidationError::MissingRequired("ENGINE_DEFAULT_ACTOR"));
        }
        if self.generation_concurrency == 0
            || self.generation_concurrency > MAX_GENERATION_CONCURRENCY
        {
            return Err(ValidationError::InvalidConcurrency {
                value: self.generation_concurrency,
                limit: MAX_GENERATION_CONCURRENCY,
            });
        }
        if self.base_amount_key_prefix.is_empty() {
            return Err(ValidationError::MissingRequired("ENGINE_BASE_AMOUNT_KEY_PREFIX"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_actor: default_actor(),
            apply_discount_rules_on_generate: true,
            apply_discount_rules_on_recalculate: true,
            generation_concurrency: default_generation_concurrency(),
            base_amount_key_prefix: default_base_amount_key_prefix(),
        }
    }
}

fn default_actor() -> String {
    "system".to_string()
}

fn default_true() -> bool {
    true
}

fn default_generation_concurrency() -> usize {
    1
}

fn default_base_amount_key_prefix() -> String {
    DEFAULT_BASE_AMOUNT_KEY_PREFIX.to_string()
}
