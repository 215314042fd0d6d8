//! Business configuration store port.
//!
//! Key/value settings maintained by operators: per-category base amount
//! overrides and the lookup tables used by discount rules. This is distinct
//! from process configuration in [`crate::config`].
//!
//! # Keys
//!
//! - `{base_amount_key_prefix}{CATEGORY_CODE}` - base amount override
//! - `{table}.{key}` - one row of a discount lookup table

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Raw value of one key, `None` when unset.
    async fn get_by_key(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// All entries whose key starts with `prefix`, keyed by the remainder.
    async fn entries_with_prefix(&self, prefix: &str)
        -> Result<HashMap<String, String>, DomainError>;
}
