//! Discount rule reader port.
//!
//! # Example
//!
//! ```ignore
//! let configuration = reader.configuration().await?;
//! let rules = reader.active_rules().await?;
//! let rule_set = RuleSet::new(configuration, rules, tables);
//! ```

use async_trait::async_trait;

use crate::domain::discount::{DiscountConfiguration, DiscountRule};
use crate::domain::foundation::DomainError;

/// Read access to the discount rule catalog.
#[async_trait]
pub trait DiscountRuleReader: Send + Sync {
    /// The active discount configuration, or the default when none is set.
    async fn configuration(&self) -> Result<DiscountConfiguration, DomainError>;

    /// Active rules. Ordering is applied by `RuleSet`.
    async fn active_rules(&self) -> Result<Vec<DiscountRule>, DomainError>;
}
