//! Fee reader port.
//!
//! Read side for fees and their items. Used to locate the fees a command
//! applies to and to build previews. Writes go through
//! [`FeeTransaction`](super::FeeTransaction) instead.
//!
//! # Example
//!
//! ```ignore
//! async fn paid_fees(reader: &dyn FeeReader, period: BillingPeriod) -> Vec<FeeId> {
//!     reader
//!         .find_in_scope(period, &FeeScope::all())
//!         .await
//!         .unwrap_or_default()
//!         .into_iter()
//!         .filter(Fee::is_paid)
//!         .map(|fee| fee.id)
//!         .collect()
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::fee::Fee;
use crate::domain::foundation::{BillingPeriod, CategoryId, DomainError, FeeId, MemberId};

/// Narrows a batch command to some categories and/or members.
///
/// Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeScope {
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub member_ids: Vec<MemberId>,
}

impl FeeScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_categories(category_ids: Vec<CategoryId>) -> Self {
        Self {
            category_ids,
            member_ids: Vec::new(),
        }
    }

    pub fn for_members(member_ids: Vec<MemberId>) -> Self {
        Self {
            category_ids: Vec::new(),
            member_ids,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.category_ids.is_empty() && self.member_ids.is_empty()
    }

    /// True when a member in the given category falls inside the scope.
    pub fn matches(&self, member_id: &MemberId, category_id: &CategoryId) -> bool {
        (self.category_ids.is_empty() || self.category_ids.contains(category_id))
            && (self.member_ids.is_empty() || self.member_ids.contains(member_id))
    }
}

/// Reader port for persisted fees.
#[async_trait]
pub trait FeeReader: Send + Sync {
    /// Loads a fee with its items and the status of its receipt.
    ///
    /// Returns `None` if the fee does not exist.
    async fn find_by_id(&self, id: &FeeId) -> Result<Option<Fee>, DomainError>;

    /// Lists the fees of a period that fall inside `scope`, with items.
    ///
    /// Ordered by creation time, then id.
    async fn find_in_scope(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
    ) -> Result<Vec<Fee>, DomainError>;
}
