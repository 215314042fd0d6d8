//! Member catalog port.
//!
//! Members, categories and family links are maintained elsewhere; the fee
//! engine only reads them.
//!
//! # Example
//!
//! ```ignore
//! async fn base_for(catalog: &dyn MemberCatalog, member: &MemberProfile) -> Option<Money> {
//!     let category = catalog.find_category(&member.category_id).await.ok()??;
//!     Some(category.base_amount)
//! }
//! ```

use async_trait::async_trait;

use super::FeeScope;
use crate::domain::foundation::{BillingPeriod, CategoryId, DomainError, MemberId};
use crate::domain::member::{Category, FamilyDiscount, MemberProfile};

/// Read access to members and categories.
#[async_trait]
pub trait MemberCatalog: Send + Sync {
    async fn find_member(&self, id: &MemberId) -> Result<Option<MemberProfile>, DomainError>;

    /// Category with its catalog base amount.
    async fn find_category(&self, id: &CategoryId) -> Result<Option<Category>, DomainError>;

    /// Active members in `scope` that have no fee for `period` yet.
    ///
    /// Ordered by display name, then id, so batch output is stable.
    async fn members_needing_fee(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
    ) -> Result<Vec<MemberProfile>, DomainError>;

    /// Family links of a member. Empty when the member has none.
    async fn family_discount(&self, member_id: &MemberId) -> Result<FamilyDiscount, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_catalog_is_object_safe() {
        fn _accepts_dyn(_catalog: &dyn MemberCatalog) {}
    }
}
