//! Activity catalog port.

use async_trait::async_trait;

use crate::domain::foundation::{BillingPeriod, DomainError, MemberId};
use crate::domain::member::ActivityEnrollment;

/// Read access to a member's activity enrollments.
#[async_trait]
pub trait ActivityCatalog: Send + Sync {
    /// Enrollments of the member that may be billed in `period`.
    ///
    /// Implementations may return extra rows; the composer re-checks
    /// billability at the period start.
    async fn enrollments_for(
        &self,
        member_id: &MemberId,
        period: BillingPeriod,
    ) -> Result<Vec<ActivityEnrollment>, DomainError>;
}
