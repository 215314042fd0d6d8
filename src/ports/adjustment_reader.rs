//! Manual adjustment reader port.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::adjustment::ManualAdjustment;
use crate::domain::foundation::{DomainError, MemberId};

/// Read access to staff-entered adjustments.
#[async_trait]
pub trait AdjustmentReader: Send + Sync {
    /// Active adjustments of a member whose validity range covers `at`.
    ///
    /// Order is not significant; the calculator sorts by creation.
    async fn active_for_member(
        &self,
        member_id: &MemberId,
        at: NaiveDate,
    ) -> Result<Vec<ManualAdjustment>, DomainError>;
}
