//! Exemption reader port.
//!
//! Exemptions lapse once `valid_to` has passed; no job is required to flip
//! their status, so implementations filter by date at read time.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::exemption::Exemption;
use crate::domain::foundation::{DomainError, MemberId};

#[async_trait]
pub trait ExemptionReader: Send + Sync {
    /// Exemptions of a member in the `Vigente` state that cover `at`.
    ///
    /// May return more than one row; the evaluator picks one and the
    /// caller reports the rest.
    async fn in_effect_for_member(
        &self,
        member_id: &MemberId,
        at: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<Exemption>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exemption_reader_is_object_safe() {
        fn _accepts_dyn(_reader: &dyn ExemptionReader) {}
    }
}
