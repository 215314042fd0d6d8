//! Exemption aggregate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ExemptionStatus;
use crate::domain::foundation::{
    ExemptionId, MemberId, Percentage, StateMachine, Timestamp, ValidationError,
};

/// Total waivers always cover 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionKind {
    Total,
    Partial,
}

impl ExemptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExemptionKind::Total => "total",
            ExemptionKind::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "total" => Some(ExemptionKind::Total),
            "partial" => Some(ExemptionKind::Partial),
            _ => None,
        }
    }
}

/// An approved, time-ranged waiver of a member's dues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exemption {
    pub id: ExemptionId,
    pub member_id: MemberId,
    pub kind: ExemptionKind,
    pub percentage: Percentage,
    pub reason: String,
    pub status: ExemptionStatus,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
    pub created_at: Timestamp,
}

impl Exemption {
    /// Files a new exemption request awaiting approval.
    ///
    /// `Total` ignores `percentage` and uses 100%. `Partial` needs a non-zero
    /// percentage.
    pub fn request(
        member_id: MemberId,
        kind: ExemptionKind,
        percentage: Percentage,
        reason: impl Into<String>,
        valid_from: NaiveDate,
        valid_to: Option<NaiveDate>,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ValidationError::empty_field("reason"));
        }
        let percentage = match kind {
            ExemptionKind::Total => Percentage::HUNDRED,
            ExemptionKind::Partial if percentage.is_zero() => {
                return Err(ValidationError::out_of_range("percentage", "0.01", 100, percentage));
            }
            ExemptionKind::Partial => percentage,
        };
        if let Some(to) = valid_to {
            if to < valid_from {
                return Err(ValidationError::invalid_format(
                    "valid_to",
                    format!("{} is before valid_from {}", to, valid_from),
                ));
            }
        }

        Ok(Self {
            id: ExemptionId::new(),
            member_id,
            kind,
            percentage,
            reason,
            status: ExemptionStatus::PendingApproval,
            valid_from,
            valid_to,
            active: true,
            created_at,
        })
    }

    pub fn approve(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(ExemptionStatus::Approved)?;
        Ok(())
    }

    /// Puts an approved exemption in force.
    pub fn activate(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(ExemptionStatus::Vigente)?;
        Ok(())
    }

    pub fn reject(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(ExemptionStatus::Rejected)?;
        self.active = false;
        Ok(())
    }

    pub fn revoke(&mut self) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(ExemptionStatus::Revoked)?;
        self.active = false;
        Ok(())
    }

    /// Percentage actually waived.
    pub fn effective_percentage(&self) -> Percentage {
        match self.kind {
            ExemptionKind::Total => Percentage::HUNDRED,
            ExemptionKind::Partial => self.percentage,
        }
    }

    /// True when the exemption reduces a fee referenced at `at`.
    ///
    /// Exemptions whose `valid_to` lies before `today` have lapsed, even if
    /// no sweep has moved them out of `Vigente` yet.
    pub fn is_in_effect(&self, at: NaiveDate, today: NaiveDate) -> bool {
        self.active
            && self.status == ExemptionStatus::Vigente
            && self.valid_from <= at
            && self.valid_to.map_or(true, |to| at <= to && today <= to)
    }
}
