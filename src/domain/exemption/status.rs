//! Exemption approval lifecycle.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Approval state of an exemption.
///
/// Only `Vigente` exemptions reduce fees. Lapsing past `valid_to` is a
/// read-time filter, not a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionStatus {
    /// Requested, awaiting a decision.
    PendingApproval,

    /// Approved but not yet in force.
    Approved,

    /// In force.
    Vigente,

    /// Declined. Terminal.
    Rejected,

    /// Withdrawn while in force. Terminal.
    Revoked,
}

impl ExemptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExemptionStatus::PendingApproval => "pending_approval",
            ExemptionStatus::Approved => "approved",
            ExemptionStatus::Vigente => "vigente",
            ExemptionStatus::Rejected => "rejected",
            ExemptionStatus::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_approval" => Some(ExemptionStatus::PendingApproval),
            "approved" => Some(ExemptionStatus::Approved),
            "vigente" => Some(ExemptionStatus::Vigente),
            "rejected" => Some(ExemptionStatus::Rejected),
            "revoked" => Some(ExemptionStatus::Revoked),
            _ => None,
        }
    }
}

impl StateMachine for ExemptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ExemptionStatus::*;
        matches!(
            (self, target),
            (PendingApproval, Approved)
                | (PendingApproval, Rejected)
                | (Approved, Vigente)
                | (Vigente, Revoked)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ExemptionStatus::*;
        match self {
            PendingApproval => vec![Approved, Rejected],
            Approved => vec![Vigente],
            Vigente => vec![Revoked],
            Rejected | Revoked => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExemptionStatus::*;

    #[test]
    fn approval_path_reaches_vigente() {
        let s = PendingApproval.transition_to(Approved).unwrap();
        let s = s.transition_to(Vigente).unwrap();
        assert_eq!(s, Vigente);
    }

    #[test]
    fn pending_cannot_skip_to_vigente() {
        assert!(PendingApproval.transition_to(Vigente).is_err());
    }

    #[test]
    fn rejected_and_revoked_are_terminal() {
        assert!(Rejected.is_terminal());
        assert!(Revoked.is_terminal());
        assert!(!Vigente.is_terminal());
    }

    #[test]
    fn approved_cannot_be_revoked() {
        assert!(!Approved.can_transition_to(&Revoked));
    }

    #[test]
    fn every_listed_transition_is_allowed() {
        for status in [PendingApproval, Approved, Vigente, Rejected, Revoked] {
            for target in status.valid_transitions() {
                assert!(status.can_transition_to(&target));
            }
            assert_eq!(ExemptionStatus::parse(status.as_str()), Some(status));
        }
    }
}
