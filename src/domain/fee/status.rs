//! Fee and receipt status.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a fee record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    /// Created inside a generation transaction, items not yet written.
    Draft,

    /// Produced by batch generation.
    Generated,

    /// Totals were changed by at least one recalculation.
    Recalculated,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Draft => "draft",
            FeeStatus::Generated => "generated",
            FeeStatus::Recalculated => "recalculated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(FeeStatus::Draft),
            "generated" => Some(FeeStatus::Generated),
            "recalculated" => Some(FeeStatus::Recalculated),
            _ => None,
        }
    }
}

impl StateMachine for FeeStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use FeeStatus::*;
        matches!(
            (self, target),
            (Draft, Generated)
                | (Generated, Recalculated)
                | (Recalculated, Recalculated)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use FeeStatus::*;
        match self {
            Draft => vec![Generated],
            Generated => vec![Recalculated],
            Recalculated => vec![Recalculated],
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the receipt a fee belongs to.
///
/// Receipts are owned by the payments side; the fee engine only creates
/// them, rewrites their amount, and refuses to touch paid ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Paid,
    Cancelled,
}

impl ReceiptStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, ReceiptStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Paid => "paid",
            ReceiptStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReceiptStatus::Pending),
            "paid" => Some(ReceiptStatus::Paid),
            "cancelled" => Some(ReceiptStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
