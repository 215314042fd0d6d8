//! Rule application audit records.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    FeeId, LineItemId, Money, Percentage, RuleApplicationId, RuleId, Timestamp,
};

/// Immutable record of one rule discounting one item of a fee.
///
/// Rows are never rewritten. A recalculation appends a fresh set and stamps
/// `superseded_at` on the set it replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleApplication {
    pub id: RuleApplicationId,
    pub rule_id: RuleId,
    pub fee_id: FeeId,
    /// The discount item created for this application.
    pub line_item_id: LineItemId,
    /// The charge item that was discounted.
    pub target_item_id: LineItemId,
    pub applied_percentage: Percentage,
    /// Positive amount discounted.
    pub discount_amount: Money,
    pub metadata: serde_json::Value,
    pub applied_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_at: Option<Timestamp>,
}

impl RuleApplication {
    /// True while this row belongs to the fee's latest calculation.
    pub fn is_current(&self) -> bool {
        self.superseded_at.is_none()
    }
}
