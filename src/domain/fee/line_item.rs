//! Fee line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ItemCategory, ItemType};
use crate::domain::foundation::{FeeId, ItemTypeId, LineItemId, Money, Percentage};

/// One signed component of a fee's total.
///
/// Charges are positive; adjustments, exemptions and discounts that reduce
/// the fee are negative. A fee's total is always the sum of its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub fee_id: FeeId,
    pub item_type_id: ItemTypeId,
    pub category: ItemCategory,
    pub concept: String,
    /// Line total (already multiplied by quantity).
    pub amount: Money,
    pub quantity: Decimal,
    pub percentage: Option<Percentage>,
    /// Automatic items are rebuilt by every recalculation; manual ones survive it.
    pub is_automatic: bool,
    pub is_editable: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl LineItem {
    /// Creates an automatic item of the given type.
    pub fn automatic(
        fee_id: FeeId,
        item_type: &ItemType,
        concept: impl Into<String>,
        amount: Money,
    ) -> Self {
        Self {
            id: LineItemId::new(),
            fee_id,
            item_type_id: item_type.id,
            category: item_type.category,
            concept: concept.into(),
            amount,
            quantity: Decimal::ONE,
            percentage: None,
            is_automatic: true,
            is_editable: false,
            metadata: serde_json::Value::Null,
        }
    }

    /// Creates a manual item, entered by an operator and kept across recalculations.
    pub fn manual(
        fee_id: FeeId,
        item_type: &ItemType,
        concept: impl Into<String>,
        amount: Money,
    ) -> Self {
        Self {
            is_automatic: false,
            is_editable: true,
            ..Self::automatic(fee_id, item_type, concept, amount)
        }
    }

    pub fn with_percentage(mut self, percentage: Percentage) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// True for positive items that reductions may act upon.
    pub fn is_charge(&self) -> bool {
        self.category.is_charge() && self.amount.is_positive()
    }

    /// Copies the item onto another fee with a fresh id.
    pub fn reassigned_to(&self, fee_id: FeeId) -> Self {
        Self {
            id: LineItemId::new(),
            fee_id,
            ..self.clone()
        }
    }
}
