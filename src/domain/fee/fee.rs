//! Fee aggregate.

use serde::{Deserialize, Serialize};

use super::{FeeError, FeeSnapshot, FeeStatus, ItemCategory, LineItem, ReceiptStatus};
use crate::domain::foundation::{
    BillingPeriod, CategoryId, FeeId, MemberId, Money, ReceiptId, StateMachine, Timestamp,
};

/// A member's fee for one billing period, with its line items.
///
/// # Invariants
///
/// - `total_amount` equals the sum of `items`
/// - `total_amount` is never negative
/// - `base_amount` and `activities_amount` mirror the base and activity items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub id: FeeId,
    pub receipt_id: ReceiptId,
    pub member_id: MemberId,
    pub category_id: CategoryId,
    pub period: BillingPeriod,
    pub base_amount: Money,
    pub activities_amount: Money,
    pub total_amount: Money,
    pub status: FeeStatus,
    pub receipt_status: ReceiptStatus,
    pub items: Vec<LineItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Fee {
    /// Creates an empty draft fee for a freshly created receipt.
    pub fn draft(
        id: FeeId,
        receipt_id: ReceiptId,
        member_id: MemberId,
        category_id: CategoryId,
        period: BillingPeriod,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            receipt_id,
            member_id,
            category_id,
            period,
            base_amount: Money::ZERO,
            activities_amount: Money::ZERO,
            total_amount: Money::ZERO,
            status: FeeStatus::Draft,
            receipt_status: ReceiptStatus::Pending,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.receipt_status.is_paid()
    }

    /// Fails with `PaidReceipt` when the receipt is paid.
    pub fn ensure_modifiable(&self) -> Result<(), FeeError> {
        if self.is_paid() {
            return Err(FeeError::paid_receipt(vec![self.id]));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> FeeSnapshot {
        FeeSnapshot::from_items(&self.items)
    }

    pub fn items_total(&self) -> Money {
        self.items.iter().map(|i| i.amount).sum()
    }

    /// Items entered by operators, preserved by recalculation.
    pub fn manual_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|i| !i.is_automatic)
    }

    /// Replaces every automatic item with `automatic`, keeps manual items,
    /// and refreshes the stored totals.
    ///
    /// A draft moves to `Generated`; anything else moves to `Recalculated`.
    pub fn apply_items(&mut self, automatic: Vec<LineItem>, now: Timestamp) -> Result<(), FeeError> {
        self.ensure_modifiable()?;

        let target = match self.status {
            FeeStatus::Draft => FeeStatus::Generated,
            _ => FeeStatus::Recalculated,
        };
        let next = self
            .status
            .transition_to(target)
            .map_err(|e| FeeError::invalid_state(self.status.as_str(), e.to_string()))?;

        let mut items: Vec<LineItem> = automatic
            .into_iter()
            .filter(|i| i.is_automatic)
            .map(|mut i| {
                i.fee_id = self.id;
                i
            })
            .collect();
        items.extend(self.manual_items().cloned());

        let total: Money = items.iter().map(|i| i.amount).sum();
        if total.is_negative() {
            return Err(FeeError::validation(
                "total_amount",
                format!("items sum to a negative total ({})", total),
            ));
        }

        self.items = items;
        self.refresh_totals();
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    fn refresh_totals(&mut self) {
        let snapshot = self.snapshot();
        self.base_amount = snapshot.base_amount;
        self.activities_amount = snapshot.activities_amount;
        self.total_amount = snapshot.total_amount;
    }

    /// Number of items in the given category.
    pub fn count_items(&self, category: ItemCategory) -> usize {
        self.items.iter().filter(|i| i.category == category).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fee::ItemType;
    use crate::domain::foundation::ItemTypeId;

    fn item_type(category: ItemCategory) -> ItemType {
        ItemType {
            id: ItemTypeId::new(),
            code: category.as_str().to_uppercase(),
            name: category.as_str().to_string(),
            category,
            formula: None,
            active: true,
        }
    }

    fn draft() -> Fee {
        Fee::draft(
            FeeId::new(),
            ReceiptId::new(),
            MemberId::new(),
            CategoryId::new(),
            BillingPeriod::new(2026, 3).unwrap(),
            Timestamp::now(),
        )
    }

    fn auto(fee: &Fee, category: ItemCategory, amount: i64) -> LineItem {
        LineItem::automatic(fee.id, &item_type(category), "auto", Money::from_units(amount))
    }

    #[test]
    fn draft_becomes_generated_with_consistent_totals() {
        let mut fee = draft();
        let items = vec![
            auto(&fee, ItemCategory::Base, 10000),
            auto(&fee, ItemCategory::Activity, 2500),
            auto(&fee, ItemCategory::Discount, -1250),
        ];
        fee.apply_items(items, Timestamp::now()).unwrap();

        assert_eq!(fee.status, FeeStatus::Generated);
        assert_eq!(fee.base_amount, Money::from_units(10000));
        assert_eq!(fee.activities_amount, Money::from_units(2500));
        assert_eq!(fee.total_amount, Money::from_units(11250));
        assert_eq!(fee.total_amount, fee.items_total());
    }

    #[test]
    fn recalculation_keeps_manual_items() {
        let mut fee = draft();
        let base = auto(&fee, ItemCategory::Base, 10000);
        fee.apply_items(vec![base.clone()], Timestamp::now()).unwrap();
        fee.items.push(LineItem::manual(
            fee.id,
            &item_type(ItemCategory::Other),
            "Locker",
            Money::from_units(300),
        ));

        fee.apply_items(vec![auto(&fee, ItemCategory::Base, 9000)], Timestamp::now())
            .unwrap();

        assert_eq!(fee.status, FeeStatus::Recalculated);
        assert_eq!(fee.items.len(), 2);
        assert_eq!(fee.total_amount, Money::from_units(9300));
        assert_eq!(fee.manual_items().count(), 1);
    }

    #[test]
    fn paid_fee_rejects_changes() {
        let mut fee = draft();
        fee.receipt_status = ReceiptStatus::Paid;
        let result = fee.apply_items(vec![auto(&fee, ItemCategory::Base, 1)], Timestamp::now());
        assert!(matches!(result, Err(FeeError::PaidReceipt { .. })));
        assert!(fee.items.is_empty());
    }

    #[test]
    fn negative_total_is_rejected() {
        let mut fee = draft();
        let result = fee.apply_items(
            vec![
                auto(&fee, ItemCategory::Base, 100),
                auto(&fee, ItemCategory::Discount, -200),
            ],
            Timestamp::now(),
        );
        assert!(matches!(result, Err(FeeError::ValidationFailed { .. })));
        assert_eq!(fee.status, FeeStatus::Draft);
    }

    #[test]
    fn applied_items_are_attached_to_the_fee() {
        let mut fee = draft();
        let stray = LineItem::automatic(
            FeeId::new(),
            &item_type(ItemCategory::Base),
            "base",
            Money::from_units(10),
        );
        fee.apply_items(vec![stray], Timestamp::now()).unwrap();
        assert!(fee.items.iter().all(|i| i.fee_id == fee.id));
    }
}
