//! Fee composition: base amount plus billable activity costs.
//!
//! Pure functions over data already loaded from the catalogs. The base amount
//! comes from an optional configuration override, falling back to the
//! category's catalog value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{FormulaInput, LineItem, SystemItemTypes};
use crate::domain::foundation::{ActivityId, BillingPeriod, FeeId, Money};
use crate::domain::member::{ActivityEnrollment, Category};

/// Where the base amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseAmountSource {
    Catalog,
    ConfigOverride,
}

/// One billable activity charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCharge {
    pub activity_id: ActivityId,
    pub activity_name: String,
    pub amount: Money,
}

/// Result of composing a member's charges for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeComposition {
    pub base_amount: Money,
    pub base_source: BaseAmountSource,
    pub activities: Vec<ActivityCharge>,
    pub activities_amount: Money,
}

impl FeeComposition {
    pub fn subtotal(&self) -> Money {
        self.base_amount + self.activities_amount
    }

    pub fn activity_count(&self) -> u32 {
        self.activities.len() as u32
    }

    /// Materializes the composition as automatic charge items.
    ///
    /// The base item is emitted even when zero so every fee carries one.
    pub fn to_items(&self, fee_id: FeeId, types: &SystemItemTypes) -> Vec<LineItem> {
        let mut items = Vec::with_capacity(self.activities.len() + 1);
        items.push(
            LineItem::automatic(fee_id, &types.base, types.base.name.clone(), self.base_amount)
                .with_metadata(serde_json::json!({ "source": self.base_source })),
        );
        for charge in &self.activities {
            items.push(
                LineItem::automatic(
                    fee_id,
                    &types.activity,
                    charge.activity_name.clone(),
                    charge.amount,
                )
                .with_metadata(serde_json::json!({ "activity_id": charge.activity_id })),
            );
        }
        items
    }
}

/// Composes the charge part of a fee.
pub struct FeeComposer;

impl FeeComposer {
    /// Resolves the base amount from an override value or the catalog.
    ///
    /// Overrides that are missing, unparsable or negative are ignored.
    pub fn resolve_base_amount(
        category: &Category,
        override_value: Option<&str>,
    ) -> (Money, BaseAmountSource) {
        let parsed = override_value
            .and_then(|raw| Decimal::from_str(raw.trim()).ok())
            .filter(|value| !value.is_sign_negative());

        match parsed {
            Some(value) => (Money::new(value), BaseAmountSource::ConfigOverride),
            None => (category.base_amount, BaseAmountSource::Catalog),
        }
    }

    /// Composes base and activity charges for the period.
    ///
    /// Enrollments count when billable at the first day of the period.
    /// Item type formulas, when present, replace the raw amounts.
    pub fn compose(
        category: &Category,
        override_value: Option<&str>,
        enrollments: &[ActivityEnrollment],
        period: BillingPeriod,
        types: &SystemItemTypes,
    ) -> FeeComposition {
        let (raw_base, base_source) = Self::resolve_base_amount(category, override_value);
        let base_amount = types
            .base
            .price(
                FormulaInput {
                    base_amount: raw_base,
                    activity_price: None,
                },
                raw_base,
            )
            .clamp_non_negative();

        let reference = period.start_date();
        let activities: Vec<ActivityCharge> = enrollments
            .iter()
            .filter(|e| e.is_billable_at(reference))
            .map(|e| {
                let cost = e.cost();
                let amount = types.activity.price(
                    FormulaInput {
                        base_amount,
                        activity_price: Some(cost),
                    },
                    cost,
                );
                ActivityCharge {
                    activity_id: e.activity_id,
                    activity_name: e.activity_name.clone(),
                    amount: amount.clamp_non_negative(),
                }
            })
            .collect();
        let activities_amount = activities.iter().map(|a| a.amount).sum();

        FeeComposition {
            base_amount,
            base_source,
            activities,
            activities_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fee::{ItemCategory, ItemFormula, ItemType};
    use crate::domain::foundation::{CategoryId, ItemTypeId};
    use crate::domain::member::ActivityStatus;
    use chrono::NaiveDate;

    fn item_type(code: &str, category: ItemCategory) -> ItemType {
        ItemType {
            id: ItemTypeId::new(),
            code: code.to_string(),
            name: code.to_string(),
            category,
            formula: None,
            active: true,
        }
    }

    fn types() -> SystemItemTypes {
        SystemItemTypes {
            base: item_type("BASE_FEE", ItemCategory::Base),
            activity: item_type("ACTIVITY_FEE", ItemCategory::Activity),
            adjustment: item_type("MANUAL_ADJUSTMENT", ItemCategory::Adjustment),
            exemption: item_type("EXEMPTION", ItemCategory::Exemption),
            discount: item_type("AUTOMATIC_DISCOUNT", ItemCategory::Discount),
        }
    }

    fn category(base: i64) -> Category {
        Category {
            id: CategoryId::new(),
            code: "ACTIVE".to_string(),
            name: "Active".to_string(),
            base_amount: Money::from_units(base),
            active: true,
        }
    }

    fn enrollment(name: &str, price: i64, status: ActivityStatus) -> ActivityEnrollment {
        ActivityEnrollment {
            activity_id: ActivityId::new(),
            activity_name: name.to_string(),
            activity_status: status,
            list_price: Money::from_units(price),
            special_price: None,
            enrolled_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            withdrawn_on: None,
            active: true,
        }
    }

    fn period() -> BillingPeriod {
        BillingPeriod::new(2026, 3).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Base amount resolution
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn override_wins_over_catalog() {
        let (amount, source) = FeeComposer::resolve_base_amount(&category(10000), Some(" 12000.50 "));
        assert_eq!(amount, Money::new(Decimal::new(1200050, 2)));
        assert_eq!(source, BaseAmountSource::ConfigOverride);
    }

    #[test]
    fn missing_override_falls_back_to_catalog() {
        let (amount, source) = FeeComposer::resolve_base_amount(&category(10000), None);
        assert_eq!(amount, Money::from_units(10000));
        assert_eq!(source, BaseAmountSource::Catalog);
    }

    #[test]
    fn unparsable_or_negative_override_is_ignored() {
        for raw in ["abc", "", "-5"] {
            let (amount, source) = FeeComposer::resolve_base_amount(&category(10000), Some(raw));
            assert_eq!(amount, Money::from_units(10000), "override {:?}", raw);
            assert_eq!(source, BaseAmountSource::Catalog);
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Composition
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn sums_billable_activities_only() {
        let enrollments = vec![
            enrollment("Swimming", 3000, ActivityStatus::InProgress),
            enrollment("Chess", 1500, ActivityStatus::Upcoming),
            enrollment("Old camp", 9000, ActivityStatus::Finished),
        ];
        let c = FeeComposer::compose(&category(10000), None, &enrollments, period(), &types());

        assert_eq!(c.base_amount, Money::from_units(10000));
        assert_eq!(c.activity_count(), 2);
        assert_eq!(c.activities_amount, Money::from_units(4500));
        assert_eq!(c.subtotal(), Money::from_units(14500));
    }

    #[test]
    fn activity_formula_replaces_raw_price() {
        let mut types = types();
        types.activity.formula = Some(ItemFormula::ActivityPrice {
            multiplier: Decimal::new(5, 1),
        });
        let enrollments = vec![enrollment("Swimming", 3000, ActivityStatus::InProgress)];
        let c = FeeComposer::compose(&category(10000), None, &enrollments, period(), &types);
        assert_eq!(c.activities_amount, Money::from_units(1500));
    }

    #[test]
    fn to_items_emits_base_and_one_item_per_activity() {
        let enrollments = vec![enrollment("Swimming", 3000, ActivityStatus::InProgress)];
        let types = types();
        let c = FeeComposer::compose(&category(10000), None, &enrollments, period(), &types);
        let fee_id = FeeId::new();
        let items = c.to_items(fee_id, &types);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].category, ItemCategory::Base);
        assert_eq!(items[1].concept, "Swimming");
        assert!(items.iter().all(|i| i.is_automatic && i.fee_id == fee_id));
    }

    #[test]
    fn zero_base_still_emits_base_item() {
        let types = types();
        let c = FeeComposer::compose(&category(0), None, &[], period(), &types);
        let items = c.to_items(FeeId::new(), &types);
        assert_eq!(items.len(), 1);
        assert!(items[0].amount.is_zero());
    }
}
