//! Line item type catalog entries and their pricing formulas.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ItemTypeId, Money, Percentage};

/// Well-known item categories. Discount rules can target a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Base,
    Activity,
    Adjustment,
    Exemption,
    Discount,
    Other,
}

impl ItemCategory {
    /// Charges are what adjustments, exemptions and discounts act upon.
    pub fn is_charge(&self) -> bool {
        matches!(self, ItemCategory::Base | ItemCategory::Activity | ItemCategory::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Base => "base",
            ItemCategory::Activity => "activity",
            ItemCategory::Adjustment => "adjustment",
            ItemCategory::Exemption => "exemption",
            ItemCategory::Discount => "discount",
            ItemCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "base" => Some(ItemCategory::Base),
            "activity" => Some(ItemCategory::Activity),
            "adjustment" => Some(ItemCategory::Adjustment),
            "exemption" => Some(ItemCategory::Exemption),
            "discount" => Some(ItemCategory::Discount),
            "other" => Some(ItemCategory::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of pricing formulas an item type may carry.
///
/// Formulas are data, dispatched by `match`; nothing is ever evaluated as
/// free-form code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemFormula {
    /// Fixed amount regardless of inputs.
    FlatAmount { value: Money },
    /// Activity price times a multiplier.
    ActivityPrice { multiplier: Decimal },
    /// Share of the member's base amount.
    PercentOfBase { percentage: Percentage },
}

/// Inputs a formula may read.
#[derive(Debug, Clone, Copy)]
pub struct FormulaInput {
    pub base_amount: Money,
    pub activity_price: Option<Money>,
}

impl ItemFormula {
    pub fn evaluate(&self, input: FormulaInput) -> Money {
        match self {
            ItemFormula::FlatAmount { value } => *value,
            ItemFormula::ActivityPrice { multiplier } => input
                .activity_price
                .map(|price| Money::new(price.amount() * *multiplier))
                .unwrap_or(Money::ZERO),
            ItemFormula::PercentOfBase { percentage } => input.base_amount.percentage(*percentage),
        }
    }
}

/// Catalog code of the base charge type.
pub const BASE_FEE_CODE: &str = "BASE_FEE";
/// Catalog code of the activity charge type.
pub const ACTIVITY_FEE_CODE: &str = "ACTIVITY_FEE";
/// Catalog code of the manual adjustment type.
pub const MANUAL_ADJUSTMENT_CODE: &str = "MANUAL_ADJUSTMENT";
/// Catalog code of the exemption type.
pub const EXEMPTION_CODE: &str = "EXEMPTION";
/// Catalog code of the automatic discount type.
pub const AUTOMATIC_DISCOUNT_CODE: &str = "AUTOMATIC_DISCOUNT";

/// A line item type from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub code: String,
    pub name: String,
    pub category: ItemCategory,
    pub formula: Option<ItemFormula>,
    pub active: bool,
}

impl ItemType {
    /// Applies the type's formula, or returns `default` when it has none.
    pub fn price(&self, input: FormulaInput, default: Money) -> Money {
        self.formula
            .as_ref()
            .map(|f| f.evaluate(input))
            .unwrap_or(default)
    }
}

/// The item types every fee computation needs, resolved once per operation.
#[derive(Debug, Clone)]
pub struct SystemItemTypes {
    pub base: ItemType,
    pub activity: ItemType,
    pub adjustment: ItemType,
    pub exemption: ItemType,
    pub discount: ItemType,
}

impl SystemItemTypes {
    /// Codes that must exist in the catalog.
    pub const REQUIRED_CODES: [&'static str; 5] = [
        BASE_FEE_CODE,
        ACTIVITY_FEE_CODE,
        MANUAL_ADJUSTMENT_CODE,
        EXEMPTION_CODE,
        AUTOMATIC_DISCOUNT_CODE,
    ];
}
