//! Per-component totals of a fee and their differences.

use serde::{Deserialize, Serialize};

use super::{ItemCategory, LineItem};
use crate::domain::foundation::Money;

/// Totals of a fee broken down by item category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSnapshot {
    pub base_amount: Money,
    pub activities_amount: Money,
    /// Manual and other charges not derived from base or activities.
    pub other_amount: Money,
    pub adjustments_amount: Money,
    pub exemption_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl FeeSnapshot {
    /// Builds a snapshot by summing items per category.
    pub fn from_items(items: &[LineItem]) -> Self {
        let mut snapshot = FeeSnapshot::default();
        for item in items {
            let bucket = match item.category {
                ItemCategory::Base => &mut snapshot.base_amount,
                ItemCategory::Activity => &mut snapshot.activities_amount,
                ItemCategory::Other => &mut snapshot.other_amount,
                ItemCategory::Adjustment => &mut snapshot.adjustments_amount,
                ItemCategory::Exemption => &mut snapshot.exemption_amount,
                ItemCategory::Discount => &mut snapshot.discount_amount,
            };
            *bucket += item.amount;
            snapshot.total_amount += item.amount;
        }
        snapshot
    }

    /// Component-wise difference `after - self`.
    pub fn delta_to(&self, after: &FeeSnapshot) -> FeeDeltas {
        FeeDeltas {
            base_amount: after.base_amount - self.base_amount,
            activities_amount: after.activities_amount - self.activities_amount,
            other_amount: after.other_amount - self.other_amount,
            adjustments_amount: after.adjustments_amount - self.adjustments_amount,
            exemption_amount: after.exemption_amount - self.exemption_amount,
            discount_amount: after.discount_amount - self.discount_amount,
            total_amount: after.total_amount - self.total_amount,
        }
    }
}

/// Signed differences between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDeltas {
    pub base_amount: Money,
    pub activities_amount: Money,
    pub other_amount: Money,
    pub adjustments_amount: Money,
    pub exemption_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl FeeDeltas {
    /// True when the total moved by at least the amount epsilon.
    pub fn total_changed(&self) -> bool {
        self.total_amount.differs_from(&Money::ZERO)
    }
}
