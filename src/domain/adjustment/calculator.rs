//! Sequential application of manual adjustments.
//!
//! Adjustments apply in creation order, each against the running amount left
//! by the previous one. Percentage discounts therefore compound. The running
//! amount never drops below zero.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AdjustmentKind, AdjustmentScope, ManualAdjustment};
use crate::domain::fee::{ItemType, LineItem};
use crate::domain::foundation::{AdjustmentId, FeeId, MemberId, Money, Percentage};

/// Component amounts that scoped percentage adjustments read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjustmentBreakdown {
    pub base: Money,
    pub activities: Money,
}

/// One adjustment as applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub adjustment_id: AdjustmentId,
    pub kind: AdjustmentKind,
    pub scope: AdjustmentScope,
    pub description: String,
    pub value: Decimal,
    /// Signed change to the running amount; negative for discounts.
    pub delta: Money,
    pub running_after: Money,
}

/// Result of applying a member's adjustments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentOutcome {
    pub starting_amount: Money,
    pub applied: Vec<AppliedAdjustment>,
    pub final_amount: Money,
}

impl AdjustmentOutcome {
    /// Outcome of a disabled layer: nothing applied.
    pub fn unchanged(amount: Money) -> Self {
        Self {
            starting_amount: amount,
            applied: Vec::new(),
            final_amount: amount,
        }
    }

    pub fn total_delta(&self) -> Money {
        self.final_amount - self.starting_amount
    }

    /// One automatic item per adjustment that moved the amount.
    pub fn to_items(&self, fee_id: FeeId, item_type: &ItemType) -> Vec<LineItem> {
        self.applied
            .iter()
            .filter(|a| !a.delta.is_zero())
            .map(|a| {
                let mut item = LineItem::automatic(fee_id, item_type, a.description.clone(), a.delta)
                    .with_metadata(serde_json::json!({
                        "adjustment_id": a.adjustment_id,
                        "kind": a.kind,
                        "scope": a.scope,
                        "value": a.value,
                    }));
                if a.kind.is_percentage() {
                    if let Ok(pct) = Percentage::try_new(a.value) {
                        item = item.with_percentage(pct);
                    }
                }
                item
            })
            .collect()
    }
}

/// Applies manual adjustments to a running amount.
pub struct AdjustmentCalculator;

impl AdjustmentCalculator {
    /// Adjustments of `member_id` active at `at`, in creation order.
    pub fn select<'a>(
        adjustments: &'a [ManualAdjustment],
        member_id: MemberId,
        at: NaiveDate,
    ) -> Vec<&'a ManualAdjustment> {
        let mut selected: Vec<&ManualAdjustment> = adjustments
            .iter()
            .filter(|a| a.member_id == member_id && a.is_active_at(at))
            .collect();
        selected.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        selected
    }

    /// Applies `adjustments` in order, starting from `starting`.
    pub fn apply(
        starting: Money,
        breakdown: AdjustmentBreakdown,
        adjustments: &[&ManualAdjustment],
    ) -> AdjustmentOutcome {
        let mut running = starting.clamp_non_negative();
        let mut applied = Vec::with_capacity(adjustments.len());

        for adjustment in adjustments {
            let magnitude = Self::magnitude(adjustment, running, breakdown);
            let next = if adjustment.kind.is_discount() {
                (running - magnitude).clamp_non_negative()
            } else {
                running + magnitude
            };

            applied.push(AppliedAdjustment {
                adjustment_id: adjustment.id,
                kind: adjustment.kind,
                scope: adjustment.scope,
                description: adjustment.description.clone(),
                value: adjustment.value,
                delta: next - running,
                running_after: next,
            });
            running = next;
        }

        AdjustmentOutcome {
            starting_amount: starting,
            applied,
            final_amount: running,
        }
    }

    fn magnitude(adjustment: &ManualAdjustment, running: Money, breakdown: AdjustmentBreakdown) -> Money {
        if !adjustment.kind.is_percentage() {
            return Money::new(adjustment.value);
        }
        let reference = match adjustment.scope {
            AdjustmentScope::Total => running,
            AdjustmentScope::Base => breakdown.base.min(running),
            AdjustmentScope::Activities => breakdown.activities.min(running),
        };
        Money::new(reference.amount() * adjustment.value / Decimal::ONE_HUNDRED)
    }
}
