//! Discount rule engine.
//!
//! Evaluates a loaded [`RuleSet`] against one member's charges:
//!
//! 1. Validate each rule and evaluate its conditions (all must hold)
//! 2. Compute the rule's percentage through its strategy
//! 3. Collect the charge items the rule targets
//! 4. Resolve conflicts per item
//! 5. Cap the total by the running amount and the configured maximum
//! 6. Materialize one negative item and one audit record per application
//!
//! Rules that fail evaluation are skipped and reported; they never fail
//! the fee.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::resolver::{self, Candidate};
use super::{
    CustomRegistry, DiscountRule, RuleApplication, RuleContext, RuleEvaluationError, RuleSet,
    TargetScope,
};
use crate::domain::fee::{ItemType, LineItem};
use crate::domain::foundation::{FeeId, Money, Percentage, RuleApplicationId, RuleId, Timestamp};

/// Inputs for one evaluation.
pub struct DiscountInput<'a> {
    pub fee_id: FeeId,
    pub context: &'a RuleContext,
    /// Fee items computed so far; only positive charges are targeted.
    pub items: &'a [LineItem],
    /// Amount left after adjustments and exemption; discounts never exceed it.
    pub available: Money,
    pub discount_type: &'a ItemType,
    pub applied_at: Timestamp,
}

/// A rule dropped because it could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub reason: String,
}

/// Result of evaluating a rule set for one fee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountOutcome {
    /// Positive sum of all discounts.
    pub total_discount: Money,
    pub items: Vec<LineItem>,
    pub applications: Vec<RuleApplication>,
    /// Total discount as a share of the charges, 0-100.
    pub effective_percentage: Decimal,
    pub rules_evaluated: usize,
    pub skipped_rules: Vec<SkippedRule>,
}

impl DiscountOutcome {
    pub fn rules_applied(&self) -> usize {
        let mut ids: Vec<RuleId> = self.applications.iter().map(|a| a.rule_id).collect();
        ids.sort();
        ids.dedup();
        ids.len()
    }
}

#[derive(Debug, Clone)]
pub struct DiscountRuleEngine {
    registry: CustomRegistry,
}

impl Default for DiscountRuleEngine {
    fn default() -> Self {
        Self::new(CustomRegistry::builtin())
    }
}

impl DiscountRuleEngine {
    pub fn new(registry: CustomRegistry) -> Self {
        Self { registry }
    }

    pub fn apply(&self, rule_set: &RuleSet, input: DiscountInput<'_>) -> DiscountOutcome {
        let mut outcome = DiscountOutcome::default();
        if !rule_set.is_active() {
            return outcome;
        }

        let charges: Vec<&LineItem> = input.items.iter().filter(|i| i.is_charge()).collect();
        let charge_total: Money = charges.iter().map(|i| i.amount).sum();
        if charges.is_empty() || !input.available.is_positive() {
            return outcome;
        }

        let configuration = rule_set.configuration();
        let mut candidates = Vec::new();
        for (rule_index, rule) in rule_set.rules().iter().enumerate() {
            outcome.rules_evaluated += 1;
            match self.evaluate_rule(rule, rule_set, input.context, &charges) {
                Ok(Some((percentage, targets))) => candidates.push(Candidate {
                    rule_index,
                    mode: rule.effective_mode(configuration),
                    percentage,
                    targets,
                }),
                Ok(None) => {}
                Err(err) => outcome.skipped_rules.push(SkippedRule {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        let amounts: Vec<Money> = charges.iter().map(|i| i.amount).collect();
        let resolutions = resolver::resolve(&candidates, &amounts);

        let mut remaining = match configuration.max_discount_percent {
            Some(max) => input.available.min(charge_total.percentage(max)),
            None => input.available,
        };

        for resolution in resolutions {
            let amount = resolution.amount.min(remaining);
            if !amount.is_positive() {
                continue;
            }
            remaining -= amount;

            let rule = &rule_set.rules()[resolution.rule_index];
            let target = charges[resolution.item_index];
            let capped = amount != resolution.amount;
            let metadata = serde_json::json!({
                "rule_id": rule.id,
                "rule_name": rule.name,
                "target_item_id": target.id,
                "target_concept": target.concept,
                "capped": capped,
            });

            let item = LineItem::automatic(
                input.fee_id,
                input.discount_type,
                format!("{} ({})", rule.name, target.concept),
                -amount,
            )
            .with_percentage(resolution.percentage)
            .with_metadata(metadata.clone());

            outcome.applications.push(RuleApplication {
                id: RuleApplicationId::new(),
                rule_id: rule.id,
                fee_id: input.fee_id,
                line_item_id: item.id,
                target_item_id: target.id,
                applied_percentage: resolution.percentage,
                discount_amount: amount,
                metadata,
                applied_at: input.applied_at,
                superseded_at: None,
            });
            outcome.total_discount += amount;
            outcome.items.push(item);
        }

        outcome.effective_percentage = outcome.total_discount.ratio_percent_of(&charge_total);
        outcome
    }

    /// Returns the rule's percentage and target indexes, or `None` when the
    /// rule does not apply.
    fn evaluate_rule(
        &self,
        rule: &DiscountRule,
        rule_set: &RuleSet,
        ctx: &RuleContext,
        charges: &[&LineItem],
    ) -> Result<Option<(Percentage, Vec<usize>)>, RuleEvaluationError> {
        rule.validate()?;

        for condition in &rule.conditions {
            if !condition.evaluate(ctx, &self.registry)? {
                return Ok(None);
            }
        }

        let percentage = match rule
            .strategy
            .resolve(ctx, rule_set.lookup_tables(), &self.registry)?
        {
            Some(p) if !p.is_zero() => p,
            _ => return Ok(None),
        };

        let targets: Vec<usize> = charges
            .iter()
            .enumerate()
            .filter(|(_, item)| match &rule.target {
                TargetScope::AllItems => true,
                TargetScope::ItemCategory { category } => item.category == *category,
                TargetScope::ItemTypes { item_type_ids } => item_type_ids.contains(&item.item_type_id),
            })
            .map(|(index, _)| index)
            .collect();

        if targets.is_empty() {
            return Ok(None);
        }
        Ok(Some((percentage, targets)))
    }
}
