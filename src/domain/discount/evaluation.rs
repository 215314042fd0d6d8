//! Condition and strategy evaluation.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::{
    Breakpoint, CustomRegistry, DiscountStrategy, LookupTables, RuleCondition, RuleContext,
    RuleEvaluationError,
};
use crate::domain::foundation::Percentage;

impl RuleCondition {
    /// Evaluates the condition. Unknown custom predicates never match.
    pub fn evaluate(
        &self,
        ctx: &RuleContext,
        registry: &CustomRegistry,
    ) -> Result<bool, RuleEvaluationError> {
        match self {
            RuleCondition::Category { codes } => Ok(codes
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&ctx.member.category_code))),
            RuleCondition::FamilyDiscount => {
                Ok(ctx.family.as_ref().map_or(false, |f| f.is_eligible()))
            }
            RuleCondition::ActivityCount { min, max } => {
                Ok(ctx.activity_count >= *min && max.map_or(true, |m| ctx.activity_count <= m))
            }
            RuleCondition::Seniority {
                min_years,
                max_years,
            } => {
                let years = ctx.seniority_years();
                Ok(years >= *min_years && max_years.map_or(true, |m| years <= m))
            }
            RuleCondition::Custom { predicate, params } => match registry.predicate(predicate) {
                Some(f) => f(ctx, params).map_err(|reason| RuleEvaluationError::PredicateFailed {
                    name: predicate.clone(),
                    reason,
                }),
                None => Ok(false),
            },
        }
    }
}

impl DiscountStrategy {
    /// Computes the rule's percentage.
    ///
    /// `Ok(None)` means the rule does not apply to this member: a missing
    /// lookup entry, a value below the first breakpoint, no eligible family
    /// link, no reached tier, or an unknown custom function.
    pub fn resolve(
        &self,
        ctx: &RuleContext,
        tables: &LookupTables,
        registry: &CustomRegistry,
    ) -> Result<Option<Percentage>, RuleEvaluationError> {
        match self {
            DiscountStrategy::FlatPercent { percentage } => Ok(Some(*percentage)),
            DiscountStrategy::ConfigLookup { table, key } => {
                let entry = ctx.metric_key(*key);
                let raw = match tables.get(table).and_then(|t| t.get(&entry)) {
                    Some(raw) => raw,
                    None => return Ok(None),
                };
                let invalid = || RuleEvaluationError::LookupInvalid {
                    key: format!("{}.{}", table, entry),
                    value: raw.clone(),
                };
                let value = Decimal::from_str(raw.trim()).map_err(|_| invalid())?;
                Percentage::try_new(value).map(Some).map_err(|_| invalid())
            }
            DiscountStrategy::ScaledByThreshold {
                metric,
                breakpoints,
            } => {
                let value = ctx.metric_value(*metric).ok_or_else(|| {
                    RuleEvaluationError::malformed("category code is not a numeric metric")
                })?;
                Ok(interpolate(breakpoints, value))
            }
            DiscountStrategy::FamilyMaximum => Ok(ctx
                .family
                .as_ref()
                .filter(|f| f.is_eligible())
                .map(|f| f.max_percentage())),
            DiscountStrategy::SeniorityTier { tiers } => {
                let years = ctx.seniority_years();
                Ok(tiers
                    .iter()
                    .filter(|t| t.min_years <= years)
                    .max_by_key(|t| t.min_years)
                    .map(|t| t.percentage))
            }
            DiscountStrategy::Custom { function, params } => match registry.function(function) {
                Some(f) => f(ctx, params)
                    .map(Some)
                    .map_err(|reason| RuleEvaluationError::FunctionFailed {
                        name: function.clone(),
                        reason,
                    }),
                None => Ok(None),
            },
        }
    }
}

/// Linear interpolation over breakpoints sorted by threshold.
///
/// Below the first threshold nothing applies; at or above the last one the
/// last percentage holds.
fn interpolate(breakpoints: &[Breakpoint], value: Decimal) -> Option<Percentage> {
    let mut points: Vec<&Breakpoint> = breakpoints.iter().collect();
    points.sort_by(|a, b| a.threshold.cmp(&b.threshold));

    let first = points.first()?;
    if value < first.threshold {
        return None;
    }
    for pair in points.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if value >= lo.threshold && value < hi.threshold {
            let span = hi.threshold - lo.threshold;
            let progress = (value - lo.threshold) / span;
            let pct = lo.percentage.value() + (hi.percentage.value() - lo.percentage.value()) * progress;
            return Some(Percentage::clamped(pct.round_dp(4)));
        }
    }
    points.last().map(|last| last.percentage)
}
