//! Named custom predicates and discount functions.
//!
//! Rules reference custom behavior by name. Names resolve against this
//! registry of plain function pointers; an unknown name makes the rule
//! inapplicable.

use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use super::RuleContext;
use crate::domain::foundation::Percentage;

/// Decides whether a rule applies.
pub type PredicateFn = fn(&RuleContext, &Value) -> Result<bool, String>;

/// Computes a rule's percentage.
pub type DiscountFn = fn(&RuleContext, &Value) -> Result<Percentage, String>;

#[derive(Clone, Default)]
pub struct CustomRegistry {
    predicates: HashMap<&'static str, PredicateFn>,
    functions: HashMap<&'static str, DiscountFn>,
}

impl std::fmt::Debug for CustomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut predicates: Vec<&str> = self.predicates.keys().copied().collect();
        let mut functions: Vec<&str> = self.functions.keys().copied().collect();
        predicates.sort_unstable();
        functions.sort_unstable();
        f.debug_struct("CustomRegistry")
            .field("predicates", &predicates)
            .field("functions", &functions)
            .finish()
    }
}

impl CustomRegistry {
    /// Registry with the built-in predicates and functions.
    pub fn builtin() -> Self {
        Self::default()
            .with_predicate("minor_member", minor_member)
            .with_predicate("senior_member", senior_member)
            .with_predicate("attribute_equals", attribute_equals)
            .with_function("per_family_member", per_family_member)
            .with_function("loyalty_years", loyalty_years)
            .with_function("fixed_percentage", fixed_percentage)
    }

    pub fn with_predicate(mut self, name: &'static str, f: PredicateFn) -> Self {
        self.predicates.insert(name, f);
        self
    }

    pub fn with_function(mut self, name: &'static str, f: DiscountFn) -> Self {
        self.functions.insert(name, f);
        self
    }

    pub fn predicate(&self, name: &str) -> Option<PredicateFn> {
        self.predicates.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<DiscountFn> {
        self.functions.get(name).copied()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Parameter helpers
// ════════════════════════════════════════════════════════════════════════════

fn decimal_param(params: &Value, key: &str) -> Result<Option<Decimal>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .map(Some)
            .map_err(|e| format!("parameter '{}': {}", key, e)),
        Some(Value::String(s)) => Decimal::from_str(s.trim())
            .map(Some)
            .map_err(|e| format!("parameter '{}': {}", key, e)),
        Some(other) => Err(format!("parameter '{}' is not numeric: {}", key, other)),
    }
}

fn required_decimal(params: &Value, key: &str) -> Result<Decimal, String> {
    decimal_param(params, key)?.ok_or_else(|| format!("missing parameter '{}'", key))
}

fn percentage_of(value: Decimal, cap: Option<Decimal>) -> Percentage {
    let capped = cap.map_or(value, |c| value.min(c));
    Percentage::clamped(capped)
}

// ════════════════════════════════════════════════════════════════════════════
// Built-in predicates
// ════════════════════════════════════════════════════════════════════════════

/// Younger than `max_age` (default 18). Unknown birth date never matches.
fn minor_member(ctx: &RuleContext, params: &Value) -> Result<bool, String> {
    let max_age = decimal_param(params, "max_age")?.unwrap_or(Decimal::from(18));
    Ok(ctx.age().map_or(false, |age| Decimal::from(age) < max_age))
}

/// At least `min_age` (default 65).
fn senior_member(ctx: &RuleContext, params: &Value) -> Result<bool, String> {
    let min_age = decimal_param(params, "min_age")?.unwrap_or(Decimal::from(65));
    Ok(ctx.age().map_or(false, |age| Decimal::from(age) >= min_age))
}

/// Member attribute `key` equals `value`.
fn attribute_equals(ctx: &RuleContext, params: &Value) -> Result<bool, String> {
    let key = params
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing parameter 'key'".to_string())?;
    let expected = params
        .get("value")
        .ok_or_else(|| "missing parameter 'value'".to_string())?;
    Ok(ctx.member.attributes.get(key) == Some(expected))
}

// ════════════════════════════════════════════════════════════════════════════
// Built-in functions
// ════════════════════════════════════════════════════════════════════════════

/// `per_member` percent for each other household member, up to `max`.
fn per_family_member(ctx: &RuleContext, params: &Value) -> Result<Percentage, String> {
    let per_member = required_decimal(params, "per_member")?;
    let others = Decimal::from(ctx.household_size().saturating_sub(1));
    let total = per_member
        .checked_mul(others)
        .ok_or_else(|| "parameter overflow".to_string())?;
    Ok(percentage_of(total, decimal_param(params, "max")?))
}

/// `per_year` percent for each full year of membership, up to `max`.
fn loyalty_years(ctx: &RuleContext, params: &Value) -> Result<Percentage, String> {
    let per_year = required_decimal(params, "per_year")?;
    let years = Decimal::from(ctx.seniority_years());
    let total = per_year
        .checked_mul(years)
        .ok_or_else(|| "parameter overflow".to_string())?;
    Ok(percentage_of(total, decimal_param(params, "max")?))
}

fn fixed_percentage(_ctx: &RuleContext, params: &Value) -> Result<Percentage, String> {
    let value = required_decimal(params, "percentage")?;
    Percentage::try_new(value).map_err(|e| e.to_string())
}
