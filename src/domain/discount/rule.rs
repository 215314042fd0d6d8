//! Discount rule definitions.
//!
//! Rules are stored as JSON documents. Every field is a closed, tagged
//! variant; custom behavior is referenced by registry name only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::RuleEvaluationError;
use crate::domain::fee::ItemCategory;
use crate::domain::foundation::{ItemTypeId, Percentage, RuleId};

/// A condition a member must meet. A rule's conditions are combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Member belongs to one of the listed category codes.
    Category { codes: Vec<String> },
    /// Member has at least one family link carrying a discount.
    FamilyDiscount,
    /// Billable activity count within `[min, max]`.
    ActivityCount { min: u32, max: Option<u32> },
    /// Full years of membership within `[min_years, max_years]`.
    Seniority { min_years: u32, max_years: Option<u32> },
    /// Named predicate from the registry.
    Custom {
        predicate: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl RuleCondition {
    pub fn validate(&self) -> Result<(), RuleEvaluationError> {
        match self {
            RuleCondition::Category { codes } if codes.is_empty() => {
                Err(RuleEvaluationError::malformed("category condition lists no codes"))
            }
            RuleCondition::ActivityCount { min, max: Some(max) } if min > max => Err(
                RuleEvaluationError::malformed(format!("activity count min {} > max {}", min, max)),
            ),
            RuleCondition::Seniority {
                min_years,
                max_years: Some(max),
            } if min_years > max => Err(RuleEvaluationError::malformed(format!(
                "seniority min {} > max {}",
                min_years, max
            ))),
            _ => Ok(()),
        }
    }
}

/// Member attribute used as a lookup key or threshold metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CategoryCode,
    ActivityCount,
    SeniorityYears,
    HouseholdSize,
}

/// Interpolation point: at `threshold`, the discount is `percentage`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub threshold: Decimal,
    pub percentage: Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeniorityTier {
    pub min_years: u32,
    pub percentage: Percentage,
}

/// How a qualifying rule computes its percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountStrategy {
    FlatPercent {
        percentage: Percentage,
    },
    /// Percentage read from configuration key `{table}.{metric value}`.
    ConfigLookup {
        table: String,
        key: Metric,
    },
    /// Percentage interpolated linearly between breakpoints.
    ScaledByThreshold {
        metric: Metric,
        breakpoints: Vec<Breakpoint>,
    },
    /// Largest of the member's family-link discounts.
    FamilyMaximum,
    SeniorityTier {
        tiers: Vec<SeniorityTier>,
    },
    /// Named function from the registry.
    Custom {
        function: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl DiscountStrategy {
    pub fn validate(&self) -> Result<(), RuleEvaluationError> {
        match self {
            DiscountStrategy::ConfigLookup { table, .. } if table.trim().is_empty() => {
                Err(RuleEvaluationError::malformed("lookup table name is empty"))
            }
            DiscountStrategy::ScaledByThreshold { metric, breakpoints } => {
                if *metric == Metric::CategoryCode {
                    return Err(RuleEvaluationError::malformed(
                        "category code is not a numeric metric",
                    ));
                }
                if breakpoints.is_empty() {
                    return Err(RuleEvaluationError::malformed("no breakpoints configured"));
                }
                let distinct: BTreeSet<Decimal> =
                    breakpoints.iter().map(|b| b.threshold.normalize()).collect();
                if distinct.len() != breakpoints.len() {
                    return Err(RuleEvaluationError::malformed("duplicate breakpoint thresholds"));
                }
                Ok(())
            }
            DiscountStrategy::SeniorityTier { tiers } if tiers.is_empty() => {
                Err(RuleEvaluationError::malformed("no seniority tiers configured"))
            }
            _ => Ok(()),
        }
    }
}

/// Which items a rule discounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetScope {
    AllItems,
    ItemCategory { category: ItemCategory },
    ItemTypes { item_type_ids: Vec<ItemTypeId> },
}

/// How rules competing for one item are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictMode {
    /// Apply every rule, each on what the previous left.
    #[default]
    Stack,
    /// Keep only the largest discount.
    HighestOnly,
    /// Keep only the top-priority rule.
    FirstMatch,
}

/// An automatic discount rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    pub strategy: DiscountStrategy,
    pub target: TargetScope,
    /// Higher values are evaluated first.
    pub priority: i32,
    /// Falls back to the configuration's default mode when unset.
    pub conflict_mode: Option<ConflictMode>,
    pub active: bool,
}

impl DiscountRule {
    /// Checks the rule's structure.
    pub fn validate(&self) -> Result<(), RuleEvaluationError> {
        for condition in &self.conditions {
            condition.validate()?;
        }
        self.strategy.validate()?;
        if let TargetScope::ItemTypes { item_type_ids } = &self.target {
            if item_type_ids.is_empty() {
                return Err(RuleEvaluationError::malformed("item type target lists no types"));
            }
        }
        Ok(())
    }

    pub fn effective_mode(&self, configuration: &DiscountConfiguration) -> ConflictMode {
        self.conflict_mode
            .unwrap_or(configuration.default_conflict_mode)
    }

    /// True when evaluating the rule needs the member's family links.
    pub fn needs_family(&self) -> bool {
        let metric_needs = |m: &Metric| *m == Metric::HouseholdSize;
        self.conditions
            .iter()
            .any(|c| matches!(c, RuleCondition::FamilyDiscount | RuleCondition::Custom { .. }))
            || match &self.strategy {
                DiscountStrategy::FamilyMaximum | DiscountStrategy::Custom { .. } => true,
                DiscountStrategy::ConfigLookup { key, .. } => metric_needs(key),
                DiscountStrategy::ScaledByThreshold { metric, .. } => metric_needs(metric),
                _ => false,
            }
    }
}

/// Engine-wide discount settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountConfiguration {
    pub enabled: bool,
    /// Cap on total discount as a share of the fee's charges.
    pub max_discount_percent: Option<Percentage>,
    #[serde(default)]
    pub default_conflict_mode: ConflictMode,
}

impl Default for DiscountConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            max_discount_percent: None,
            default_conflict_mode: ConflictMode::Stack,
        }
    }
}

/// Lookup table contents keyed by table name, then by entry key.
pub type LookupTables = HashMap<String, HashMap<String, String>>;

/// Active rules in evaluation order, with their configuration and lookup data.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    configuration: DiscountConfiguration,
    rules: Vec<DiscountRule>,
    lookup_tables: LookupTables,
}

impl RuleSet {
    /// Keeps active rules and orders them by priority (descending), then id.
    pub fn new(
        configuration: DiscountConfiguration,
        rules: Vec<DiscountRule>,
        lookup_tables: LookupTables,
    ) -> Self {
        let mut rules: Vec<DiscountRule> = rules.into_iter().filter(|r| r.active).collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        Self {
            configuration,
            rules,
            lookup_tables,
        }
    }

    /// A rule set that never discounts.
    pub fn disabled() -> Self {
        Self {
            configuration: DiscountConfiguration {
                enabled: false,
                ..DiscountConfiguration::default()
            },
            ..Self::default()
        }
    }

    /// Lookup tables referenced by `rules`.
    pub fn referenced_tables(rules: &[DiscountRule]) -> BTreeSet<String> {
        rules
            .iter()
            .filter(|r| r.active)
            .filter_map(|r| match &r.strategy {
                DiscountStrategy::ConfigLookup { table, .. } => Some(table.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn configuration(&self) -> &DiscountConfiguration {
        &self.configuration
    }

    pub fn rules(&self) -> &[DiscountRule] {
        &self.rules
    }

    pub fn lookup_tables(&self) -> &LookupTables {
        &self.lookup_tables
    }

    pub fn is_active(&self) -> bool {
        self.configuration.enabled && !self.rules.is_empty()
    }

    pub fn needs_family(&self) -> bool {
        self.is_active() && self.rules.iter().any(|r| r.needs_family())
    }
}
