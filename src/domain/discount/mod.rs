//! Discount module - automatic, rule-based discounts.
//!
//! Rules pair member conditions with a percentage strategy and a target
//! scope. The engine evaluates a loaded [`RuleSet`] without I/O; loading
//! rules, configuration and lookup tables is done by the caller.

mod audit;
mod context;
mod engine;
mod errors;
mod evaluation;
mod registry;
mod resolver;
mod rule;

pub use audit::RuleApplication;
pub use context::RuleContext;
pub use engine::{DiscountInput, DiscountOutcome, DiscountRuleEngine, SkippedRule};
pub use errors::RuleEvaluationError;
pub use registry::{CustomRegistry, DiscountFn, PredicateFn};
pub use resolver::{resolve, Candidate, Resolution};
pub use rule::{
    Breakpoint, ConflictMode, DiscountConfiguration, DiscountRule, DiscountStrategy, LookupTables,
    Metric, RuleCondition, RuleSet, SeniorityTier, TargetScope,
};
