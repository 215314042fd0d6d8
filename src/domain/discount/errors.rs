//! Rule evaluation errors.

use thiserror::Error;

/// Why a discount rule could not be evaluated.
///
/// These never fail a fee computation; the engine skips the rule and reports
/// it in the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleEvaluationError {
    #[error("rule is malformed: {0}")]
    Malformed(String),

    #[error("custom predicate '{name}' failed: {reason}")]
    PredicateFailed { name: String, reason: String },

    #[error("custom function '{name}' failed: {reason}")]
    FunctionFailed { name: String, reason: String },

    #[error("lookup '{key}' holds an invalid percentage: {value}")]
    LookupInvalid { key: String, value: String },
}

impl RuleEvaluationError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        RuleEvaluationError::Malformed(reason.into())
    }
}
