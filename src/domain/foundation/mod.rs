//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the fee engine.

mod command;
mod errors;
mod ids;
mod money;
mod percentage;
mod period;
mod state_machine;
mod timestamp;

pub use command::CommandMetadata;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    ActivityId, AdjustmentId, CategoryId, ExemptionId, FeeId, HistoryEntryId, ItemTypeId,
    LineItemId, MemberId, ReceiptId, RuleApplicationId, RuleId,
};
pub use money::{Money, AMOUNT_EPSILON};
pub use percentage::Percentage;
pub use period::BillingPeriod;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
