//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `member` - Read-only views of members, categories and enrollments
//! - `fee` - Fee aggregate, line items, item types and the fee composer
//! - `adjustment` - Staff-entered adjustments and their sequential calculator
//! - `exemption` - Exemption lifecycle and evaluator
//! - `discount` - Rule-based discount engine
//! - `history` - Append-only fee history

pub mod adjustment;
pub mod discount;
pub mod exemption;
pub mod fee;
pub mod foundation;
pub mod history;
pub mod member;
