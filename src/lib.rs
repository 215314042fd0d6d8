//! Dues Engine - Periodic membership fee computation
//!
//! Generates, recalculates, previews and compares monthly member fees.
//! A fee is composed from the member's category base amount and activity
//! enrollments, then passes through manual adjustments, the member's
//! exemption and the discount rule engine, in that order.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;
pub mod ports;
