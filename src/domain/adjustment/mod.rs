//! Adjustment module - staff-entered per-member deltas.

#[allow(clippy::module_inception)]
mod adjustment;
mod calculator;

pub use adjustment::{AdjustmentKind, AdjustmentScope, ManualAdjustment};
pub use calculator::{
    AdjustmentBreakdown, AdjustmentCalculator, AdjustmentOutcome, AppliedAdjustment,
};
