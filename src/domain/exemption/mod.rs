//! Exemption module - approved, time-ranged waivers.

mod evaluator;
#[allow(clippy::module_inception)]
mod exemption;
mod status;

pub use evaluator::{ExemptionEvaluator, ExemptionOutcome, ExemptionSelection};
pub use exemption::{Exemption, ExemptionKind};
pub use status::ExemptionStatus;
