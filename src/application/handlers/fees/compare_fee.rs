//! CompareFeeHandler - Query handler comparing a stored fee against a
//! fresh calculation of adjustments and exemptions.
//!
//! The discount-rule layer is not applied, so a fee carrying rule
//! discounts reports them as a difference.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::application::{CalculationLayers, FeePipeline};
use crate::domain::fee::{FeeDeltas, FeeError, FeeSnapshot};
use crate::domain::foundation::{FeeId, Money};
use crate::ports::FeeReader;

/// Query to compare one fee.
#[derive(Debug, Clone)]
pub struct CompareFeeQuery {
    pub fee_id: FeeId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareFeeResult {
    pub fee_id: FeeId,
    pub current: FeeSnapshot,
    pub recalculated: FeeSnapshot,
    pub current_total: Money,
    pub recalculated_total: Money,
    /// `recalculated_total - current_total`.
    pub difference: Money,
    /// Difference as a share of the current total, 0 when that total is 0.
    pub difference_percent: Decimal,
    pub differences: FeeDeltas,
    pub significant: bool,
}

pub struct CompareFeeHandler {
    pipeline: Arc<FeePipeline>,
    fees: Arc<dyn FeeReader>,
}

impl CompareFeeHandler {
    pub fn new(pipeline: Arc<FeePipeline>, fees: Arc<dyn FeeReader>) -> Self {
        Self { pipeline, fees }
    }

    pub async fn handle(&self, query: CompareFeeQuery) -> Result<CompareFeeResult, FeeError> {
        let fee = self
            .fees
            .find_by_id(&query.fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(query.fee_id))?;
        let member = self
            .pipeline
            .members()
            .find_member(&fee.member_id)
            .await?
            .ok_or(FeeError::MemberNotFound(fee.member_id))?;

        let context = self
            .pipeline
            .prepare(CalculationLayers::WITHOUT_DISCOUNTS)
            .await?;
        let calculation = self
            .pipeline
            .calculate(
                fee.id,
                &member,
                fee.period,
                fee.manual_items().cloned().collect(),
                &context,
            )
            .await?;

        let current = fee.snapshot();
        let recalculated = calculation.snapshot();
        let difference = recalculated.total_amount - current.total_amount;
        Ok(CompareFeeResult {
            fee_id: fee.id,
            current,
            recalculated,
            current_total: current.total_amount,
            recalculated_total: recalculated.total_amount,
            difference,
            difference_percent: difference.ratio_percent_of(&current.total_amount),
            differences: current.delta_to(&recalculated),
            significant: current.total_amount.differs_from(&recalculated.total_amount),
        })
    }
}
