//! PreviewRecalculationHandler - Query handler reporting what a
//! recalculation would change. Never writes.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::billing_period;
use crate::application::{CalculationContext, CalculationLayers, FeePipeline};
use crate::domain::fee::{Fee, FeeDeltas, FeeError, FeeSnapshot};
use crate::domain::foundation::{FeeId, MemberId, Money};
use crate::ports::{FeeReader, FeeScope};

/// Which fees to preview.
#[derive(Debug, Clone)]
pub enum PreviewTarget {
    Fee(FeeId),
    Period { year: i32, month: u32, scope: FeeScope },
}

/// Query for a recalculation preview.
#[derive(Debug, Clone)]
pub struct PreviewRecalculationQuery {
    pub target: PreviewTarget,
    pub layers: CalculationLayers,
}

/// Projected change of one fee.
#[derive(Debug, Clone, Serialize)]
pub struct FeePreview {
    pub fee_id: FeeId,
    pub member_id: MemberId,
    /// Paid fees are reported but a recalculation would refuse them.
    pub paid: bool,
    pub changed: bool,
    pub before: FeeSnapshot,
    pub after: FeeSnapshot,
    pub deltas: FeeDeltas,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreviewSummary {
    pub analyzed: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Sum of total deltas across changed fees.
    pub net_delta: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewRecalculationResult {
    pub previews: Vec<FeePreview>,
    pub summary: PreviewSummary,
    /// Fees that could not be previewed, as `"fee <id>: <message>"`.
    pub errors: Vec<String>,
}

/// Handler for recalculation previews.
pub struct PreviewRecalculationHandler {
    pipeline: Arc<FeePipeline>,
    fees: Arc<dyn FeeReader>,
}

impl PreviewRecalculationHandler {
    pub fn new(pipeline: Arc<FeePipeline>, fees: Arc<dyn FeeReader>) -> Self {
        Self { pipeline, fees }
    }

    pub async fn handle(
        &self,
        query: PreviewRecalculationQuery,
    ) -> Result<PreviewRecalculationResult, FeeError> {
        let context = self.pipeline.prepare(query.layers).await?;

        let mut previews = Vec::new();
        let mut errors = Vec::new();
        match query.target {
            PreviewTarget::Fee(fee_id) => {
                let fee = self
                    .fees
                    .find_by_id(&fee_id)
                    .await?
                    .ok_or(FeeError::FeeNotFound(fee_id))?;
                previews.push(self.preview(&fee, &context).await?);
            }
            PreviewTarget::Period { year, month, scope } => {
                let period = billing_period(year, month)?;
                for fee in self.fees.find_in_scope(period, &scope).await? {
                    match self.preview(&fee, &context).await {
                        Ok(preview) => previews.push(preview),
                        Err(err) => {
                            warn!(fee_id = %fee.id, error = %err, "fee preview failed");
                            errors.push(format!("fee {}: {}", fee.id, err));
                        }
                    }
                }
            }
        }

        let summary = summarize(&previews);
        Ok(PreviewRecalculationResult {
            previews,
            summary,
            errors,
        })
    }

    async fn preview(&self, fee: &Fee, context: &CalculationContext) -> Result<FeePreview, FeeError> {
        let member = self
            .pipeline
            .members()
            .find_member(&fee.member_id)
            .await?
            .ok_or(FeeError::MemberNotFound(fee.member_id))?;

        let calculation = self
            .pipeline
            .calculate(
                fee.id,
                &member,
                fee.period,
                fee.manual_items().cloned().collect(),
                context,
            )
            .await?;

        let before = fee.snapshot();
        let after = calculation.snapshot();
        let changed = fee.total_amount.differs_from(&after.total_amount);
        Ok(FeePreview {
            fee_id: fee.id,
            member_id: fee.member_id,
            paid: fee.is_paid(),
            changed,
            before,
            after,
            deltas: before.delta_to(&after),
        })
    }
}

fn summarize(previews: &[FeePreview]) -> PreviewSummary {
    let changed: Vec<&FeePreview> = previews.iter().filter(|p| p.changed).collect();
    PreviewSummary {
        analyzed: previews.len(),
        changed: changed.len(),
        unchanged: previews.len() - changed.len(),
        net_delta: changed.iter().map(|p| p.deltas.total_amount).sum(),
    }
}
