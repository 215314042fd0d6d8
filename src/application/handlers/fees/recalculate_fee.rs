//! RecalculateFeeHandler - Command handler for recomputing one fee.
//!
//! The fee is recomputed from current catalog data outside the
//! transaction. Inside it, the fee is re-read with a lock, the paid guard
//! is checked again, and the new items are written only when the total
//! moved by more than the amount epsilon.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::{discard, record_history};
use crate::application::{CalculationLayers, FeeCalculation, FeePipeline};
use crate::domain::fee::{Fee, FeeDeltas, FeeError, FeeSnapshot};
use crate::domain::foundation::{CommandMetadata, FeeId};
use crate::domain::history::{HistoryAction, HistoryEntry};
use crate::ports::{FeeReader, FeeTransaction, FeeWriter, ReceiptLedger, UnitOfWork};

/// Command to recalculate one fee.
#[derive(Debug, Clone)]
pub struct RecalculateFeeCommand {
    pub fee_id: FeeId,
    pub layers: CalculationLayers,
}

/// Result of a recalculation.
#[derive(Debug, Clone, Serialize)]
pub struct RecalculateFeeResult {
    pub fee_id: FeeId,
    /// False when the total was within epsilon and nothing was written.
    pub changed: bool,
    pub before: FeeSnapshot,
    pub after: FeeSnapshot,
    pub deltas: FeeDeltas,
    /// The fee as stored after the command.
    pub fee: Fee,
}

/// Handler for single-fee recalculation.
pub struct RecalculateFeeHandler {
    pipeline: Arc<FeePipeline>,
    fees: Arc<dyn FeeReader>,
    unit_of_work: Arc<dyn UnitOfWork>,
}

impl RecalculateFeeHandler {
    pub fn new(
        pipeline: Arc<FeePipeline>,
        fees: Arc<dyn FeeReader>,
        unit_of_work: Arc<dyn UnitOfWork>,
    ) -> Self {
        Self {
            pipeline,
            fees,
            unit_of_work,
        }
    }

    pub async fn handle(
        &self,
        cmd: RecalculateFeeCommand,
        metadata: CommandMetadata,
    ) -> Result<RecalculateFeeResult, FeeError> {
        // 1. Load and guard
        let fee = self
            .fees
            .find_by_id(&cmd.fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(cmd.fee_id))?;
        fee.ensure_modifiable()?;

        let member = self
            .pipeline
            .members()
            .find_member(&fee.member_id)
            .await?
            .ok_or(FeeError::MemberNotFound(fee.member_id))?;

        // 2. Recompute outside the transaction
        let context = self.pipeline.prepare(cmd.layers).await?;
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

        // 3. Compare and write inside it
        let mut tx = self.unit_of_work.begin().await?;
        match self.apply(tx.as_mut(), &cmd.fee_id, calculation, &metadata).await {
            Ok(result) if result.changed => {
                tx.commit().await?;
                info!(
                    fee_id = %result.fee_id,
                    before = %result.before.total_amount,
                    after = %result.after.total_amount,
                    actor = %metadata.actor,
                    "fee recalculated"
                );
                Ok(result)
            }
            Ok(result) => {
                discard(tx).await;
                debug!(fee_id = %result.fee_id, "recalculation left the total unchanged");
                Ok(result)
            }
            Err(err) => {
                discard(tx).await;
                Err(err)
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut dyn FeeTransaction,
        fee_id: &FeeId,
        calculation: FeeCalculation,
        metadata: &CommandMetadata,
    ) -> Result<RecalculateFeeResult, FeeError> {
        let locked = tx
            .lock_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(*fee_id))?;
        if locked.is_paid() || tx.is_receipt_paid(&locked.receipt_id).await? {
            return Err(FeeError::paid_receipt(vec![locked.id]));
        }

        let now = self.pipeline.clock().now();
        let before = locked.snapshot();
        let mut updated = locked.clone();
        updated.category_id = calculation.category.id;
        updated.apply_items(calculation.automatic_items, now)?;
        let after = updated.snapshot();
        let deltas = before.delta_to(&after);

        if !locked.total_amount.differs_from(&updated.total_amount) {
            return Ok(RecalculateFeeResult {
                fee_id: locked.id,
                changed: false,
                before,
                after: before,
                deltas: FeeDeltas::default(),
                fee: locked,
            });
        }

        tx.update_fee(&updated).await?;
        tx.record_rule_applications(&updated.id, &calculation.discounts.applications, now)
            .await?;
        tx.update_receipt_amount(&updated.receipt_id, updated.total_amount)
            .await?;

        let entry = HistoryEntry::new(
            updated.id,
            HistoryAction::Recalculated,
            Some(before),
            Some(after),
            metadata,
            now,
        );
        record_history(tx, &entry).await;

        Ok(RecalculateFeeResult {
            fee_id: updated.id,
            changed: true,
            before,
            after,
            deltas,
            fee: updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::fees::test_support::{
        adjustment, category, exemption, named_member, Fixture,
    };
    use crate::application::handlers::fees::GenerateFeesCommand;
    use crate::domain::adjustment::AdjustmentKind;
    use crate::domain::discount::{
        ConflictMode, DiscountRule, DiscountStrategy, RuleCondition, TargetScope,
    };
    use crate::domain::exemption::ExemptionKind;
    use crate::domain::fee::FeeStatus;
    use crate::domain::foundation::{Money, Percentage, RuleId};
    use crate::ports::FeeScope;
    use rust_decimal::Decimal;

    async fn generated_fee(fixture: &Fixture) -> Fee {
        let result = fixture
            .generate_handler()
            .handle(
                GenerateFeesCommand {
                    year: 2024,
                    month: 3,
                    scope: FeeScope::all(),
                    apply_discount_rules: true,
                },
                CommandMetadata::new("system"),
            )
            .await
            .unwrap();
        result.fees.into_iter().next().unwrap()
    }

    fn command(fee_id: FeeId) -> RecalculateFeeCommand {
        RecalculateFeeCommand {
            fee_id,
            layers: CalculationLayers::ALL,
        }
    }

    fn seeded() -> (Fixture, crate::domain::member::MemberProfile) {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let m = named_member("Ana", &cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        (fixture, m)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Change detection
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn recalculation_right_after_generation_is_a_no_op() {
        let (fixture, m) = seeded();
        fixture.add_exemption(exemption(m.id, ExemptionKind::Partial, 50));
        let fee = generated_fee(&fixture).await;

        let result = fixture
            .recalculate_handler()
            .handle(command(fee.id), CommandMetadata::new("treasurer"))
            .await
            .unwrap();

        assert!(!result.changed);
        assert!(!result.deltas.total_changed());
        assert!(fixture.history().is_empty());
        assert_eq!(fixture.fee(&fee.id).unwrap().status, FeeStatus::Generated);
    }

    #[tokio::test]
    async fn new_adjustment_is_persisted_with_history() {
        let (fixture, m) = seeded();
        let fee = generated_fee(&fixture).await;
        fixture.add_adjustment(adjustment(m.id, AdjustmentKind::DiscountPercent, Decimal::from(20)));

        let metadata = CommandMetadata::new("treasurer").with_reason("late discount");
        let result = fixture
            .recalculate_handler()
            .handle(command(fee.id), metadata)
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(result.before.total_amount, Money::from_units(10000));
        assert_eq!(result.after.total_amount, Money::from_units(8000));
        assert_eq!(result.deltas.total_amount, Money::from_units(-2000));
        assert_eq!(result.deltas.adjustments_amount, Money::from_units(-2000));

        let stored = fixture.fee(&fee.id).unwrap();
        assert_eq!(stored.total_amount, Money::from_units(8000));
        assert_eq!(stored.status, FeeStatus::Recalculated);
        assert_eq!(fixture.receipt_amount(&stored.receipt_id), Some(Money::from_units(8000)));

        let history = fixture.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].actor, "treasurer");
        assert_eq!(history[0].reason.as_deref(), Some("late discount"));
    }

    #[tokio::test]
    async fn second_recalculation_reports_zero_delta() {
        let (fixture, m) = seeded();
        let fee = generated_fee(&fixture).await;
        fixture.add_adjustment(adjustment(m.id, AdjustmentKind::SurchargeFixed, Decimal::from(300)));

        let handler = fixture.recalculate_handler();
        let first = handler
            .handle(command(fee.id), CommandMetadata::new("treasurer"))
            .await
            .unwrap();
        let second = handler
            .handle(command(fee.id), CommandMetadata::new("treasurer"))
            .await
            .unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.deltas.total_amount, Money::ZERO);
    }

    #[tokio::test]
    async fn earlier_rule_applications_survive_recalculation() {
        let (fixture, m) = seeded();
        fixture.add_rule(DiscountRule {
            id: RuleId::new(),
            name: "Active members".to_string(),
            conditions: vec![RuleCondition::Category {
                codes: vec!["ACTIVE".to_string()],
            }],
            strategy: DiscountStrategy::FlatPercent {
                percentage: Percentage::from_whole(10),
            },
            target: TargetScope::AllItems,
            priority: 1,
            conflict_mode: Some(ConflictMode::Stack),
            active: true,
        });
        let fee = generated_fee(&fixture).await;
        let original = fixture.rule_applications();
        assert_eq!(original.len(), 1);
        fixture.add_adjustment(adjustment(m.id, AdjustmentKind::SurchargeFixed, Decimal::from(500)));

        let result = fixture
            .recalculate_handler()
            .handle(command(fee.id), CommandMetadata::new("treasurer"))
            .await
            .unwrap();
        assert!(result.changed);

        let stored = fixture.rule_applications();
        let kept = stored.iter().find(|a| a.id == original[0].id).unwrap();
        assert_eq!(kept.discount_amount, original[0].discount_amount);
        assert!(kept.superseded_at.is_some());

        let current: Vec<_> = stored.iter().filter(|a| a.is_current()).collect();
        assert!(!current.is_empty());
        assert!(current.iter().all(|a| a.fee_id == fee.id && a.id != original[0].id));
    }

    #[tokio::test]
    async fn history_failure_does_not_roll_back_recalculation() {
        let (fixture, m) = seeded();
        let fee = generated_fee(&fixture).await;
        fixture.add_adjustment(adjustment(m.id, AdjustmentKind::DiscountFixed, Decimal::from(100)));
        fixture.fail_history_writes(true);

        let result = fixture
            .recalculate_handler()
            .handle(command(fee.id), CommandMetadata::new("treasurer"))
            .await
            .unwrap();

        assert!(result.changed);
        assert_eq!(fixture.fee(&fee.id).unwrap().total_amount, Money::from_units(9900));
        assert!(fixture.history().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Guards
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_fee_is_refused_and_untouched() {
        let (fixture, m) = seeded();
        let fee = generated_fee(&fixture).await;
        fixture.mark_paid(fee.receipt_id);
        fixture.add_adjustment(adjustment(m.id, AdjustmentKind::DiscountFixed, Decimal::from(100)));

        let err = fixture
            .recalculate_handler()
            .handle(command(fee.id), CommandMetadata::new("treasurer"))
            .await
            .unwrap_err();

        assert!(matches!(err, FeeError::PaidReceipt { ref fee_ids } if fee_ids == &vec![fee.id]));
        assert_eq!(fixture.fee(&fee.id).unwrap().total_amount, Money::from_units(10000));
    }

    #[tokio::test]
    async fn unknown_fee_is_not_found() {
        let (fixture, _) = seeded();
        let missing = FeeId::new();
        let err = fixture
            .recalculate_handler()
            .handle(command(missing), CommandMetadata::new("treasurer"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::FeeNotFound(id) if id == missing));
    }
}
