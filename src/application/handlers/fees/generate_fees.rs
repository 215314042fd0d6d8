//! GenerateFeesHandler - Command handler for monthly fee generation.
//!
//! Every member without a fee for the period gets one, each in its own
//! transaction. A failing member is rolled back and reported; the batch
//! continues with the next one.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use super::{billing_period, discard};
use crate::application::{CalculationContext, CalculationLayers, FeeCalculation, FeePipeline};
use crate::domain::fee::{Fee, FeeError};
use crate::domain::foundation::{BillingPeriod, CommandMetadata, FeeId, Money};
use crate::domain::member::MemberProfile;
use crate::ports::{
    FeeScope, FeeTransaction, FeeWriter, MemberCatalog, ReceiptLedger, UnitOfWork,
};

/// Command to generate the fees of one period.
#[derive(Debug, Clone)]
pub struct GenerateFeesCommand {
    pub year: i32,
    pub month: u32,
    pub scope: FeeScope,
    pub apply_discount_rules: bool,
}

/// Totals of the discount layer across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscountSummary {
    pub fees_discounted: usize,
    pub total_discount: Money,
    pub applications: usize,
    pub skipped_rules: usize,
}

/// Result of a generation batch.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateFeesResult {
    pub period: BillingPeriod,
    pub generated_count: usize,
    /// One `"member <id>: <message>"` entry per failed member.
    pub errors: Vec<String>,
    pub fees: Vec<Fee>,
    /// Present when the discount layer ran.
    pub discount_summary: Option<DiscountSummary>,
}

/// Handler for fee generation.
pub struct GenerateFeesHandler {
    pipeline: Arc<FeePipeline>,
    unit_of_work: Arc<dyn UnitOfWork>,
    concurrency: usize,
}

impl GenerateFeesHandler {
    pub fn new(pipeline: Arc<FeePipeline>, unit_of_work: Arc<dyn UnitOfWork>) -> Self {
        Self {
            pipeline,
            unit_of_work,
            concurrency: 1,
        }
    }

    /// Number of members processed at once. Each still has its own transaction.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn handle(
        &self,
        cmd: GenerateFeesCommand,
        metadata: CommandMetadata,
    ) -> Result<GenerateFeesResult, FeeError> {
        let period = billing_period(cmd.year, cmd.month)?;
        self.generate(period, &cmd.scope, cmd.apply_discount_rules, &metadata)
            .await
    }

    /// Generation for an already validated period.
    pub(crate) async fn generate(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
        apply_discount_rules: bool,
        metadata: &CommandMetadata,
    ) -> Result<GenerateFeesResult, FeeError> {
        let context = self.prepare(apply_discount_rules).await?;
        let members = self
            .pipeline
            .members()
            .members_needing_fee(period, scope)
            .await?;
        self.generate_for(period, &context, members, metadata).await
    }

    /// Loads everything a batch needs before any member is touched.
    pub(crate) async fn prepare(
        &self,
        apply_discount_rules: bool,
    ) -> Result<CalculationContext, FeeError> {
        let layers = CalculationLayers::ALL.with_discounts(apply_discount_rules);
        self.pipeline.prepare(layers).await
    }

    pub(crate) fn members(&self) -> &Arc<dyn MemberCatalog> {
        self.pipeline.members()
    }

    /// Creates one fee for each of `members`.
    pub(crate) async fn generate_for(
        &self,
        period: BillingPeriod,
        context: &CalculationContext,
        members: Vec<MemberProfile>,
        metadata: &CommandMetadata,
    ) -> Result<GenerateFeesResult, FeeError> {
        info!(
            period = %period,
            members = members.len(),
            actor = %metadata.actor,
            "generating fees"
        );

        let outcomes: Vec<Result<(Fee, FeeCalculation), FeeError>> = stream::iter(members.iter())
            .map(|member| self.generate_one(member, period, context))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut fees = Vec::new();
        let mut errors = Vec::new();
        let mut summary = DiscountSummary::default();
        for (member, outcome) in members.iter().zip(outcomes) {
            match outcome {
                Ok((fee, calculation)) => {
                    let discounts = &calculation.discounts;
                    if !discounts.items.is_empty() {
                        summary.fees_discounted += 1;
                    }
                    summary.total_discount += discounts.total_discount;
                    summary.applications += discounts.applications.len();
                    summary.skipped_rules += discounts.skipped_rules.len();
                    fees.push(fee);
                }
                Err(err) => {
                    warn!(member_id = %member.id, error = %err, "fee generation failed for member");
                    errors.push(format!("member {}: {}", member.id, err));
                }
            }
        }

        info!(
            period = %period,
            generated = fees.len(),
            failed = errors.len(),
            "fee generation finished"
        );

        Ok(GenerateFeesResult {
            period,
            generated_count: fees.len(),
            errors,
            fees,
            discount_summary: context.layers.discounts.then_some(summary),
        })
    }

    async fn generate_one(
        &self,
        member: &MemberProfile,
        period: BillingPeriod,
        context: &CalculationContext,
    ) -> Result<(Fee, FeeCalculation), FeeError> {
        let fee_id = FeeId::new();
        let calculation = self
            .pipeline
            .calculate(fee_id, member, period, Vec::new(), context)
            .await?;

        let mut tx = self.unit_of_work.begin().await?;
        match self.persist(tx.as_mut(), member, period, fee_id, &calculation).await {
            Ok(fee) => {
                tx.commit().await?;
                Ok((fee, calculation))
            }
            Err(err) => {
                discard(tx).await;
                Err(err)
            }
        }
    }

    async fn persist(
        &self,
        tx: &mut dyn FeeTransaction,
        member: &MemberProfile,
        period: BillingPeriod,
        fee_id: FeeId,
        calculation: &FeeCalculation,
    ) -> Result<Fee, FeeError> {
        let now = self.pipeline.clock().now();
        let receipt_id = tx.create_receipt(&member.id, period).await?;

        let mut fee = Fee::draft(
            fee_id,
            receipt_id,
            member.id,
            calculation.category.id,
            period,
            now,
        );
        fee.apply_items(calculation.automatic_items.clone(), now)?;

        tx.insert_fee(&fee).await?;
        if !calculation.discounts.applications.is_empty() {
            tx.record_rule_applications(&fee.id, &calculation.discounts.applications, now)
                .await?;
        }
        tx.update_receipt_amount(&receipt_id, fee.total_amount).await?;
        Ok(fee)
    }
}
