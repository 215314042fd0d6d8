//! RegenerateFeesHandler - Command handler that deletes and recreates a
//! period's fees.
//!
//! Refused outright when any fee in scope belongs to a paid receipt. Item
//! types, rules and the members to bill are all loaded before the deletion,
//! which is one transaction; regeneration then runs like a normal batch,
//! one transaction per member. Every member whose fee was deleted gets a new
//! one, even if they have since left the scope.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::{billing_period, discard, record_history, GenerateFeesHandler};
use crate::domain::fee::{Fee, FeeError};
use crate::domain::foundation::{BillingPeriod, CommandMetadata, FeeId};
use crate::domain::history::{HistoryAction, HistoryEntry};
use crate::domain::member::MemberProfile;
use crate::ports::{Clock, FeeReader, FeeScope, FeeTransaction, FeeWriter, ReceiptLedger, UnitOfWork};

/// Command to regenerate the fees of one period.
#[derive(Debug, Clone)]
pub struct RegenerateFeesCommand {
    pub year: i32,
    pub month: u32,
    pub scope: FeeScope,
    pub apply_discount_rules: bool,
}

/// Result of a regeneration.
#[derive(Debug, Clone, Serialize)]
pub struct RegenerateFeesResult {
    pub period: BillingPeriod,
    pub deleted_count: usize,
    pub generated_count: usize,
    pub errors: Vec<String>,
    pub fees: Vec<Fee>,
}

/// Handler for fee regeneration.
pub struct RegenerateFeesHandler {
    generator: Arc<GenerateFeesHandler>,
    fees: Arc<dyn FeeReader>,
    unit_of_work: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
}

impl RegenerateFeesHandler {
    pub fn new(
        generator: Arc<GenerateFeesHandler>,
        fees: Arc<dyn FeeReader>,
        unit_of_work: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            generator,
            fees,
            unit_of_work,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: RegenerateFeesCommand,
        metadata: CommandMetadata,
    ) -> Result<RegenerateFeesResult, FeeError> {
        let period = billing_period(cmd.year, cmd.month)?;

        // 1. Paid guard over the whole scope
        let existing = self.fees.find_in_scope(period, &cmd.scope).await?;
        let paid: Vec<FeeId> = existing.iter().filter(|f| f.is_paid()).map(|f| f.id).collect();
        if !paid.is_empty() {
            return Err(FeeError::paid_receipt(paid));
        }

        // 2. Resolve the calculation context and the members to bill again
        //    before anything is deleted
        let context = self.generator.prepare(cmd.apply_discount_rules).await?;
        let members = self.members_to_regenerate(period, &cmd.scope, &existing).await?;

        // 3. Delete everything in one transaction
        if !existing.is_empty() {
            let mut tx = self.unit_of_work.begin().await?;
            match self.delete_all(tx.as_mut(), &existing, &metadata).await {
                Ok(()) => tx.commit().await?,
                Err(err) => {
                    discard(tx).await;
                    return Err(err);
                }
            }
            info!(
                period = %period,
                deleted = existing.len(),
                actor = %metadata.actor,
                "fees deleted for regeneration"
            );
        }

        // 4. Generate again
        let generated = self
            .generator
            .generate_for(period, &context, members, &metadata)
            .await?;

        Ok(RegenerateFeesResult {
            period,
            deleted_count: existing.len(),
            generated_count: generated.generated_count,
            errors: generated.errors,
            fees: generated.fees,
        })
    }

    /// Owners of the deleted fees, whatever their current category, plus
    /// members in scope that had no fee yet. Sorted by name like a batch.
    async fn members_to_regenerate(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
        existing: &[Fee],
    ) -> Result<Vec<MemberProfile>, FeeError> {
        let catalog = self.generator.members();
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(existing.len());
        for fee in existing {
            if !seen.insert(fee.member_id) {
                continue;
            }
            let member = catalog
                .find_member(&fee.member_id)
                .await?
                .ok_or_else(|| FeeError::member_not_found(fee.member_id))?;
            members.push(member);
        }

        for member in catalog.members_needing_fee(period, scope).await? {
            if seen.insert(member.id) {
                members.push(member);
            }
        }
        members.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(members)
    }

    async fn delete_all(
        &self,
        tx: &mut dyn FeeTransaction,
        fees: &[Fee],
        metadata: &CommandMetadata,
    ) -> Result<(), FeeError> {
        let mut paid = Vec::new();
        for fee in fees {
            if tx.is_receipt_paid(&fee.receipt_id).await? {
                paid.push(fee.id);
            }
        }
        if !paid.is_empty() {
            return Err(FeeError::paid_receipt(paid));
        }

        let now = self.clock.now();
        for fee in fees {
            tx.delete_fee(&fee.id).await?;
            tx.delete_receipt(&fee.receipt_id).await?;
            let entry = HistoryEntry::new(
                fee.id,
                HistoryAction::Deleted,
                Some(fee.snapshot()),
                None,
                metadata,
                now,
            );
            record_history(tx, &entry).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::fees::test_support::{
        adjustment, category, named_member, Fixture,
    };
    use crate::application::handlers::fees::GenerateFeesCommand;
    use crate::domain::adjustment::AdjustmentKind;
    use crate::domain::foundation::Money;
    use rust_decimal::Decimal;

    fn command() -> RegenerateFeesCommand {
        RegenerateFeesCommand {
            year: 2024,
            month: 3,
            scope: FeeScope::all(),
            apply_discount_rules: true,
        }
    }

    async fn generate(fixture: &Fixture) -> Vec<Fee> {
        fixture
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
            .unwrap()
            .fees
    }

    fn seeded(names: &[&str]) -> (Fixture, Vec<MemberProfile>) {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let members: Vec<_> = names.iter().map(|n| named_member(n, &cat)).collect();
        fixture.add_category(cat);
        for m in &members {
            fixture.add_member(m.clone());
        }
        (fixture, members)
    }

    #[tokio::test]
    async fn regeneration_replaces_fees_with_fresh_ones() {
        let (fixture, members) = seeded(&["Ana", "Leo"]);
        let original = generate(&fixture).await;
        fixture.add_adjustment(adjustment(
            members[0].id,
            AdjustmentKind::DiscountFixed,
            Decimal::from(2500),
        ));

        let result = fixture
            .regenerate_handler()
            .handle(command(), CommandMetadata::new("treasurer"))
            .await
            .unwrap();

        assert_eq!(result.deleted_count, 2);
        assert_eq!(result.generated_count, 2);
        assert!(original.iter().all(|f| fixture.fee(&f.id).is_none()));
        assert_eq!(fixture.fees().len(), 2);
        assert_eq!(fixture.receipt_count(), 2);
        assert_eq!(result.fees[0].total_amount, Money::from_units(7500));

        let deleted: Vec<_> = fixture
            .history()
            .into_iter()
            .filter(|h| h.action == HistoryAction::Deleted)
            .collect();
        assert_eq!(deleted.len(), 2);
        assert!(deleted.iter().all(|h| h.after.is_none()));
    }

    #[tokio::test]
    async fn paid_fee_blocks_the_whole_scope() {
        let (fixture, _) = seeded(&["Ana", "Leo"]);
        let original = generate(&fixture).await;
        fixture.mark_paid(original[1].receipt_id);

        let err = fixture
            .regenerate_handler()
            .handle(command(), CommandMetadata::new("treasurer"))
            .await
            .unwrap_err();

        match err {
            FeeError::PaidReceipt { fee_ids } => assert_eq!(fee_ids, vec![original[1].id]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(original.iter().all(|f| fixture.fee(&f.id).is_some()));
        assert!(fixture.history().is_empty());
    }

    #[tokio::test]
    async fn empty_period_just_generates() {
        let (fixture, _) = seeded(&["Ana"]);

        let result = fixture
            .regenerate_handler()
            .handle(command(), CommandMetadata::new("treasurer"))
            .await
            .unwrap();

        assert_eq!(result.deleted_count, 0);
        assert_eq!(result.generated_count, 1);
    }

    #[tokio::test]
    async fn scope_limits_deletion() {
        let (fixture, members) = seeded(&["Ana", "Leo"]);
        let original = generate(&fixture).await;

        let result = fixture
            .regenerate_handler()
            .handle(
                RegenerateFeesCommand {
                    scope: FeeScope::for_members(vec![members[0].id]),
                    ..command()
                },
                CommandMetadata::new("treasurer"),
            )
            .await
            .unwrap();

        assert_eq!(result.deleted_count, 1);
        assert_eq!(result.generated_count, 1);
        let untouched = original.iter().find(|f| f.member_id == members[1].id).unwrap();
        assert!(fixture.fee(&untouched.id).is_some());
    }

    #[tokio::test]
    async fn missing_item_type_fails_before_anything_is_deleted() {
        let (fixture, _) = seeded(&["Ana", "Leo"]);
        let original = generate(&fixture).await;
        fixture.remove_item_type("BASE_FEE");

        let err = fixture
            .regenerate_handler()
            .handle(command(), CommandMetadata::new("treasurer"))
            .await
            .unwrap_err();

        assert!(matches!(err, FeeError::ItemTypeNotFound(code) if code == "BASE_FEE"));
        assert!(original.iter().all(|f| fixture.fee(&f.id).is_some()));
        assert_eq!(fixture.receipt_count(), 2);
        assert!(fixture
            .history()
            .iter()
            .all(|h| h.action != HistoryAction::Deleted));
    }

    #[tokio::test]
    async fn member_who_changed_category_is_billed_again() {
        let fixture = Fixture::new();
        let active = category("ACTIVE", 10000);
        let junior = category("JUNIOR", 4000);
        let ana = named_member("Ana", &active);
        fixture.add_category(active.clone());
        fixture.add_category(junior.clone());
        fixture.add_member(ana.clone());
        let original = generate(&fixture).await;

        fixture.add_member(MemberProfile {
            category_id: junior.id,
            category_code: junior.code.clone(),
            ..ana.clone()
        });

        let result = fixture
            .regenerate_handler()
            .handle(
                RegenerateFeesCommand {
                    scope: FeeScope::for_categories(vec![active.id]),
                    ..command()
                },
                CommandMetadata::new("treasurer"),
            )
            .await
            .unwrap();

        assert_eq!(result.deleted_count, 1);
        assert_eq!(result.generated_count, 1);
        assert!(fixture.fee(&original[0].id).is_none());
        let fees = fixture.fees();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].member_id, ana.id);
        assert_eq!(fees[0].category_id, junior.id);
        assert_eq!(fees[0].total_amount, Money::from_units(4000));
    }
}
