//! Staged in-memory transactions.
//!
//! A transaction works on a private copy of the store taken at `begin`
//! and records every write. `commit` replays the writes onto the shared
//! state, so transactions over different fees do not clobber each other.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use super::store::Shared;
use crate::domain::adjustment::ManualAdjustment;
use crate::domain::discount::{DiscountConfiguration, DiscountRule, RuleApplication};
use crate::domain::exemption::Exemption;
use crate::domain::fee::{Fee, ItemType, ReceiptStatus};
use crate::domain::foundation::{
    BillingPeriod, CategoryId, DomainError, ErrorCode, FeeId, MemberId, Money, ReceiptId,
    Timestamp,
};
use crate::domain::history::HistoryEntry;
use crate::domain::member::{ActivityEnrollment, Category, FamilyDiscount, MemberProfile};
use crate::ports::{FeeTransaction, FeeWriter, HistoryRecorder, ReceiptLedger};

#[derive(Debug, Clone)]
pub(super) struct ReceiptRow {
    pub id: ReceiptId,
    pub member_id: MemberId,
    pub period: BillingPeriod,
    pub amount: Money,
    pub status: ReceiptStatus,
}

#[derive(Debug, Clone, Default)]
pub(super) struct StoreState {
    pub categories: HashMap<CategoryId, Category>,
    pub members: HashMap<MemberId, MemberProfile>,
    pub inactive_members: HashSet<MemberId>,
    pub enrollments: HashMap<MemberId, Vec<ActivityEnrollment>>,
    pub families: HashMap<MemberId, FamilyDiscount>,
    pub config: HashMap<String, String>,
    pub item_types: HashMap<String, ItemType>,
    pub adjustments: Vec<ManualAdjustment>,
    pub exemptions: Vec<Exemption>,
    pub discount_configuration: Option<DiscountConfiguration>,
    pub rules: Vec<DiscountRule>,
    pub receipts: HashMap<ReceiptId, ReceiptRow>,
    pub fees: HashMap<FeeId, Fee>,
    pub applications: Vec<RuleApplication>,
    pub history: Vec<HistoryEntry>,
    pub commits: usize,
}

impl ReceiptRow {
    pub fn pending(member_id: MemberId, period: BillingPeriod) -> Self {
        Self {
            id: ReceiptId::new(),
            member_id,
            period,
            amount: Money::ZERO,
            status: ReceiptStatus::Pending,
        }
    }
}

impl StoreState {
    /// Copies a stored fee with the current status of its receipt.
    pub fn hydrate(&self, fee: &Fee) -> Fee {
        let mut fee = fee.clone();
        if let Some(receipt) = self.receipts.get(&fee.receipt_id) {
            fee.receipt_status = receipt.status;
        }
        fee
    }

    fn apply(&mut self, write: &Write) {
        match write {
            Write::CreateReceipt(row) => {
                self.receipts.insert(row.id, row.clone());
            }
            Write::UpdateReceipt(id, amount) => {
                if let Some(row) = self.receipts.get_mut(id) {
                    row.amount = *amount;
                }
            }
            Write::DeleteReceipt(id) => {
                self.receipts.remove(id);
            }
            Write::UpsertFee(fee) => {
                self.fees.insert(fee.id, fee.clone());
            }
            Write::RecordApplications(fee_id, applications, at) => {
                for row in self
                    .applications
                    .iter_mut()
                    .filter(|a| a.fee_id == *fee_id && a.is_current())
                {
                    row.superseded_at = Some(*at);
                }
                self.applications.extend(applications.iter().cloned());
            }
            Write::DeleteFee(id) => {
                self.fees.remove(id);
                self.applications.retain(|a| a.fee_id != *id);
            }
            Write::History(entry) => self.history.push(entry.clone()),
        }
    }
}

#[derive(Debug, Clone)]
enum Write {
    CreateReceipt(ReceiptRow),
    UpdateReceipt(ReceiptId, Money),
    DeleteReceipt(ReceiptId),
    UpsertFee(Fee),
    RecordApplications(FeeId, Vec<RuleApplication>, Timestamp),
    DeleteFee(FeeId),
    History(HistoryEntry),
}

pub(super) struct InMemoryTransaction {
    shared: Arc<Shared>,
    working: StoreState,
    staged: Vec<Write>,
}

impl InMemoryTransaction {
    pub fn new(shared: Arc<Shared>, working: StoreState) -> Self {
        Self {
            shared,
            working,
            staged: Vec::new(),
        }
    }

    fn stage(&mut self, write: Write) {
        self.working.apply(&write);
        self.staged.push(write);
    }
}

#[async_trait]
impl ReceiptLedger for InMemoryTransaction {
    async fn create_receipt(
        &mut self,
        member_id: &MemberId,
        period: BillingPeriod,
    ) -> Result<ReceiptId, DomainError> {
        let row = ReceiptRow::pending(*member_id, period);
        let id = row.id;
        self.stage(Write::CreateReceipt(row));
        Ok(id)
    }

    async fn update_receipt_amount(
        &mut self,
        receipt_id: &ReceiptId,
        amount: Money,
    ) -> Result<(), DomainError> {
        if !self.working.receipts.contains_key(receipt_id) {
            return Err(DomainError::new(
                ErrorCode::ReceiptNotFound,
                format!("Receipt not found: {}", receipt_id),
            ));
        }
        self.stage(Write::UpdateReceipt(*receipt_id, amount));
        Ok(())
    }

    async fn is_receipt_paid(&mut self, receipt_id: &ReceiptId) -> Result<bool, DomainError> {
        // Payments land in the shared state, so check it before the private copy.
        if let Some(row) = self.shared.lock_state()?.receipts.get(receipt_id) {
            return Ok(row.status.is_paid());
        }
        match self.working.receipts.get(receipt_id) {
            Some(row) => Ok(row.status.is_paid()),
            None => Err(DomainError::new(
                ErrorCode::ReceiptNotFound,
                format!("Receipt not found: {}", receipt_id),
            )),
        }
    }

    async fn delete_receipt(&mut self, receipt_id: &ReceiptId) -> Result<(), DomainError> {
        self.stage(Write::DeleteReceipt(*receipt_id));
        Ok(())
    }
}

#[async_trait]
impl FeeWriter for InMemoryTransaction {
    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), DomainError> {
        if self
            .shared
            .lock_faults()?
            .fee_insert_members
            .contains(&fee.member_id)
        {
            return Err(DomainError::database("insert fee", "injected failure"));
        }
        self.stage(Write::UpsertFee(fee.clone()));
        Ok(())
    }

    async fn lock_fee(&mut self, id: &FeeId) -> Result<Option<Fee>, DomainError> {
        let fee = self.working.fees.get(id).map(|f| self.working.hydrate(f));
        let Some(mut fee) = fee else {
            return Ok(None);
        };
        if let Some(row) = self.shared.lock_state()?.receipts.get(&fee.receipt_id) {
            fee.receipt_status = row.status;
        }
        Ok(Some(fee))
    }

    async fn update_fee(&mut self, fee: &Fee) -> Result<(), DomainError> {
        if !self.working.fees.contains_key(&fee.id) {
            return Err(DomainError::new(
                ErrorCode::FeeNotFound,
                format!("Fee not found: {}", fee.id),
            ));
        }
        self.stage(Write::UpsertFee(fee.clone()));
        Ok(())
    }

    async fn record_rule_applications(
        &mut self,
        fee_id: &FeeId,
        applications: &[RuleApplication],
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.stage(Write::RecordApplications(
            *fee_id,
            applications.to_vec(),
            at,
        ));
        Ok(())
    }

    async fn delete_fee(&mut self, id: &FeeId) -> Result<(), DomainError> {
        self.stage(Write::DeleteFee(*id));
        Ok(())
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryTransaction {
    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<(), DomainError> {
        if self.shared.lock_faults()?.history_writes {
            return Err(DomainError::database("append history", "injected failure"));
        }
        self.stage(Write::History(entry.clone()));
        Ok(())
    }
}

#[async_trait]
impl FeeTransaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut state = self.shared.lock_state()?;
        for write in &self.staged {
            state.apply(write);
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}
