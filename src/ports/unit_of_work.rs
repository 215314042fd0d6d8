//! Unit of work port - transactional writes for one fee.
//!
//! Every mutation of a fee (receipt, fee row, items, rule applications and
//! history) goes through one [`FeeTransaction`]. Nothing is visible to
//! readers until `commit`; dropping or rolling back discards all of it.
//!
//! # Design
//!
//! - **Explicit handle**: handlers receive the transaction rather than a
//!   shared connection
//! - **Compare-then-write**: `lock_fee` re-reads the fee inside the
//!   transaction so the final comparison cannot lose an update
//! - **Best-effort history**: a failed `append_history` leaves the
//!   transaction usable; callers log and carry on
//!
//! # Example
//!
//! ```ignore
//! let mut tx = unit_of_work.begin().await?;
//! let receipt_id = tx.create_receipt(&member.id, period).await?;
//! tx.insert_fee(&fee).await?;
//! tx.update_receipt_amount(&receipt_id, fee.total_amount).await?;
//! tx.commit().await?;
//! ```

use async_trait::async_trait;

use crate::domain::discount::RuleApplication;
use crate::domain::fee::Fee;
use crate::domain::foundation::{
    BillingPeriod, DomainError, FeeId, MemberId, Money, ReceiptId, Timestamp,
};
use crate::domain::history::HistoryEntry;

/// Opens fee transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn FeeTransaction>, DomainError>;
}

/// Receipt operations the fee engine needs. Payment is handled elsewhere.
#[async_trait]
pub trait ReceiptLedger: Send {
    /// Creates a pending receipt with a zero amount.
    async fn create_receipt(
        &mut self,
        member_id: &MemberId,
        period: BillingPeriod,
    ) -> Result<ReceiptId, DomainError>;

    async fn update_receipt_amount(
        &mut self,
        receipt_id: &ReceiptId,
        amount: Money,
    ) -> Result<(), DomainError>;

    /// Reads the payment status inside the transaction.
    async fn is_receipt_paid(&mut self, receipt_id: &ReceiptId) -> Result<bool, DomainError>;

    async fn delete_receipt(&mut self, receipt_id: &ReceiptId) -> Result<(), DomainError>;
}

/// Fee, line item and rule application writes.
#[async_trait]
pub trait FeeWriter: Send {
    /// Inserts the fee row and all of its items.
    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), DomainError>;

    /// Reads the fee with its items, locking it until the transaction ends.
    async fn lock_fee(&mut self, id: &FeeId) -> Result<Option<Fee>, DomainError>;

    /// Writes totals and status and replaces the stored items with `fee.items`.
    async fn update_fee(&mut self, fee: &Fee) -> Result<(), DomainError>;

    /// Appends a fee's rule applications. Rows already recorded for the fee
    /// are kept and marked superseded at `at`.
    async fn record_rule_applications(
        &mut self,
        fee_id: &FeeId,
        applications: &[RuleApplication],
        at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Deletes the fee with its items and rule applications.
    async fn delete_fee(&mut self, id: &FeeId) -> Result<(), DomainError>;
}

/// Append-only fee history.
#[async_trait]
pub trait HistoryRecorder: Send {
    /// Appends one entry. A failure must not invalidate the transaction.
    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<(), DomainError>;
}

/// One all-or-nothing unit of fee writes.
#[async_trait]
pub trait FeeTransaction: ReceiptLedger + FeeWriter + HistoryRecorder {
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
