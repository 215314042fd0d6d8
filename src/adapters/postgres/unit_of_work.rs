//! PostgreSQL implementation of UnitOfWork.
//!
//! One `sqlx::Transaction` per [`FeeTransaction`]. Fee rows are re-read
//! with `FOR UPDATE` so the compare-then-write step of a recalculation
//! holds the row until commit. History inserts run in a nested savepoint:
//! a failed insert rolls back to it and leaves the outer transaction usable.

use async_trait::async_trait;
use sqlx::{Connection, PgConnection, PgPool, Postgres, Transaction};

use super::rows::{hydrate, to_json, FeeRow, FEE_COLUMNS};
use crate::domain::discount::RuleApplication;
use crate::domain::fee::{Fee, ReceiptStatus};
use crate::domain::foundation::{
    BillingPeriod, DomainError, ErrorCode, FeeId, MemberId, Money, ReceiptId, Timestamp,
};
use crate::domain::history::HistoryEntry;
use crate::ports::{FeeTransaction, FeeWriter, HistoryRecorder, ReceiptLedger, UnitOfWork};

pub struct PostgresUnitOfWork {
    pool: PgPool,
}

impl PostgresUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn FeeTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// An open fee transaction.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }
}

async fn insert_items(conn: &mut PgConnection, fee: &Fee) -> Result<(), DomainError> {
    for (position, item) in fee.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO fee_items (
                id, fee_id, position, item_type_id, category, concept, amount,
                quantity, percentage, is_automatic, is_editable, metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(fee.id.as_uuid())
        .bind(position as i32)
        .bind(item.item_type_id.as_uuid())
        .bind(item.category.as_str())
        .bind(&item.concept)
        .bind(item.amount.amount())
        .bind(item.quantity)
        .bind(item.percentage.map(|p| p.value()))
        .bind(item.is_automatic)
        .bind(item.is_editable)
        .bind(&item.metadata)
        .execute(&mut *conn)
        .await
        .map_err(|e| DomainError::database("Failed to insert fee item", e))?;
    }
    Ok(())
}

fn not_found(code: ErrorCode, what: &str, id: impl std::fmt::Display) -> DomainError {
    DomainError::new(code, format!("{} not found: {}", what, id))
}

#[async_trait]
impl ReceiptLedger for PostgresTransaction {
    async fn create_receipt(
        &mut self,
        member_id: &MemberId,
        period: BillingPeriod,
    ) -> Result<ReceiptId, DomainError> {
        let id = ReceiptId::new();
        sqlx::query(
            r#"
            INSERT INTO receipts (id, member_id, year, month, amount, status)
            VALUES ($1, $2, $3, $4, 0, $5)
            "#,
        )
        .bind(id.as_uuid())
        .bind(member_id.as_uuid())
        .bind(period.year())
        .bind(period.month() as i32)
        .bind(ReceiptStatus::Pending.as_str())
        .execute(self.conn())
        .await
        .map_err(|e| DomainError::database("Failed to create receipt", e))?;

        Ok(id)
    }

    async fn update_receipt_amount(
        &mut self,
        receipt_id: &ReceiptId,
        amount: Money,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE receipts SET amount = $2 WHERE id = $1")
            .bind(receipt_id.as_uuid())
            .bind(amount.amount())
            .execute(self.conn())
            .await
            .map_err(|e| DomainError::database("Failed to update receipt", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::ReceiptNotFound, "Receipt", receipt_id));
        }
        Ok(())
    }

    async fn is_receipt_paid(&mut self, receipt_id: &ReceiptId) -> Result<bool, DomainError> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM receipts WHERE id = $1")
            .bind(receipt_id.as_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| DomainError::database("Failed to read receipt status", e))?;

        Ok(status
            .as_deref()
            .and_then(ReceiptStatus::parse)
            .map_or(false, |s| s.is_paid()))
    }

    async fn delete_receipt(&mut self, receipt_id: &ReceiptId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM receipts WHERE id = $1")
            .bind(receipt_id.as_uuid())
            .execute(self.conn())
            .await
            .map_err(|e| DomainError::database("Failed to delete receipt", e))?;
        Ok(())
    }
}

#[async_trait]
impl FeeWriter for PostgresTransaction {
    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO fees (
                id, receipt_id, member_id, category_id, year, month, base_amount,
                activities_amount, total_amount, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(fee.id.as_uuid())
        .bind(fee.receipt_id.as_uuid())
        .bind(fee.member_id.as_uuid())
        .bind(fee.category_id.as_uuid())
        .bind(fee.period.year())
        .bind(fee.period.month() as i32)
        .bind(fee.base_amount.amount())
        .bind(fee.activities_amount.amount())
        .bind(fee.total_amount.amount())
        .bind(fee.status.as_str())
        .bind(fee.created_at.as_datetime())
        .bind(fee.updated_at.as_datetime())
        .execute(self.conn())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("fees_member_id_year_month_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        format!("Member already has a fee for {}", fee.period),
                    );
                }
            }
            DomainError::database("Failed to insert fee", e)
        })?;

        insert_items(self.conn(), fee).await
    }

    async fn lock_fee(&mut self, id: &FeeId) -> Result<Option<Fee>, DomainError> {
        let query = format!(
            r#"
            SELECT {}
            FROM fees f
            JOIN receipts r ON r.id = f.receipt_id
            WHERE f.id = $1
            FOR UPDATE OF f
            "#,
            FEE_COLUMNS
        );
        let row: Option<FeeRow> = sqlx::query_as(&query)
            .bind(id.as_uuid())
            .fetch_optional(self.conn())
            .await
            .map_err(|e| DomainError::database("Failed to lock fee", e))?;

        match row {
            Some(row) => Ok(hydrate(self.conn(), vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_fee(&mut self, fee: &Fee) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE fees SET
                category_id = $2,
                base_amount = $3,
                activities_amount = $4,
                total_amount = $5,
                status = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(fee.id.as_uuid())
        .bind(fee.category_id.as_uuid())
        .bind(fee.base_amount.amount())
        .bind(fee.activities_amount.amount())
        .bind(fee.total_amount.amount())
        .bind(fee.status.as_str())
        .bind(fee.updated_at.as_datetime())
        .execute(self.conn())
        .await
        .map_err(|e| DomainError::database("Failed to update fee", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(ErrorCode::FeeNotFound, "Fee", fee.id));
        }

        sqlx::query("DELETE FROM fee_items WHERE fee_id = $1")
            .bind(fee.id.as_uuid())
            .execute(self.conn())
            .await
            .map_err(|e| DomainError::database("Failed to clear fee items", e))?;

        insert_items(self.conn(), fee).await
    }

    async fn record_rule_applications(
        &mut self,
        fee_id: &FeeId,
        applications: &[RuleApplication],
        at: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE rule_applications
            SET superseded_at = $2
            WHERE fee_id = $1 AND superseded_at IS NULL
            "#,
        )
        .bind(fee_id.as_uuid())
        .bind(at.as_datetime())
        .execute(self.conn())
        .await
        .map_err(|e| DomainError::database("Failed to supersede rule applications", e))?;

        for application in applications {
            sqlx::query(
                r#"
                INSERT INTO rule_applications (
                    id, rule_id, fee_id, line_item_id, target_item_id,
                    applied_percentage, discount_amount, metadata, applied_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(application.id.as_uuid())
            .bind(application.rule_id.as_uuid())
            .bind(fee_id.as_uuid())
            .bind(application.line_item_id.as_uuid())
            .bind(application.target_item_id.as_uuid())
            .bind(application.applied_percentage.value())
            .bind(application.discount_amount.amount())
            .bind(&application.metadata)
            .bind(application.applied_at.as_datetime())
            .execute(self.conn())
            .await
            .map_err(|e| DomainError::database("Failed to insert rule application", e))?;
        }
        Ok(())
    }

    async fn delete_fee(&mut self, id: &FeeId) -> Result<(), DomainError> {
        // Items and rule applications cascade.
        sqlx::query("DELETE FROM fees WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.conn())
            .await
            .map_err(|e| DomainError::database("Failed to delete fee", e))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryRecorder for PostgresTransaction {
    async fn append_history(&mut self, entry: &HistoryEntry) -> Result<(), DomainError> {
        let before = entry.before.as_ref().map(|s| to_json("history before", s)).transpose()?;
        let after = entry.after.as_ref().map(|s| to_json("history after", s)).transpose()?;

        let mut savepoint = self
            .conn()
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to open history savepoint", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO fee_history (
                id, fee_id, action, before, after, actor, reason,
                correlation_id, source, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.fee_id.as_uuid())
        .bind(entry.action.as_str())
        .bind(before)
        .bind(after)
        .bind(&entry.actor)
        .bind(&entry.reason)
        .bind(&entry.correlation_id)
        .bind(&entry.source)
        .bind(entry.recorded_at.as_datetime())
        .execute(&mut *savepoint)
        .await;

        match inserted {
            Ok(_) => savepoint
                .commit()
                .await
                .map_err(|e| DomainError::database("Failed to release history savepoint", e)),
            Err(err) => {
                savepoint
                    .rollback()
                    .await
                    .map_err(|e| DomainError::database("Failed to roll back history savepoint", e))?;
                Err(DomainError::database("Failed to append fee history", err))
            }
        }
    }
}

#[async_trait]
impl FeeTransaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DomainError::database("Failed to roll back transaction", e))
    }
}
