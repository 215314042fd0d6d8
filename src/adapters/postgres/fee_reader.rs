//! PostgreSQL implementation of FeeReader.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::rows::{hydrate, FeeRow, FEE_COLUMNS};
use crate::domain::fee::Fee;
use crate::domain::foundation::{BillingPeriod, DomainError, FeeId};
use crate::ports::{FeeReader, FeeScope};

/// Read-side fee queries. Each fee comes back with its items and the
/// status of its receipt.
pub struct PostgresFeeReader {
    pool: PgPool,
}

impl PostgresFeeReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeeReader for PostgresFeeReader {
    async fn find_by_id(&self, id: &FeeId) -> Result<Option<Fee>, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("Failed to acquire connection", e))?;

        let query = format!(
            "SELECT {} FROM fees f JOIN receipts r ON r.id = f.receipt_id WHERE f.id = $1",
            FEE_COLUMNS
        );
        let row: Option<FeeRow> = sqlx::query_as(&query)
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| DomainError::database("Failed to fetch fee", e))?;

        match row {
            Some(row) => Ok(hydrate(&mut *conn, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_in_scope(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
    ) -> Result<Vec<Fee>, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database("Failed to acquire connection", e))?;

        let query = format!(
            r#"
            SELECT {}
            FROM fees f
            JOIN receipts r ON r.id = f.receipt_id
            WHERE f.year = $1 AND f.month = $2
              AND (cardinality($3::uuid[]) = 0 OR f.category_id = ANY($3))
              AND (cardinality($4::uuid[]) = 0 OR f.member_id = ANY($4))
            ORDER BY f.created_at, f.id
            "#,
            FEE_COLUMNS
        );
        let category_ids: Vec<Uuid> = scope.category_ids.iter().map(|id| *id.as_uuid()).collect();
        let member_ids: Vec<Uuid> = scope.member_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<FeeRow> = sqlx::query_as(&query)
            .bind(period.year())
            .bind(period.month() as i32)
            .bind(category_ids)
            .bind(member_ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DomainError::database("Failed to list fees", e))?;

        hydrate(&mut *conn, rows).await
    }
}
