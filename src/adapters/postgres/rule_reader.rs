//! PostgreSQL implementation of the adjustment, exemption and discount-rule
//! readers.
//!
//! Candidate rows are narrowed in SQL; the final date checks use the same
//! domain predicates as the in-memory adapter.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::warn;

use super::rows::{AdjustmentRow, DiscountRuleRow, DiscountSettingsRow, ExemptionRow};
use crate::domain::adjustment::ManualAdjustment;
use crate::domain::discount::{DiscountConfiguration, DiscountRule};
use crate::domain::exemption::{Exemption, ExemptionStatus};
use crate::domain::foundation::{DomainError, MemberId};
use crate::ports::{AdjustmentReader, DiscountRuleReader, ExemptionReader};

pub struct PostgresRuleReader {
    pool: PgPool,
}

impl PostgresRuleReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdjustmentReader for PostgresRuleReader {
    async fn active_for_member(
        &self,
        member_id: &MemberId,
        at: NaiveDate,
    ) -> Result<Vec<ManualAdjustment>, DomainError> {
        let rows: Vec<AdjustmentRow> = sqlx::query_as(
            r#"
            SELECT id, member_id, kind, value, scope, description,
                   valid_from, valid_to, active, created_at
            FROM manual_adjustments
            WHERE member_id = $1 AND active AND valid_from <= $2
            ORDER BY created_at, id
            "#,
        )
        .bind(member_id.as_uuid())
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch adjustments", e))?;

        let adjustments = rows
            .into_iter()
            .map(ManualAdjustment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(adjustments.into_iter().filter(|a| a.is_active_at(at)).collect())
    }
}

#[async_trait]
impl ExemptionReader for PostgresRuleReader {
    async fn in_effect_for_member(
        &self,
        member_id: &MemberId,
        at: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<Exemption>, DomainError> {
        let rows: Vec<ExemptionRow> = sqlx::query_as(
            r#"
            SELECT id, member_id, kind, percentage, reason, status,
                   valid_from, valid_to, active, created_at
            FROM exemptions
            WHERE member_id = $1 AND active AND status = $2 AND valid_from <= $3
            ORDER BY valid_from DESC, created_at DESC
            "#,
        )
        .bind(member_id.as_uuid())
        .bind(ExemptionStatus::Vigente.as_str())
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch exemptions", e))?;

        let exemptions = rows
            .into_iter()
            .map(Exemption::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exemptions
            .into_iter()
            .filter(|e| e.is_in_effect(at, today))
            .collect())
    }
}

#[async_trait]
impl DiscountRuleReader for PostgresRuleReader {
    async fn configuration(&self) -> Result<DiscountConfiguration, DomainError> {
        let row: Option<DiscountSettingsRow> = sqlx::query_as(
            r#"
            SELECT enabled, max_discount_percent, default_conflict_mode
            FROM discount_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch discount settings", e))?;

        row.map(DiscountConfiguration::try_from)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    async fn active_rules(&self) -> Result<Vec<DiscountRule>, DomainError> {
        let rows: Vec<DiscountRuleRow> = sqlx::query_as(
            r#"
            SELECT id, name, conditions, strategy, target, priority, conflict_mode, active
            FROM discount_rules
            WHERE active
            ORDER BY priority DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch discount rules", e))?;

        // A rule that no longer decodes is skipped like any other malformed rule.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id();
                match DiscountRule::try_from(row) {
                    Ok(rule) => Some(rule),
                    Err(err) => {
                        warn!(rule_id = %id, error = %err, "skipping undecodable discount rule");
                        None
                    }
                }
            })
            .collect())
    }
}
