//! PostgreSQL implementation of the catalog ports.
//!
//! Members, categories, enrollments, item types and configuration entries
//! are owned by other parts of the system; this adapter only reads them.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::rows::{CategoryRow, EnrollmentRow, FamilyLinkRow, ItemTypeRow, MemberRow};
use crate::domain::fee::ItemType;
use crate::domain::foundation::{BillingPeriod, CategoryId, DomainError, MemberId};
use crate::domain::member::{
    ActivityEnrollment, Category, FamilyDiscount, FamilyLink, MemberProfile,
};
use crate::ports::{ActivityCatalog, ConfigStore, FeeScope, ItemTypeCatalog, MemberCatalog};

const MEMBER_COLUMNS: &str = r#"
    m.id, m.display_name, m.category_id, c.code AS category_code,
    m.joined_on, m.birth_date, m.attributes
"#;

/// PostgreSQL implementation of the catalog ports.
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberCatalog for PostgresCatalog {
    async fn find_member(&self, id: &MemberId) -> Result<Option<MemberProfile>, DomainError> {
        let query = format!(
            "SELECT {} FROM members m JOIN categories c ON c.id = m.category_id WHERE m.id = $1",
            MEMBER_COLUMNS
        );
        let row: Option<MemberRow> = sqlx::query_as(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to fetch member", e))?;

        row.map(MemberProfile::try_from).transpose()
    }

    async fn find_category(&self, id: &CategoryId) -> Result<Option<Category>, DomainError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, code, name, base_amount, active FROM categories WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch category", e))?;

        Ok(row.map(Category::from))
    }

    async fn members_needing_fee(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
    ) -> Result<Vec<MemberProfile>, DomainError> {
        let query = format!(
            r#"
            SELECT {}
            FROM members m
            JOIN categories c ON c.id = m.category_id
            WHERE m.active
              AND NOT EXISTS (
                  SELECT 1 FROM fees f
                  WHERE f.member_id = m.id AND f.year = $1 AND f.month = $2
              )
              AND (cardinality($3::uuid[]) = 0 OR m.category_id = ANY($3))
              AND (cardinality($4::uuid[]) = 0 OR m.id = ANY($4))
            ORDER BY m.display_name, m.id
            "#,
            MEMBER_COLUMNS
        );
        let category_ids: Vec<Uuid> = scope.category_ids.iter().map(|id| *id.as_uuid()).collect();
        let member_ids: Vec<Uuid> = scope.member_ids.iter().map(|id| *id.as_uuid()).collect();
        let rows: Vec<MemberRow> = sqlx::query_as(&query)
            .bind(period.year())
            .bind(period.month() as i32)
            .bind(category_ids)
            .bind(member_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list members needing a fee", e))?;

        rows.into_iter().map(MemberProfile::try_from).collect()
    }

    async fn family_discount(&self, member_id: &MemberId) -> Result<FamilyDiscount, DomainError> {
        let rows: Vec<FamilyLinkRow> = sqlx::query_as(
            r#"
            SELECT relative_id, relationship, discount_percent
            FROM family_links
            WHERE member_id = $1
            ORDER BY relative_id
            "#,
        )
        .bind(member_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch family links", e))?;

        let links = rows
            .into_iter()
            .map(FamilyLink::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FamilyDiscount { links })
    }
}

#[async_trait]
impl ActivityCatalog for PostgresCatalog {
    async fn enrollments_for(
        &self,
        member_id: &MemberId,
        period: BillingPeriod,
    ) -> Result<Vec<ActivityEnrollment>, DomainError> {
        // Billability at period start is decided by the composer; this only
        // drops enrollments that ended before the period.
        let rows: Vec<EnrollmentRow> = sqlx::query_as(
            r#"
            SELECT e.activity_id, a.name AS activity_name, a.status AS activity_status,
                   a.list_price, e.special_price, e.enrolled_on, e.withdrawn_on, e.active
            FROM enrollments e
            JOIN activities a ON a.id = e.activity_id
            WHERE e.member_id = $1
              AND (e.withdrawn_on IS NULL OR e.withdrawn_on > $2)
            ORDER BY a.name, e.activity_id
            "#,
        )
        .bind(member_id.as_uuid())
        .bind(period.start_date())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch enrollments", e))?;

        rows.into_iter().map(ActivityEnrollment::try_from).collect()
    }
}

#[async_trait]
impl ConfigStore for PostgresCatalog {
    async fn get_by_key(&self, key: &str) -> Result<Option<String>, DomainError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM config_entries WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to read configuration entry", e))
    }

    async fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>, DomainError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM config_entries WHERE starts_with(key, $1)",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to read configuration entries", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix).map(|rest| (rest.to_string(), value))
            })
            .collect())
    }
}

#[async_trait]
impl ItemTypeCatalog for PostgresCatalog {
    async fn find_by_code(&self, code: &str) -> Result<Option<ItemType>, DomainError> {
        let row: Option<ItemTypeRow> = sqlx::query_as(
            "SELECT id, code, name, category, formula, active FROM item_types WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch item type", e))?;

        row.map(ItemType::try_from).transpose()
    }
}
