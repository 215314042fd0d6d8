//! Database row representations and their conversion into domain types.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::adjustment::{AdjustmentKind, AdjustmentScope, ManualAdjustment};
use crate::domain::discount::{ConflictMode, DiscountConfiguration, DiscountRule};
use crate::domain::exemption::{Exemption, ExemptionKind, ExemptionStatus};
use crate::domain::fee::{Fee, FeeStatus, ItemCategory, ItemType, LineItem, ReceiptStatus};
use crate::domain::foundation::{
    ActivityId, AdjustmentId, BillingPeriod, CategoryId, DomainError, ErrorCode, ExemptionId, FeeId,
    ItemTypeId, LineItemId, MemberId, Money, Percentage, ReceiptId, RuleId, Timestamp,
};
use crate::domain::member::{
    ActivityEnrollment, ActivityStatus, Category, FamilyLink, MemberProfile,
};

// ════════════════════════════════════════════════════════════════════════════
// Column helpers
// ════════════════════════════════════════════════════════════════════════════

/// Parses a text column through a domain `parse` function.
pub(super) fn parse_column<T>(
    column: &str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, DomainError> {
    parse(raw).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, raw),
        )
    })
}

/// Decodes a JSONB column, or a snake_case text column via its JSON form.
pub(super) fn from_json<T: DeserializeOwned>(
    column: &str,
    value: serde_json::Value,
) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, e),
        )
    })
}

pub(super) fn to_json<T: Serialize>(column: &str, value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value).map_err(|e| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Failed to encode {}: {}", column, e),
        )
    })
}

fn percentage(column: &str, value: Decimal) -> Result<Percentage, DomainError> {
    Percentage::try_new(value).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, e),
        )
    })
}

fn period(year: i32, month: i32) -> Result<BillingPeriod, DomainError> {
    let month = u32::try_from(month).map_err(|_| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid month value: {}", month))
    })?;
    Ok(BillingPeriod::new(year, month)?)
}

// ════════════════════════════════════════════════════════════════════════════
// Catalog rows
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CategoryRow {
    id: Uuid,
    code: String,
    name: String,
    base_amount: Decimal,
    active: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            base_amount: Money::new(row.base_amount),
            active: row.active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct MemberRow {
    id: Uuid,
    display_name: String,
    category_id: Uuid,
    category_code: String,
    joined_on: NaiveDate,
    birth_date: Option<NaiveDate>,
    attributes: serde_json::Value,
}

impl TryFrom<MemberRow> for MemberProfile {
    type Error = DomainError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        let attributes: BTreeMap<String, serde_json::Value> = match row.attributes {
            serde_json::Value::Null => BTreeMap::new(),
            value => from_json("attributes", value)?,
        };
        Ok(MemberProfile {
            id: MemberId::from_uuid(row.id),
            display_name: row.display_name,
            category_id: CategoryId::from_uuid(row.category_id),
            category_code: row.category_code,
            joined_on: row.joined_on,
            birth_date: row.birth_date,
            attributes,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct FamilyLinkRow {
    relative_id: Uuid,
    relationship: String,
    discount_percent: Decimal,
}

impl TryFrom<FamilyLinkRow> for FamilyLink {
    type Error = DomainError;

    fn try_from(row: FamilyLinkRow) -> Result<Self, Self::Error> {
        Ok(FamilyLink {
            relative_id: MemberId::from_uuid(row.relative_id),
            relationship: row.relationship,
            discount: percentage("discount_percent", row.discount_percent)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct EnrollmentRow {
    activity_id: Uuid,
    activity_name: String,
    activity_status: String,
    list_price: Decimal,
    special_price: Option<Decimal>,
    enrolled_on: NaiveDate,
    withdrawn_on: Option<NaiveDate>,
    active: bool,
}

impl TryFrom<EnrollmentRow> for ActivityEnrollment {
    type Error = DomainError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let activity_status: ActivityStatus =
            from_json("activity status", serde_json::Value::String(row.activity_status))?;
        Ok(ActivityEnrollment {
            activity_id: ActivityId::from_uuid(row.activity_id),
            activity_name: row.activity_name,
            activity_status,
            list_price: Money::new(row.list_price),
            special_price: row.special_price.map(Money::new),
            enrolled_on: row.enrolled_on,
            withdrawn_on: row.withdrawn_on,
            active: row.active,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ItemTypeRow {
    id: Uuid,
    code: String,
    name: String,
    category: String,
    formula: Option<serde_json::Value>,
    active: bool,
}

impl TryFrom<ItemTypeRow> for ItemType {
    type Error = DomainError;

    fn try_from(row: ItemTypeRow) -> Result<Self, Self::Error> {
        Ok(ItemType {
            id: ItemTypeId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            category: parse_column("item category", &row.category, ItemCategory::parse)?,
            formula: row.formula.map(|f| from_json("formula", f)).transpose()?,
            active: row.active,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Adjustment, exemption and rule rows
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
pub(super) struct AdjustmentRow {
    id: Uuid,
    member_id: Uuid,
    kind: String,
    value: Decimal,
    scope: String,
    description: String,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdjustmentRow> for ManualAdjustment {
    type Error = DomainError;

    fn try_from(row: AdjustmentRow) -> Result<Self, Self::Error> {
        Ok(ManualAdjustment {
            id: AdjustmentId::from_uuid(row.id),
            member_id: MemberId::from_uuid(row.member_id),
            kind: parse_column("adjustment kind", &row.kind, AdjustmentKind::parse)?,
            value: row.value,
            scope: parse_column("adjustment scope", &row.scope, AdjustmentScope::parse)?,
            description: row.description,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            active: row.active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ExemptionRow {
    id: Uuid,
    member_id: Uuid,
    kind: String,
    percentage: Decimal,
    reason: String,
    status: String,
    valid_from: NaiveDate,
    valid_to: Option<NaiveDate>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ExemptionRow> for Exemption {
    type Error = DomainError;

    fn try_from(row: ExemptionRow) -> Result<Self, Self::Error> {
        Ok(Exemption {
            id: ExemptionId::from_uuid(row.id),
            member_id: MemberId::from_uuid(row.member_id),
            kind: parse_column("exemption kind", &row.kind, ExemptionKind::parse)?,
            percentage: percentage("exemption percentage", row.percentage)?,
            reason: row.reason,
            status: parse_column("exemption status", &row.status, ExemptionStatus::parse)?,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
            active: row.active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct DiscountSettingsRow {
    enabled: bool,
    max_discount_percent: Option<Decimal>,
    default_conflict_mode: String,
}

impl TryFrom<DiscountSettingsRow> for DiscountConfiguration {
    type Error = DomainError;

    fn try_from(row: DiscountSettingsRow) -> Result<Self, Self::Error> {
        Ok(DiscountConfiguration {
            enabled: row.enabled,
            max_discount_percent: row
                .max_discount_percent
                .map(|p| percentage("max_discount_percent", p))
                .transpose()?,
            default_conflict_mode: conflict_mode(row.default_conflict_mode)?,
        })
    }
}

fn conflict_mode(raw: String) -> Result<ConflictMode, DomainError> {
    from_json("conflict mode", serde_json::Value::String(raw))
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct DiscountRuleRow {
    id: Uuid,
    name: String,
    conditions: serde_json::Value,
    strategy: serde_json::Value,
    target: serde_json::Value,
    priority: i32,
    conflict_mode: Option<String>,
    active: bool,
}

impl DiscountRuleRow {
    pub(super) fn id(&self) -> Uuid {
        self.id
    }
}

impl TryFrom<DiscountRuleRow> for DiscountRule {
    type Error = DomainError;

    fn try_from(row: DiscountRuleRow) -> Result<Self, Self::Error> {
        Ok(DiscountRule {
            id: RuleId::from_uuid(row.id),
            name: row.name,
            conditions: from_json("rule conditions", row.conditions)?,
            strategy: from_json("rule strategy", row.strategy)?,
            target: from_json("rule target", row.target)?,
            priority: row.priority,
            conflict_mode: row.conflict_mode.map(conflict_mode).transpose()?,
            active: row.active,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Fee rows
// ════════════════════════════════════════════════════════════════════════════

/// Columns selected for a fee joined with its receipt.
pub(super) const FEE_COLUMNS: &str = r#"
    f.id, f.receipt_id, f.member_id, f.category_id, f.year, f.month,
    f.base_amount, f.activities_amount, f.total_amount, f.status,
    r.status AS receipt_status, f.created_at, f.updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
pub(super) struct FeeRow {
    id: Uuid,
    receipt_id: Uuid,
    member_id: Uuid,
    category_id: Uuid,
    year: i32,
    month: i32,
    base_amount: Decimal,
    activities_amount: Decimal,
    total_amount: Decimal,
    status: String,
    receipt_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FeeRow {
    pub(super) fn id(&self) -> Uuid {
        self.id
    }

    pub(super) fn into_fee(self, items: Vec<LineItem>) -> Result<Fee, DomainError> {
        Ok(Fee {
            id: FeeId::from_uuid(self.id),
            receipt_id: ReceiptId::from_uuid(self.receipt_id),
            member_id: MemberId::from_uuid(self.member_id),
            category_id: CategoryId::from_uuid(self.category_id),
            period: period(self.year, self.month)?,
            base_amount: Money::new(self.base_amount),
            activities_amount: Money::new(self.activities_amount),
            total_amount: Money::new(self.total_amount),
            status: parse_column("fee status", &self.status, FeeStatus::parse)?,
            receipt_status: parse_column("receipt status", &self.receipt_status, ReceiptStatus::parse)?,
            items,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct FeeItemRow {
    id: Uuid,
    fee_id: Uuid,
    item_type_id: Uuid,
    category: String,
    concept: String,
    amount: Decimal,
    quantity: Decimal,
    percentage: Option<Decimal>,
    is_automatic: bool,
    is_editable: bool,
    metadata: serde_json::Value,
}

impl TryFrom<FeeItemRow> for LineItem {
    type Error = DomainError;

    fn try_from(row: FeeItemRow) -> Result<Self, Self::Error> {
        Ok(LineItem {
            id: LineItemId::from_uuid(row.id),
            fee_id: FeeId::from_uuid(row.fee_id),
            item_type_id: ItemTypeId::from_uuid(row.item_type_id),
            category: parse_column("item category", &row.category, ItemCategory::parse)?,
            concept: row.concept,
            amount: Money::new(row.amount),
            quantity: row.quantity,
            percentage: row
                .percentage
                .map(|p| percentage("item percentage", p))
                .transpose()?,
            is_automatic: row.is_automatic,
            is_editable: row.is_editable,
            metadata: row.metadata,
        })
    }
}

/// Loads the items of the given fees, grouped by fee and kept in position order.
pub(super) async fn load_items(
    conn: &mut PgConnection,
    fee_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<LineItem>>, DomainError> {
    let rows: Vec<FeeItemRow> = sqlx::query_as(
        r#"
        SELECT id, fee_id, item_type_id, category, concept, amount, quantity,
               percentage, is_automatic, is_editable, metadata
        FROM fee_items
        WHERE fee_id = ANY($1)
        ORDER BY fee_id, position
        "#,
    )
    .bind(fee_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| DomainError::database("Failed to load fee items", e))?;

    let mut grouped: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
    for row in rows {
        let fee_id = row.fee_id;
        grouped.entry(fee_id).or_default().push(row.try_into()?);
    }
    Ok(grouped)
}

/// Attaches items to fee rows, preserving the row order.
pub(super) async fn hydrate(
    conn: &mut PgConnection,
    rows: Vec<FeeRow>,
) -> Result<Vec<Fee>, DomainError> {
    let ids: Vec<Uuid> = rows.iter().map(FeeRow::id).collect();
    let mut items = load_items(conn, &ids).await?;
    rows.into_iter()
        .map(|row| {
            let fee_items = items.remove(&row.id()).unwrap_or_default();
            row.into_fee(fee_items)
        })
        .collect()
}
