//! Manual adjustment entity.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AdjustmentId, MemberId, Timestamp, ValidationError};

/// Kind of a staff-entered adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    DiscountFixed,
    DiscountPercent,
    SurchargeFixed,
    SurchargePercent,
}

impl AdjustmentKind {
    pub fn is_percentage(&self) -> bool {
        matches!(
            self,
            AdjustmentKind::DiscountPercent | AdjustmentKind::SurchargePercent
        )
    }

    pub fn is_discount(&self) -> bool {
        matches!(
            self,
            AdjustmentKind::DiscountFixed | AdjustmentKind::DiscountPercent
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::DiscountFixed => "discount_fixed",
            AdjustmentKind::DiscountPercent => "discount_percent",
            AdjustmentKind::SurchargeFixed => "surcharge_fixed",
            AdjustmentKind::SurchargePercent => "surcharge_percent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "discount_fixed" => Some(AdjustmentKind::DiscountFixed),
            "discount_percent" => Some(AdjustmentKind::DiscountPercent),
            "surcharge_fixed" => Some(AdjustmentKind::SurchargeFixed),
            "surcharge_percent" => Some(AdjustmentKind::SurchargePercent),
            _ => None,
        }
    }
}

/// Which part of the fee a percentage adjustment is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentScope {
    /// The running amount at the time the adjustment applies.
    #[default]
    Total,
    /// The base charge only.
    Base,
    /// The activity charges only.
    Activities,
}

impl AdjustmentScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentScope::Total => "total",
            AdjustmentScope::Base => "base",
            AdjustmentScope::Activities => "activities",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "total" => Some(AdjustmentScope::Total),
            "base" => Some(AdjustmentScope::Base),
            "activities" => Some(AdjustmentScope::Activities),
            _ => None,
        }
    }
}

/// A staff-entered delta over a date range.
///
/// Adjustments are never deleted; deactivation keeps them for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAdjustment {
    pub id: AdjustmentId,
    pub member_id: MemberId,
    pub kind: AdjustmentKind,
    /// Amount for fixed kinds, percentage points for percent kinds.
    pub value: Decimal,
    pub scope: AdjustmentScope,
    pub description: String,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub active: bool,
    pub created_at: Timestamp,
}

impl ManualAdjustment {
    /// Creates an active adjustment after validating its value and range.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        member_id: MemberId,
        kind: AdjustmentKind,
        value: Decimal,
        scope: AdjustmentScope,
        description: impl Into<String>,
        valid_from: NaiveDate,
        valid_to: Option<NaiveDate>,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if value.is_sign_negative() {
            return Err(ValidationError::out_of_range("value", 0, "unbounded", value));
        }
        if kind == AdjustmentKind::DiscountPercent && value > Decimal::ONE_HUNDRED {
            return Err(ValidationError::out_of_range("value", 0, 100, value));
        }
        if let Some(to) = valid_to {
            if to < valid_from {
                return Err(ValidationError::invalid_format(
                    "valid_to",
                    format!("{} is before valid_from {}", to, valid_from),
                ));
            }
        }

        Ok(Self {
            id: AdjustmentId::new(),
            member_id,
            kind,
            value,
            scope,
            description: description.into(),
            valid_from,
            valid_to,
            active: true,
            created_at,
        })
    }

    /// True when the adjustment is active and its range covers `date`.
    pub fn is_active_at(&self, date: NaiveDate) -> bool {
        self.active
            && self.valid_from <= date
            && self.valid_to.map_or(true, |to| date <= to)
    }

    /// Soft-deactivates the adjustment.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}
