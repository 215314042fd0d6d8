//! Member and category views consumed from the member catalog.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{CategoryId, MemberId, Money};

/// Membership category with its catalog base amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Short code used in configuration keys (e.g. "ACTIVE", "JUNIOR").
    pub code: String,
    pub name: String,
    pub base_amount: Money,
    pub active: bool,
}

/// Read-only view of a member as needed for fee computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: MemberId,
    pub display_name: String,
    pub category_id: CategoryId,
    pub category_code: String,
    pub joined_on: NaiveDate,
    pub birth_date: Option<NaiveDate>,
    /// Free-form attributes available to custom rule predicates.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl MemberProfile {
    /// Full years of membership at the given date.
    pub fn seniority_years(&self, at: NaiveDate) -> u32 {
        at.years_since(self.joined_on).unwrap_or(0)
    }

    /// Age in full years at the given date, if the birth date is known.
    pub fn age_at(&self, at: NaiveDate) -> Option<u32> {
        self.birth_date.and_then(|birth| at.years_since(birth))
    }
}
