//! Activity enrollments consumed from the activity catalog.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActivityId, Money};

/// Lifecycle status of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Upcoming,
    InProgress,
    Finished,
    Cancelled,
}

impl ActivityStatus {
    /// Only upcoming and running activities are billed.
    pub fn is_billable(&self) -> bool {
        matches!(self, ActivityStatus::Upcoming | ActivityStatus::InProgress)
    }
}

/// A member's enrollment in one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEnrollment {
    pub activity_id: ActivityId,
    pub activity_name: String,
    pub activity_status: ActivityStatus,
    pub list_price: Money,
    /// Per-enrollment negotiated price; wins over the list price when set.
    pub special_price: Option<Money>,
    pub enrolled_on: NaiveDate,
    pub withdrawn_on: Option<NaiveDate>,
    pub active: bool,
}

impl ActivityEnrollment {
    /// Price charged for this enrollment.
    pub fn cost(&self) -> Money {
        self.special_price.unwrap_or(self.list_price)
    }

    /// True when the enrollment is billable on the given date.
    pub fn is_billable_at(&self, date: NaiveDate) -> bool {
        self.active
            && self.activity_status.is_billable()
            && self.enrolled_on <= date
            && self.withdrawn_on.map_or(true, |withdrawn| withdrawn > date)
    }
}
