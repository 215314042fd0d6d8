//! Member facts that discount rules are evaluated against.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Metric;
use crate::domain::member::{FamilyDiscount, MemberProfile};

/// Evaluation context for one member and period.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub member: MemberProfile,
    pub reference_date: NaiveDate,
    pub activity_count: u32,
    /// Loaded only when some active rule needs it.
    pub family: Option<FamilyDiscount>,
}

impl RuleContext {
    pub fn new(member: MemberProfile, reference_date: NaiveDate, activity_count: u32) -> Self {
        Self {
            member,
            reference_date,
            activity_count,
            family: None,
        }
    }

    pub fn with_family(mut self, family: FamilyDiscount) -> Self {
        self.family = Some(family);
        self
    }

    pub fn seniority_years(&self) -> u32 {
        self.member.seniority_years(self.reference_date)
    }

    pub fn age(&self) -> Option<u32> {
        self.member.age_at(self.reference_date)
    }

    pub fn household_size(&self) -> u32 {
        self.family.as_ref().map_or(1, |f| f.household_size())
    }

    /// Metric value as a lookup key.
    pub fn metric_key(&self, metric: Metric) -> String {
        match metric {
            Metric::CategoryCode => self.member.category_code.clone(),
            Metric::ActivityCount => self.activity_count.to_string(),
            Metric::SeniorityYears => self.seniority_years().to_string(),
            Metric::HouseholdSize => self.household_size().to_string(),
        }
    }

    /// Numeric metric value; `None` for non-numeric metrics.
    pub fn metric_value(&self, metric: Metric) -> Option<Decimal> {
        match metric {
            Metric::CategoryCode => None,
            Metric::ActivityCount => Some(Decimal::from(self.activity_count)),
            Metric::SeniorityYears => Some(Decimal::from(self.seniority_years())),
            Metric::HouseholdSize => Some(Decimal::from(self.household_size())),
        }
    }
}
