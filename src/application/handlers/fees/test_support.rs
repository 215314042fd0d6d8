//! Shared fixtures for fee handler tests.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::adapters::memory::{default_item_types, InMemoryFeeStore};
use crate::adapters::FixedClock;
use crate::application::FeePipeline;
use crate::domain::adjustment::{AdjustmentKind, AdjustmentScope, ManualAdjustment};
use crate::domain::exemption::{Exemption, ExemptionKind};
use crate::domain::fee::{ItemCategory, SystemItemTypes};
use crate::domain::foundation::{CategoryId, MemberId, Money, Percentage, Timestamp};
use crate::domain::member::{ActivityEnrollment, ActivityStatus, Category, MemberProfile};

use super::{
    CompareFeeHandler, GenerateFeesHandler, PreviewRecalculationHandler, RecalculateFeeHandler,
    RegenerateFeesHandler,
};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn category(code: &str, base_units: i64) -> Category {
    Category {
        id: CategoryId::new(),
        code: code.to_string(),
        name: code.to_string(),
        base_amount: Money::from_units(base_units),
        active: true,
    }
}

pub fn member(category: &Category) -> MemberProfile {
    named_member("Member", category)
}

pub fn named_member(name: &str, category: &Category) -> MemberProfile {
    MemberProfile {
        id: MemberId::new(),
        display_name: name.to_string(),
        category_id: category.id,
        category_code: category.code.clone(),
        joined_on: date(2018, 1, 1),
        birth_date: Some(date(1990, 6, 1)),
        attributes: BTreeMap::new(),
    }
}

pub fn enrollment(name: &str, price_units: i64) -> ActivityEnrollment {
    ActivityEnrollment {
        activity_id: crate::domain::foundation::ActivityId::new(),
        activity_name: name.to_string(),
        activity_status: ActivityStatus::InProgress,
        list_price: Money::from_units(price_units),
        special_price: None,
        enrolled_on: date(2024, 1, 1),
        withdrawn_on: None,
        active: true,
    }
}

pub fn adjustment(member_id: MemberId, kind: AdjustmentKind, value: Decimal) -> ManualAdjustment {
    ManualAdjustment::new(
        member_id,
        kind,
        value,
        AdjustmentScope::Total,
        "Staff adjustment",
        date(2024, 1, 1),
        None,
        Timestamp::start_of(date(2024, 1, 1)),
    )
    .unwrap()
}

pub fn exemption(member_id: MemberId, kind: ExemptionKind, percentage: u8) -> Exemption {
    let mut exemption = Exemption::request(
        member_id,
        kind,
        Percentage::from_whole(percentage),
        "Hardship",
        date(2024, 1, 1),
        Some(date(2024, 12, 31)),
        Timestamp::start_of(date(2023, 12, 15)),
    )
    .unwrap();
    exemption.approve().unwrap();
    exemption.activate().unwrap();
    exemption
}

/// System item types detached from any store.
pub fn item_types() -> SystemItemTypes {
    let mut types = default_item_types().into_iter();
    let mut next = |category: ItemCategory| {
        let t = types.next().unwrap();
        assert_eq!(t.category, category);
        t
    };
    SystemItemTypes {
        base: next(ItemCategory::Base),
        activity: next(ItemCategory::Activity),
        adjustment: next(ItemCategory::Adjustment),
        exemption: next(ItemCategory::Exemption),
        discount: next(ItemCategory::Discount),
    }
}

/// In-memory store, pinned clock and handler factories.
pub struct Fixture {
    pub store: InMemoryFeeStore,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: InMemoryFeeStore::with_system_item_types(),
            clock: Arc::new(FixedClock::on(date(2024, 3, 10))),
        }
    }

    pub fn without_item_types() -> Self {
        Self {
            store: InMemoryFeeStore::new(),
            clock: Arc::new(FixedClock::on(date(2024, 3, 10))),
        }
    }

    pub fn pipeline(&self) -> FeePipeline {
        let store = Arc::new(self.store.clone());
        FeePipeline::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            self.clock.clone(),
        )
        .with_adjustments(store.clone())
        .with_exemptions(store.clone())
        .with_discount_rules(store)
    }

    pub fn generate_handler(&self) -> GenerateFeesHandler {
        GenerateFeesHandler::new(Arc::new(self.pipeline()), Arc::new(self.store.clone()))
    }

    pub fn recalculate_handler(&self) -> RecalculateFeeHandler {
        RecalculateFeeHandler::new(
            Arc::new(self.pipeline()),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
        )
    }

    pub fn regenerate_handler(&self) -> RegenerateFeesHandler {
        RegenerateFeesHandler::new(
            Arc::new(self.generate_handler()),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            self.clock.clone(),
        )
    }

    pub fn preview_handler(&self) -> PreviewRecalculationHandler {
        PreviewRecalculationHandler::new(Arc::new(self.pipeline()), Arc::new(self.store.clone()))
    }

    pub fn compare_handler(&self) -> CompareFeeHandler {
        CompareFeeHandler::new(Arc::new(self.pipeline()), Arc::new(self.store.clone()))
    }
}

impl Deref for Fixture {
    type Target = InMemoryFeeStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
