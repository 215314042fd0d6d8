//! Shared builders for the integration tests.
//!
//! Everything runs over `InMemoryFeeStore` with the clock pinned to
//! 2024-03-10, so March 2024 is the period under test.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use dues_engine::adapters::{FixedClock, InMemoryFeeStore};
use dues_engine::application::{
    CalculationLayers, FeePipeline, GenerateFeesCommand, GenerateFeesHandler,
    PreviewRecalculationHandler, RecalculateFeeCommand, RecalculateFeeHandler,
    RegenerateFeesCommand, RegenerateFeesHandler,
};
use dues_engine::domain::adjustment::{AdjustmentKind, AdjustmentScope, ManualAdjustment};
use dues_engine::domain::discount::{ConflictMode, DiscountRule, DiscountStrategy, TargetScope};
use dues_engine::domain::exemption::{Exemption, ExemptionKind};
use dues_engine::domain::foundation::{
    CategoryId, CommandMetadata, FeeId, MemberId, Money, Percentage, RuleId, Timestamp,
};
use dues_engine::domain::member::{Category, MemberProfile};
use dues_engine::ports::FeeScope;

pub const YEAR: i32 = 2024;
pub const MONTH: u32 = 3;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn metadata() -> CommandMetadata {
    CommandMetadata::new("treasurer").with_source("integration-test")
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

pub fn member(name: &str, category: &Category) -> MemberProfile {
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

pub fn adjustment(member_id: MemberId, kind: AdjustmentKind, value: Decimal) -> ManualAdjustment {
    ManualAdjustment::new(
        member_id,
        kind,
        value,
        AdjustmentScope::Total,
        "Board decision",
        date(2024, 1, 1),
        None,
        Timestamp::start_of(date(2024, 1, 1)),
    )
    .unwrap()
}

pub fn partial_exemption(member_id: MemberId, percentage: u8) -> Exemption {
    let mut exemption = Exemption::request(
        member_id,
        ExemptionKind::Partial,
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

pub fn flat_rule(name: &str, percentage: u8, priority: i32, mode: ConflictMode) -> DiscountRule {
    DiscountRule {
        id: RuleId::new(),
        name: name.to_string(),
        conditions: Vec::new(),
        strategy: DiscountStrategy::FlatPercent {
            percentage: Percentage::from_whole(percentage),
        },
        target: TargetScope::AllItems,
        priority,
        conflict_mode: Some(mode),
        active: true,
    }
}

/// In-memory store plus a pinned clock, with handler factories.
pub struct Harness {
    pub store: InMemoryFeeStore,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: InMemoryFeeStore::with_system_item_types(),
            clock: Arc::new(FixedClock::on(date(2024, 3, 10))),
        }
    }

    /// One category and one member in it.
    pub fn with_member(base_units: i64) -> (Self, MemberProfile) {
        let harness = Self::new();
        let cat = category("ACTIVE", base_units);
        let m = member("Ana", &cat);
        harness.store.add_category(cat);
        harness.store.add_member(m.clone());
        (harness, m)
    }

    fn pipeline(&self) -> Arc<FeePipeline> {
        let store = Arc::new(self.store.clone());
        Arc::new(
            FeePipeline::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                self.clock.clone(),
            )
            .with_adjustments(store.clone())
            .with_exemptions(store.clone())
            .with_discount_rules(store),
        )
    }

    pub fn generator(&self) -> GenerateFeesHandler {
        GenerateFeesHandler::new(self.pipeline(), Arc::new(self.store.clone()))
    }

    pub fn recalculator(&self) -> RecalculateFeeHandler {
        RecalculateFeeHandler::new(
            self.pipeline(),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
        )
    }

    pub fn regenerator(&self) -> RegenerateFeesHandler {
        RegenerateFeesHandler::new(
            Arc::new(self.generator()),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            self.clock.clone(),
        )
    }

    pub fn previewer(&self) -> PreviewRecalculationHandler {
        PreviewRecalculationHandler::new(self.pipeline(), Arc::new(self.store.clone()))
    }
}

pub fn generate_command() -> GenerateFeesCommand {
    GenerateFeesCommand {
        year: YEAR,
        month: MONTH,
        scope: FeeScope::all(),
        apply_discount_rules: true,
    }
}

pub fn regenerate_command() -> RegenerateFeesCommand {
    RegenerateFeesCommand {
        year: YEAR,
        month: MONTH,
        scope: FeeScope::all(),
        apply_discount_rules: true,
    }
}

pub fn recalculate_command(fee_id: FeeId) -> RecalculateFeeCommand {
    RecalculateFeeCommand {
        fee_id,
        layers: CalculationLayers::ALL,
    }
}
