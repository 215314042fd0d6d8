//! Fee pipeline - composes a fee and runs the adjustment layers.
//!
//! Shared by every fee handler so that generation, recalculation, preview
//! and comparison produce identical items for identical inputs:
//!
//! 1. Base and activity charges (catalog, override, enrollments)
//! 2. Manual adjustments, in creation order
//! 3. The single in-effect exemption
//! 4. Discount rules (optional)
//!
//! All reads happen here, outside any transaction. Nothing is written.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::adjustment::{AdjustmentBreakdown, AdjustmentCalculator, AdjustmentOutcome};
use crate::domain::discount::{
    DiscountInput, DiscountOutcome, DiscountRuleEngine, LookupTables, RuleContext, RuleSet,
};
use crate::domain::exemption::{ExemptionEvaluator, ExemptionOutcome};
use crate::domain::fee::{FeeComposer, FeeComposition, FeeError, FeeSnapshot, LineItem, SystemItemTypes};
use crate::domain::foundation::{BillingPeriod, ExemptionId, FeeId, Money};
use crate::domain::member::{Category, MemberProfile};
use crate::ports::{
    ActivityCatalog, AdjustmentReader, Clock, ConfigStore, DiscountRuleReader, ExemptionReader,
    ItemTypeCatalog, MemberCatalog,
};

/// Default configuration key prefix for base amount overrides.
pub const DEFAULT_BASE_AMOUNT_KEY_PREFIX: &str = "fees.base_amount.";

/// Which adjustment layers run for a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationLayers {
    pub adjustments: bool,
    pub exemptions: bool,
    pub discounts: bool,
}

impl CalculationLayers {
    pub const ALL: Self = Self {
        adjustments: true,
        exemptions: true,
        discounts: true,
    };

    /// Adjustments and exemptions only.
    pub const WITHOUT_DISCOUNTS: Self = Self {
        adjustments: true,
        exemptions: true,
        discounts: false,
    };

    pub fn with_discounts(self, discounts: bool) -> Self {
        Self { discounts, ..self }
    }
}

impl Default for CalculationLayers {
    fn default() -> Self {
        Self::ALL
    }
}

/// Per-operation inputs resolved once and shared across fees.
#[derive(Debug, Clone)]
pub struct CalculationContext {
    pub types: SystemItemTypes,
    pub rule_set: RuleSet,
    pub layers: CalculationLayers,
}

/// Everything the pipeline computed for one fee.
#[derive(Debug, Clone)]
pub struct FeeCalculation {
    pub category: Category,
    pub composition: FeeComposition,
    pub adjustments: AdjustmentOutcome,
    pub exemption: Option<ExemptionOutcome>,
    /// In-effect exemptions passed over in favor of `exemption`.
    pub ignored_exemptions: Vec<ExemptionId>,
    pub discounts: DiscountOutcome,
    /// Items the engine owns, in pipeline order.
    pub automatic_items: Vec<LineItem>,
    /// Operator items carried over unchanged.
    pub manual_items: Vec<LineItem>,
}

impl FeeCalculation {
    pub fn total(&self) -> Money {
        self.automatic_items
            .iter()
            .chain(self.manual_items.iter())
            .map(|i| i.amount)
            .sum()
    }

    /// Snapshot of the fee as it would be stored.
    pub fn snapshot(&self) -> FeeSnapshot {
        let items: Vec<LineItem> = self
            .automatic_items
            .iter()
            .chain(self.manual_items.iter())
            .cloned()
            .collect();
        FeeSnapshot::from_items(&items)
    }
}

/// Runs the composer and the adjustment layers against the catalogs.
pub struct FeePipeline {
    members: Arc<dyn MemberCatalog>,
    activities: Arc<dyn ActivityCatalog>,
    config_store: Arc<dyn ConfigStore>,
    item_types: Arc<dyn ItemTypeCatalog>,
    clock: Arc<dyn Clock>,
    adjustments: Option<Arc<dyn AdjustmentReader>>,
    exemptions: Option<Arc<dyn ExemptionReader>>,
    discount_rules: Option<Arc<dyn DiscountRuleReader>>,
    engine: DiscountRuleEngine,
    base_amount_key_prefix: String,
}

impl FeePipeline {
    pub fn new(
        members: Arc<dyn MemberCatalog>,
        activities: Arc<dyn ActivityCatalog>,
        config_store: Arc<dyn ConfigStore>,
        item_types: Arc<dyn ItemTypeCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            members,
            activities,
            config_store,
            item_types,
            clock,
            adjustments: None,
            exemptions: None,
            discount_rules: None,
            engine: DiscountRuleEngine::default(),
            base_amount_key_prefix: DEFAULT_BASE_AMOUNT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_adjustments(mut self, reader: Arc<dyn AdjustmentReader>) -> Self {
        self.adjustments = Some(reader);
        self
    }

    pub fn with_exemptions(mut self, reader: Arc<dyn ExemptionReader>) -> Self {
        self.exemptions = Some(reader);
        self
    }

    pub fn with_discount_rules(mut self, reader: Arc<dyn DiscountRuleReader>) -> Self {
        self.discount_rules = Some(reader);
        self
    }

    pub fn with_engine(mut self, engine: DiscountRuleEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_base_amount_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.base_amount_key_prefix = prefix.into();
        self
    }

    pub fn members(&self) -> &Arc<dyn MemberCatalog> {
        &self.members
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Resolves item types, and the rule set when discounts are requested.
    pub async fn prepare(&self, layers: CalculationLayers) -> Result<CalculationContext, FeeError> {
        let types = self.system_item_types().await?;
        let rule_set = if layers.discounts {
            self.load_rule_set().await?
        } else {
            RuleSet::disabled()
        };
        Ok(CalculationContext {
            types,
            rule_set,
            layers,
        })
    }

    async fn system_item_types(&self) -> Result<SystemItemTypes, FeeError> {
        let mut resolved = Vec::with_capacity(SystemItemTypes::REQUIRED_CODES.len());
        for code in SystemItemTypes::REQUIRED_CODES {
            let item_type = self
                .item_types
                .find_by_code(code)
                .await?
                .ok_or_else(|| FeeError::item_type_not_found(code))?;
            resolved.push(item_type);
        }

        let [base, activity, adjustment, exemption, discount]: [_; 5] = resolved
            .try_into()
            .map_err(|_| FeeError::infrastructure("system item types incomplete"))?;
        Ok(SystemItemTypes {
            base,
            activity,
            adjustment,
            exemption,
            discount,
        })
    }

    /// Loads configuration, active rules and the lookup tables they reference.
    pub async fn load_rule_set(&self) -> Result<RuleSet, FeeError> {
        let Some(reader) = &self.discount_rules else {
            return Ok(RuleSet::disabled());
        };

        let configuration = reader.configuration().await?;
        if !configuration.enabled {
            debug!("discount rules disabled by configuration");
            return Ok(RuleSet::disabled());
        }

        let rules = reader.active_rules().await?;
        let mut tables = LookupTables::new();
        for table in RuleSet::referenced_tables(&rules) {
            let entries = self
                .config_store
                .entries_with_prefix(&format!("{}.", table))
                .await?;
            tables.insert(table, entries);
        }

        Ok(RuleSet::new(configuration, rules, tables))
    }

    /// Computes the items of one fee.
    pub async fn calculate(
        &self,
        fee_id: FeeId,
        member: &MemberProfile,
        period: BillingPeriod,
        manual_items: Vec<LineItem>,
        context: &CalculationContext,
    ) -> Result<FeeCalculation, FeeError> {
        let category = self
            .members
            .find_category(&member.category_id)
            .await?
            .ok_or(FeeError::CategoryNotFound(member.category_id))?;

        let override_key = format!("{}{}", self.base_amount_key_prefix, category.code);
        let override_value = self.config_store.get_by_key(&override_key).await?;
        let enrollments = self.activities.enrollments_for(&member.id, period).await?;

        let composition = FeeComposer::compose(
            &category,
            override_value.as_deref(),
            &enrollments,
            period,
            &context.types,
        );
        let mut automatic_items = composition.to_items(fee_id, &context.types);

        let manual_total: Money = manual_items.iter().map(|i| i.amount).sum();
        let subtotal = composition.subtotal() + manual_total;
        let reference = period.start_date();

        // Layer 1: manual adjustments
        let adjustments = match (&self.adjustments, context.layers.adjustments) {
            (Some(reader), true) => {
                let rows = reader.active_for_member(&member.id, reference).await?;
                let selected = AdjustmentCalculator::select(&rows, member.id, reference);
                AdjustmentCalculator::apply(
                    subtotal,
                    AdjustmentBreakdown {
                        base: composition.base_amount,
                        activities: composition.activities_amount,
                    },
                    &selected,
                )
            }
            _ => AdjustmentOutcome::unchanged(subtotal),
        };
        automatic_items.extend(adjustments.to_items(fee_id, &context.types.adjustment));
        let mut running = adjustments.final_amount;

        // Layer 2: exemption
        let mut exemption = None;
        let mut ignored_exemptions = Vec::new();
        if let (Some(reader), true) = (&self.exemptions, context.layers.exemptions) {
            let today = self.clock.today();
            let rows = reader.in_effect_for_member(&member.id, reference, today).await?;
            let selection = ExemptionEvaluator::select(&rows, member.id, reference, today);
            if !selection.ignored.is_empty() {
                warn!(
                    member_id = %member.id,
                    ignored = selection.ignored.len(),
                    "member has more than one exemption in effect; applying the latest"
                );
            }
            ignored_exemptions = selection.ignored;
            if let Some(selected) = selection.selected {
                let outcome = ExemptionEvaluator::apply(running, selected);
                automatic_items.extend(outcome.to_item(fee_id, &context.types.exemption));
                running = outcome.running_after;
                exemption = Some(outcome);
            }
        }

        // Layer 3: discount rules
        let discounts = if context.layers.discounts && context.rule_set.is_active() {
            let mut rule_context =
                RuleContext::new(member.clone(), reference, composition.activity_count());
            if context.rule_set.needs_family() {
                rule_context = rule_context.with_family(self.members.family_discount(&member.id).await?);
            }

            let targets: Vec<LineItem> = automatic_items
                .iter()
                .chain(manual_items.iter())
                .cloned()
                .collect();
            let outcome = self.engine.apply(
                &context.rule_set,
                DiscountInput {
                    fee_id,
                    context: &rule_context,
                    items: &targets,
                    available: running,
                    discount_type: &context.types.discount,
                    applied_at: self.clock.now(),
                },
            );
            for skipped in &outcome.skipped_rules {
                warn!(
                    rule_id = %skipped.rule_id,
                    rule = %skipped.rule_name,
                    member_id = %member.id,
                    reason = %skipped.reason,
                    "discount rule skipped"
                );
            }
            automatic_items.extend(outcome.items.iter().cloned());
            outcome
        } else {
            DiscountOutcome::default()
        };

        Ok(FeeCalculation {
            category,
            composition,
            adjustments,
            exemption,
            ignored_exemptions,
            discounts,
            automatic_items,
            manual_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::fees::test_support::{
        adjustment, category, exemption, item_types, member, Fixture,
    };
    use crate::domain::adjustment::{AdjustmentKind, AdjustmentScope};
    use crate::domain::discount::{
        ConflictMode, DiscountConfiguration, DiscountRule, DiscountStrategy, RuleCondition,
        TargetScope,
    };
    use crate::domain::exemption::ExemptionKind;
    use crate::domain::fee::ItemCategory;
    use crate::domain::foundation::{Percentage, RuleId};
    use rust_decimal::Decimal;

    fn period() -> BillingPeriod {
        BillingPeriod::new(2024, 3).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Layer ordering
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn adjustment_then_exemption_compound_on_running_amount() {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let m = member(&cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        fixture.add_adjustment(adjustment(
            m.id,
            AdjustmentKind::DiscountPercent,
            Decimal::from(20),
        ));
        fixture.add_exemption(exemption(m.id, ExemptionKind::Partial, 50));

        let pipeline = fixture.pipeline();
        let context = pipeline.prepare(CalculationLayers::ALL).await.unwrap();
        let calc = pipeline
            .calculate(FeeId::new(), &m, period(), Vec::new(), &context)
            .await
            .unwrap();

        assert_eq!(calc.adjustments.final_amount, Money::from_units(8000));
        assert_eq!(calc.exemption.as_ref().unwrap().amount, Money::from_units(4000));
        assert_eq!(calc.total(), Money::from_units(4000));
    }

    #[tokio::test]
    async fn fixed_adjustment_then_exemption() {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let m = member(&cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        fixture.add_adjustment(adjustment(
            m.id,
            AdjustmentKind::DiscountFixed,
            Decimal::from(1000),
        ));
        fixture.add_exemption(exemption(m.id, ExemptionKind::Partial, 50));

        let pipeline = fixture.pipeline();
        let context = pipeline.prepare(CalculationLayers::ALL).await.unwrap();
        let calc = pipeline
            .calculate(FeeId::new(), &m, period(), Vec::new(), &context)
            .await
            .unwrap();

        assert_eq!(calc.total(), Money::from_units(4500));
        assert_eq!(calc.snapshot().total_amount, Money::from_units(4500));
    }

    #[tokio::test]
    async fn disabled_layers_leave_subtotal_untouched() {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let m = member(&cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        fixture.add_adjustment(adjustment(
            m.id,
            AdjustmentKind::SurchargeFixed,
            Decimal::from(500),
        ));

        let pipeline = fixture.pipeline();
        let layers = CalculationLayers {
            adjustments: false,
            exemptions: false,
            discounts: false,
        };
        let context = pipeline.prepare(layers).await.unwrap();
        let calc = pipeline
            .calculate(FeeId::new(), &m, period(), Vec::new(), &context)
            .await
            .unwrap();

        assert_eq!(calc.total(), Money::from_units(10000));
        assert!(calc.adjustments.applied.is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Base amount and catalogs
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn config_override_replaces_catalog_base() {
        let fixture = Fixture::new();
        let cat = category("JUNIOR", 6000);
        let m = member(&cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        fixture.set_config("fees.base_amount.JUNIOR", "4500.00");

        let pipeline = fixture.pipeline();
        let context = pipeline.prepare(CalculationLayers::ALL).await.unwrap();
        let calc = pipeline
            .calculate(FeeId::new(), &m, period(), Vec::new(), &context)
            .await
            .unwrap();

        assert_eq!(calc.composition.base_amount, Money::from_units(4500));
    }

    #[tokio::test]
    async fn missing_category_fails() {
        let fixture = Fixture::new();
        let cat = category("GHOST", 1000);
        let m = member(&cat);

        let pipeline = fixture.pipeline();
        let context = pipeline.prepare(CalculationLayers::ALL).await.unwrap();
        let err = pipeline
            .calculate(FeeId::new(), &m, period(), Vec::new(), &context)
            .await
            .unwrap_err();

        assert!(matches!(err, FeeError::CategoryNotFound(id) if id == cat.id));
    }

    #[tokio::test]
    async fn missing_item_type_fails_prepare() {
        let fixture = Fixture::without_item_types();
        let err = fixture
            .pipeline()
            .prepare(CalculationLayers::ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::ItemTypeNotFound(code) if code == "BASE_FEE"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Discounts
    // ════════════════════════════════════════════════════════════════════════════

    fn category_rule(code: &str, percentage: u8) -> DiscountRule {
        DiscountRule {
            id: RuleId::new(),
            name: format!("{} discount", code),
            conditions: vec![RuleCondition::Category {
                codes: vec![code.to_string()],
            }],
            strategy: DiscountStrategy::FlatPercent {
                percentage: Percentage::from_whole(percentage),
            },
            target: TargetScope::ItemCategory {
                category: ItemCategory::Base,
            },
            priority: 10,
            conflict_mode: Some(ConflictMode::Stack),
            active: true,
        }
    }

    #[tokio::test]
    async fn discount_applies_after_exemption_and_is_capped_by_running_amount() {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let m = member(&cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        fixture.add_exemption(exemption(m.id, ExemptionKind::Partial, 95));
        fixture.add_rule(category_rule("ACTIVE", 10));

        let pipeline = fixture.pipeline();
        let context = pipeline.prepare(CalculationLayers::ALL).await.unwrap();
        let calc = pipeline
            .calculate(FeeId::new(), &m, period(), Vec::new(), &context)
            .await
            .unwrap();

        // 10% of 10000 would be 1000 but only 500 is left after the exemption
        assert_eq!(calc.discounts.total_discount, Money::from_units(500));
        assert_eq!(calc.total(), Money::ZERO);
    }

    #[tokio::test]
    async fn discounts_skipped_when_layer_off() {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let m = member(&cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        fixture.add_rule(category_rule("ACTIVE", 10));

        let pipeline = fixture.pipeline();
        let context = pipeline
            .prepare(CalculationLayers::WITHOUT_DISCOUNTS)
            .await
            .unwrap();
        let calc = pipeline
            .calculate(FeeId::new(), &m, period(), Vec::new(), &context)
            .await
            .unwrap();

        assert!(calc.discounts.items.is_empty());
        assert_eq!(calc.total(), Money::from_units(10000));
    }

    #[tokio::test]
    async fn disabled_configuration_yields_inactive_rule_set() {
        let fixture = Fixture::new();
        fixture.set_discount_configuration(DiscountConfiguration {
            enabled: false,
            ..DiscountConfiguration::default()
        });
        fixture.add_rule(category_rule("ACTIVE", 10));

        let rule_set = fixture.pipeline().load_rule_set().await.unwrap();
        assert!(!rule_set.is_active());
    }

    #[tokio::test]
    async fn lookup_tables_are_loaded_for_referenced_tables() {
        let fixture = Fixture::new();
        fixture.set_config("category_discounts.ACTIVE", "15");
        fixture.add_rule(DiscountRule {
            strategy: DiscountStrategy::ConfigLookup {
                table: "category_discounts".to_string(),
                key: crate::domain::discount::Metric::CategoryCode,
            },
            ..category_rule("ACTIVE", 0)
        });

        let rule_set = fixture.pipeline().load_rule_set().await.unwrap();
        let table = rule_set.lookup_tables().get("category_discounts").unwrap();
        assert_eq!(table.get("ACTIVE").map(String::as_str), Some("15"));
    }

    #[tokio::test]
    async fn manual_items_are_kept_and_counted() {
        let fixture = Fixture::new();
        let cat = category("ACTIVE", 10000);
        let m = member(&cat);
        fixture.add_category(cat);
        fixture.add_member(m.clone());
        let types = item_types();
        let fee_id = FeeId::new();
        let manual = LineItem::manual(
            fee_id,
            &types.adjustment,
            "Locker",
            Money::from_units(700),
        );
        fixture.add_adjustment({
            let mut a = adjustment(m.id, AdjustmentKind::DiscountPercent, Decimal::from(10));
            a.scope = AdjustmentScope::Total;
            a
        });

        let pipeline = fixture.pipeline();
        let context = pipeline.prepare(CalculationLayers::ALL).await.unwrap();
        let calc = pipeline
            .calculate(fee_id, &m, period(), vec![manual], &context)
            .await
            .unwrap();

        // (10000 + 700) - 10%
        assert_eq!(calc.total(), Money::from_units(9630));
        assert_eq!(calc.manual_items.len(), 1);
    }
}
