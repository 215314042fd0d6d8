//! In-memory store implementing every fee engine port.
//!
//! Intended for tests and local runs. All state lives behind one mutex;
//! transactions stage their writes and replay them on commit.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::transaction::{InMemoryTransaction, StoreState};
use crate::domain::adjustment::ManualAdjustment;
use crate::domain::discount::{DiscountConfiguration, DiscountRule, RuleApplication};
use crate::domain::exemption::Exemption;
use crate::domain::fee::{
    Fee, ItemCategory, ItemType, ReceiptStatus, ACTIVITY_FEE_CODE, AUTOMATIC_DISCOUNT_CODE,
    BASE_FEE_CODE, EXEMPTION_CODE, MANUAL_ADJUSTMENT_CODE,
};
use crate::domain::foundation::{
    BillingPeriod, CategoryId, DomainError, ErrorCode, FeeId, ItemTypeId, MemberId, Money,
    ReceiptId,
};
use crate::domain::history::HistoryEntry;
use crate::domain::member::{ActivityEnrollment, Category, FamilyDiscount, MemberProfile};
use crate::ports::{
    ActivityCatalog, AdjustmentReader, ConfigStore, DiscountRuleReader, ExemptionReader,
    FeeReader, FeeScope, FeeTransaction, ItemTypeCatalog, MemberCatalog, UnitOfWork,
};

/// Injected failures for exercising error paths.
#[derive(Debug, Default)]
pub(super) struct Faults {
    pub fee_insert_members: HashSet<MemberId>,
    pub history_writes: bool,
}

pub(super) struct Shared {
    pub state: Mutex<StoreState>,
    pub faults: Mutex<Faults>,
}

impl Shared {
    pub fn lock_state(&self) -> Result<MutexGuard<'_, StoreState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "in-memory store poisoned"))
    }

    pub fn lock_faults(&self) -> Result<MutexGuard<'_, Faults>, DomainError> {
        self.faults
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "in-memory store poisoned"))
    }
}

/// In-memory fee store.
///
/// Cloning is cheap and shares state, so one store can be handed to every
/// port slot of a handler.
///
/// # Panics
///
/// The seeding and inspection helpers panic if the internal lock is
/// poisoned. Port methods return an error instead.
///
/// # Example
///
/// ```ignore
/// let store = InMemoryFeeStore::with_system_item_types();
/// store.add_category(category.clone());
/// store.add_member(member);
/// let handler = GenerateFeesHandler::new(pipeline, store.clone().into_arc(), config);
/// ```
#[derive(Clone)]
pub struct InMemoryFeeStore {
    shared: Arc<Shared>,
}

impl InMemoryFeeStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::default()),
                faults: Mutex::new(Faults::default()),
            }),
        }
    }

    /// A store seeded with the item types the engine writes.
    pub fn with_system_item_types() -> Self {
        let store = Self::new();
        for item_type in default_item_types() {
            store.add_item_type(item_type);
        }
        store
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.shared
            .state
            .lock()
            .expect("InMemoryFeeStore: state lock poisoned")
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.shared
            .faults
            .lock()
            .expect("InMemoryFeeStore: faults lock poisoned")
    }

    // === Seeding ===

    pub fn add_category(&self, category: Category) {
        self.state().categories.insert(category.id, category);
    }

    pub fn add_member(&self, member: MemberProfile) {
        self.state().members.insert(member.id, member);
    }

    /// Keeps the member but stops billing them.
    pub fn deactivate_member(&self, member_id: MemberId) {
        self.state().inactive_members.insert(member_id);
    }

    pub fn add_enrollment(&self, member_id: MemberId, enrollment: ActivityEnrollment) {
        self.state()
            .enrollments
            .entry(member_id)
            .or_default()
            .push(enrollment);
    }

    pub fn set_family(&self, member_id: MemberId, family: FamilyDiscount) {
        self.state().families.insert(member_id, family);
    }

    pub fn set_config(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state().config.insert(key.into(), value.into());
    }

    pub fn add_item_type(&self, item_type: ItemType) {
        self.state()
            .item_types
            .insert(item_type.code.clone(), item_type);
    }

    pub fn remove_item_type(&self, code: &str) {
        self.state().item_types.remove(code);
    }

    pub fn add_adjustment(&self, adjustment: ManualAdjustment) {
        self.state().adjustments.push(adjustment);
    }

    pub fn add_exemption(&self, exemption: Exemption) {
        self.state().exemptions.push(exemption);
    }

    pub fn set_discount_configuration(&self, configuration: DiscountConfiguration) {
        self.state().discount_configuration = Some(configuration);
    }

    pub fn add_rule(&self, rule: DiscountRule) {
        self.state().rules.push(rule);
    }

    /// Marks a receipt as paid, as the payment service would.
    pub fn mark_paid(&self, receipt_id: ReceiptId) {
        if let Some(receipt) = self.state().receipts.get_mut(&receipt_id) {
            receipt.status = ReceiptStatus::Paid;
        }
    }

    // === Fault injection ===

    /// Makes fee inserts for `member_id` fail.
    pub fn fail_fee_insert_for(&self, member_id: MemberId) {
        self.faults().fee_insert_members.insert(member_id);
    }

    /// Makes history appends fail.
    pub fn fail_history_writes(&self, fail: bool) {
        self.faults().history_writes = fail;
    }

    // === Inspection ===

    /// Committed fees, hydrated with receipt status, in creation order.
    pub fn fees(&self) -> Vec<Fee> {
        let state = self.state();
        let mut fees: Vec<Fee> = state.fees.values().map(|f| state.hydrate(f)).collect();
        sort_fees(&mut fees);
        fees
    }

    pub fn fee(&self, id: &FeeId) -> Option<Fee> {
        let state = self.state();
        state.fees.get(id).map(|f| state.hydrate(f))
    }

    pub fn receipt_amount(&self, id: &ReceiptId) -> Option<Money> {
        self.state().receipts.get(id).map(|r| r.amount)
    }

    pub fn receipt_count(&self) -> usize {
        self.state().receipts.len()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state().history.clone()
    }

    pub fn rule_applications(&self) -> Vec<RuleApplication> {
        self.state().applications.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.state().commits
    }
}

impl Default for InMemoryFeeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_fees(fees: &mut [Fee]) {
    fees.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// The item types the engine writes itself, without formulas.
pub fn default_item_types() -> Vec<ItemType> {
    [
        (BASE_FEE_CODE, "Base fee", ItemCategory::Base),
        (ACTIVITY_FEE_CODE, "Activity fee", ItemCategory::Activity),
        (MANUAL_ADJUSTMENT_CODE, "Manual adjustment", ItemCategory::Adjustment),
        (EXEMPTION_CODE, "Exemption", ItemCategory::Exemption),
        (AUTOMATIC_DISCOUNT_CODE, "Automatic discount", ItemCategory::Discount),
    ]
    .into_iter()
    .map(|(code, name, category)| ItemType {
        id: ItemTypeId::new(),
        code: code.to_string(),
        name: name.to_string(),
        category,
        formula: None,
        active: true,
    })
    .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Catalog ports
// ════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl MemberCatalog for InMemoryFeeStore {
    async fn find_member(&self, id: &MemberId) -> Result<Option<MemberProfile>, DomainError> {
        Ok(self.shared.lock_state()?.members.get(id).cloned())
    }

    async fn find_category(&self, id: &CategoryId) -> Result<Option<Category>, DomainError> {
        Ok(self.shared.lock_state()?.categories.get(id).cloned())
    }

    async fn members_needing_fee(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
    ) -> Result<Vec<MemberProfile>, DomainError> {
        let state = self.shared.lock_state()?;
        let billed: HashSet<MemberId> = state
            .fees
            .values()
            .filter(|f| f.period == period)
            .map(|f| f.member_id)
            .collect();

        let mut members: Vec<MemberProfile> = state
            .members
            .values()
            .filter(|m| {
                !billed.contains(&m.id)
                    && !state.inactive_members.contains(&m.id)
                    && scope.matches(&m.id, &m.category_id)
            })
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(members)
    }

    async fn family_discount(&self, member_id: &MemberId) -> Result<FamilyDiscount, DomainError> {
        Ok(self
            .shared
            .lock_state()?
            .families
            .get(member_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ActivityCatalog for InMemoryFeeStore {
    async fn enrollments_for(
        &self,
        member_id: &MemberId,
        _period: BillingPeriod,
    ) -> Result<Vec<ActivityEnrollment>, DomainError> {
        Ok(self
            .shared
            .lock_state()?
            .enrollments
            .get(member_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ConfigStore for InMemoryFeeStore {
    async fn get_by_key(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.shared.lock_state()?.config.get(key).cloned())
    }

    async fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>, DomainError> {
        Ok(self
            .shared
            .lock_state()?
            .config
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(prefix).map(|rest| (rest.to_string(), v.clone())))
            .collect())
    }
}

#[async_trait]
impl ItemTypeCatalog for InMemoryFeeStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<ItemType>, DomainError> {
        Ok(self.shared.lock_state()?.item_types.get(code).cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Reader ports
// ════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl AdjustmentReader for InMemoryFeeStore {
    async fn active_for_member(
        &self,
        member_id: &MemberId,
        at: NaiveDate,
    ) -> Result<Vec<ManualAdjustment>, DomainError> {
        Ok(self
            .shared
            .lock_state()?
            .adjustments
            .iter()
            .filter(|a| a.member_id == *member_id && a.is_active_at(at))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExemptionReader for InMemoryFeeStore {
    async fn in_effect_for_member(
        &self,
        member_id: &MemberId,
        at: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<Exemption>, DomainError> {
        Ok(self
            .shared
            .lock_state()?
            .exemptions
            .iter()
            .filter(|e| e.member_id == *member_id && e.is_in_effect(at, today))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DiscountRuleReader for InMemoryFeeStore {
    async fn configuration(&self) -> Result<DiscountConfiguration, DomainError> {
        Ok(self
            .shared
            .lock_state()?
            .discount_configuration
            .clone()
            .unwrap_or_default())
    }

    async fn active_rules(&self) -> Result<Vec<DiscountRule>, DomainError> {
        Ok(self
            .shared
            .lock_state()?
            .rules
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FeeReader for InMemoryFeeStore {
    async fn find_by_id(&self, id: &FeeId) -> Result<Option<Fee>, DomainError> {
        let state = self.shared.lock_state()?;
        Ok(state.fees.get(id).map(|f| state.hydrate(f)))
    }

    async fn find_in_scope(
        &self,
        period: BillingPeriod,
        scope: &FeeScope,
    ) -> Result<Vec<Fee>, DomainError> {
        let state = self.shared.lock_state()?;
        let mut fees: Vec<Fee> = state
            .fees
            .values()
            .filter(|f| f.period == period && scope.matches(&f.member_id, &f.category_id))
            .map(|f| state.hydrate(f))
            .collect();
        sort_fees(&mut fees);
        Ok(fees)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryFeeStore {
    async fn begin(&self) -> Result<Box<dyn FeeTransaction>, DomainError> {
        let working = self.shared.lock_state()?.clone();
        Ok(Box::new(InMemoryTransaction::new(
            Arc::clone(&self.shared),
            working,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ReceiptLedger;
    use std::collections::BTreeMap;

    fn category(code: &str) -> Category {
        Category {
            id: CategoryId::new(),
            code: code.to_string(),
            name: code.to_string(),
            base_amount: Money::from_units(100),
            active: true,
        }
    }

    fn member(name: &str, category: &Category) -> MemberProfile {
        MemberProfile {
            id: MemberId::new(),
            display_name: name.to_string(),
            category_id: category.id,
            category_code: category.code.clone(),
            joined_on: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            birth_date: None,
            attributes: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn members_needing_fee_respects_scope_and_sorts_by_name() {
        let store = InMemoryFeeStore::new();
        let active = category("ACTIVE");
        let junior = category("JUNIOR");
        store.add_category(active.clone());
        store.add_category(junior.clone());
        store.add_member(member("Zoe", &active));
        store.add_member(member("Ana", &active));
        store.add_member(member("Leo", &junior));

        let period = BillingPeriod::new(2024, 3).unwrap();
        let all = store.members_needing_fee(period, &FeeScope::all()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|m| m.display_name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Leo", "Zoe"]);

        let scoped = store
            .members_needing_fee(period, &FeeScope::for_categories(vec![junior.id]))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].display_name, "Leo");
    }

    #[tokio::test]
    async fn inactive_members_are_not_billed() {
        let store = InMemoryFeeStore::new();
        let active = category("ACTIVE");
        store.add_category(active.clone());
        let ana = member("Ana", &active);
        let leo = member("Leo", &active);
        store.add_member(ana.clone());
        store.add_member(leo.clone());
        store.deactivate_member(leo.id);

        let period = BillingPeriod::new(2024, 3).unwrap();
        let due = store.members_needing_fee(period, &FeeScope::all()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, ana.id);
        assert!(store.find_member(&leo.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn entries_with_prefix_strips_prefix() {
        let store = InMemoryFeeStore::new();
        store.set_config("seniority.5", "10");
        store.set_config("seniority.10", "20");
        store.set_config("other.5", "99");

        let entries = store.entries_with_prefix("seniority.").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("10").map(String::as_str), Some("20"));
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let store = InMemoryFeeStore::new();
        let period = BillingPeriod::new(2024, 3).unwrap();
        let member_id = MemberId::new();

        let mut tx = store.begin().await.unwrap();
        let receipt_id = tx.create_receipt(&member_id, period).await.unwrap();
        assert_eq!(store.receipt_count(), 0);

        tx.rollback().await.unwrap();
        assert_eq!(store.receipt_count(), 0);
        assert!(store.receipt_amount(&receipt_id).is_none());
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = InMemoryFeeStore::new();
        let period = BillingPeriod::new(2024, 3).unwrap();

        let mut tx = store.begin().await.unwrap();
        let receipt_id = tx.create_receipt(&MemberId::new(), period).await.unwrap();
        tx.update_receipt_amount(&receipt_id, Money::from_units(42))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.receipt_amount(&receipt_id), Some(Money::from_units(42)));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn default_item_types_cover_required_codes() {
        let store = InMemoryFeeStore::with_system_item_types();
        for code in crate::domain::fee::SystemItemTypes::REQUIRED_CODES {
            assert!(store.find_by_code(code).await.unwrap().is_some(), "{}", code);
        }
    }
}
