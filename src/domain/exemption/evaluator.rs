//! Exemption lookup and application.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Exemption, ExemptionKind};
use crate::domain::fee::{ItemType, LineItem};
use crate::domain::foundation::{ExemptionId, FeeId, MemberId, Money, Percentage};

/// The exemption chosen for a member and the ones passed over.
#[derive(Debug, Clone, Default)]
pub struct ExemptionSelection<'a> {
    pub selected: Option<&'a Exemption>,
    /// Other in-effect exemptions; a single one is expected.
    pub ignored: Vec<ExemptionId>,
}

/// An exemption as applied to a running amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemptionOutcome {
    pub exemption_id: ExemptionId,
    pub kind: ExemptionKind,
    pub percentage: Percentage,
    pub reason: String,
    /// Positive amount waived.
    pub amount: Money,
    pub running_after: Money,
}

impl ExemptionOutcome {
    pub fn to_item(&self, fee_id: FeeId, item_type: &ItemType) -> Option<LineItem> {
        if self.amount.is_zero() {
            return None;
        }
        Some(
            LineItem::automatic(fee_id, item_type, self.reason.clone(), -self.amount)
                .with_percentage(self.percentage)
                .with_metadata(serde_json::json!({
                    "exemption_id": self.exemption_id,
                    "kind": self.kind,
                })),
        )
    }
}

pub struct ExemptionEvaluator;

impl ExemptionEvaluator {
    /// Picks the in-effect exemption for `member_id` at `at`.
    ///
    /// When several qualify, the one starting latest wins (creation time,
    /// then id, break ties) and the rest are reported as ignored.
    pub fn select<'a>(
        candidates: &'a [Exemption],
        member_id: MemberId,
        at: NaiveDate,
        today: NaiveDate,
    ) -> ExemptionSelection<'a> {
        let mut in_effect: Vec<&Exemption> = candidates
            .iter()
            .filter(|e| e.member_id == member_id && e.is_in_effect(at, today))
            .collect();
        in_effect.sort_by(|a, b| {
            b.valid_from
                .cmp(&a.valid_from)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut iter = in_effect.into_iter();
        let selected = iter.next();
        ExemptionSelection {
            selected,
            ignored: iter.map(|e| e.id).collect(),
        }
    }

    /// Waives the exemption's percentage of `running`.
    pub fn apply(running: Money, exemption: &Exemption) -> ExemptionOutcome {
        let running = running.clamp_non_negative();
        let percentage = exemption.effective_percentage();
        let amount = if percentage == Percentage::HUNDRED {
            running
        } else {
            running.percentage(percentage).min(running)
        };
        ExemptionOutcome {
            exemption_id: exemption.id,
            kind: exemption.kind,
            percentage,
            reason: exemption.reason.clone(),
            amount,
            running_after: running - amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fee::ItemCategory;
    use crate::domain::foundation::{ItemTypeId, Timestamp};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vigente(member: MemberId, kind: ExemptionKind, pct: u8, from: NaiveDate) -> Exemption {
        let mut e = Exemption::request(
            member,
            kind,
            Percentage::from_whole(pct),
            "Scholarship",
            from,
            None,
            Timestamp::now(),
        )
        .unwrap();
        e.approve().unwrap();
        e.activate().unwrap();
        e
    }

    #[test]
    fn applies_percentage_of_running_amount() {
        let e = vigente(MemberId::new(), ExemptionKind::Partial, 50, date(2026, 1, 1));
        let outcome = ExemptionEvaluator::apply(Money::from_units(9000), &e);
        assert_eq!(outcome.amount, Money::from_units(4500));
        assert_eq!(outcome.running_after, Money::from_units(4500));
    }

    #[test]
    fn total_exemption_zeroes_the_fee() {
        let e = vigente(MemberId::new(), ExemptionKind::Total, 0, date(2026, 1, 1));
        let outcome = ExemptionEvaluator::apply(Money::new("1234.57".parse().unwrap()), &e);
        assert_eq!(outcome.running_after, Money::ZERO);
    }

    #[test]
    fn select_prefers_latest_start_and_reports_the_rest() {
        let m = MemberId::new();
        let older = vigente(m, ExemptionKind::Partial, 10, date(2026, 1, 1));
        let newer = vigente(m, ExemptionKind::Partial, 30, date(2026, 2, 1));
        let foreign = vigente(MemberId::new(), ExemptionKind::Partial, 90, date(2026, 2, 1));
        let all = vec![older.clone(), newer.clone(), foreign];

        let selection = ExemptionEvaluator::select(&all, m, date(2026, 3, 1), date(2026, 3, 1));
        assert_eq!(selection.selected.map(|e| e.id), Some(newer.id));
        assert_eq!(selection.ignored, vec![older.id]);
    }

    #[test]
    fn select_returns_none_without_candidates() {
        let selection =
            ExemptionEvaluator::select(&[], MemberId::new(), date(2026, 3, 1), date(2026, 3, 1));
        assert!(selection.selected.is_none());
        assert!(selection.ignored.is_empty());
    }

    #[test]
    fn item_is_negative_with_percentage() {
        let e = vigente(MemberId::new(), ExemptionKind::Partial, 50, date(2026, 1, 1));
        let outcome = ExemptionEvaluator::apply(Money::from_units(9000), &e);
        let item_type = ItemType {
            id: ItemTypeId::new(),
            code: "EXEMPTION".to_string(),
            name: "Exemption".to_string(),
            category: ItemCategory::Exemption,
            formula: None,
            active: true,
        };
        let item = outcome.to_item(FeeId::new(), &item_type).unwrap();
        assert_eq!(item.amount, Money::from_units(-4500));
        assert_eq!(item.percentage, Some(Percentage::from_whole(50)));
    }

    #[test]
    fn zero_running_amount_yields_no_item() {
        let e = vigente(MemberId::new(), ExemptionKind::Partial, 50, date(2026, 1, 1));
        let outcome = ExemptionEvaluator::apply(Money::ZERO, &e);
        let item_type = ItemType {
            id: ItemTypeId::new(),
            code: "EXEMPTION".to_string(),
            name: "Exemption".to_string(),
            category: ItemCategory::Exemption,
            formula: None,
            active: true,
        };
        assert!(outcome.to_item(FeeId::new(), &item_type).is_none());
    }
}
