//! Conflict resolution among rules competing for the same item.

use super::ConflictMode;
use crate::domain::foundation::{Money, Percentage};

/// A qualifying rule with its computed percentage and target items.
///
/// Candidates must be passed in evaluation order (priority, then rule id).
#[derive(Debug, Clone)]
pub struct Candidate {
    pub rule_index: usize,
    pub mode: ConflictMode,
    pub percentage: Percentage,
    /// Indexes into the item amounts passed to [`resolve`].
    pub targets: Vec<usize>,
}

/// One discount to materialize for a (rule, item) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub rule_index: usize,
    pub item_index: usize,
    pub percentage: Percentage,
    pub amount: Money,
}

/// Resolves competing candidates item by item.
///
/// The mode of the highest-priority candidate touching an item governs that
/// item. Output is ordered by item, then by candidate order.
pub fn resolve(candidates: &[Candidate], item_amounts: &[Money]) -> Vec<Resolution> {
    let mut resolutions = Vec::new();

    for (item_index, amount) in item_amounts.iter().enumerate() {
        let competing: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.targets.contains(&item_index) && !c.percentage.is_zero())
            .collect();
        let Some(&leader) = competing.first() else {
            continue;
        };

        let winners: Vec<&Candidate> = match leader.mode {
            ConflictMode::FirstMatch => vec![leader],
            ConflictMode::HighestOnly => {
                let mut best = leader;
                for &c in &competing[1..] {
                    if c.percentage > best.percentage {
                        best = c;
                    }
                }
                vec![best]
            }
            ConflictMode::Stack => competing,
        };

        let mut remaining = *amount;
        for winner in winners {
            let discount = remaining.percentage(winner.percentage).min(remaining);
            remaining -= discount;
            resolutions.push(Resolution {
                rule_index: winner.rule_index,
                item_index,
                percentage: winner.percentage,
                amount: discount,
            });
        }
    }

    resolutions
}
