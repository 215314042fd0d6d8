//! Family-relationship discount eligibility.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MemberId, Percentage};

/// A relationship to another member that carries a discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyLink {
    pub relative_id: MemberId,
    /// Relationship label as stored in the catalog (e.g. "spouse", "child").
    pub relationship: String,
    pub discount: Percentage,
}

/// Family discount eligibility for one member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyDiscount {
    pub links: Vec<FamilyLink>,
}

impl FamilyDiscount {
    pub fn is_eligible(&self) -> bool {
        self.links.iter().any(|l| !l.discount.is_zero())
    }

    /// Maximum of the applicable relationship discounts.
    pub fn max_percentage(&self) -> Percentage {
        self.links
            .iter()
            .map(|l| l.discount)
            .max()
            .unwrap_or(Percentage::ZERO)
    }

    /// Members in the household including the member itself.
    pub fn household_size(&self) -> u32 {
        self.links.len() as u32 + 1
    }
}
