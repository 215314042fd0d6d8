//! Strongly-typed identifier value objects.
//!
//! Every aggregate and catalog entry is keyed by a UUID wrapped in its own
//! newtype so that a `FeeId` can never be passed where a `MemberId` is due.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Declares a UUID-backed identifier with the standard constructor,
/// accessor, `Display` and `FromStr` implementations.
macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a member of the organization.
    MemberId
);
uuid_identifier!(
    /// Unique identifier for a membership category.
    CategoryId
);
uuid_identifier!(
    /// Unique identifier for a monthly fee.
    FeeId
);
uuid_identifier!(
    /// Unique identifier for the receipt that bills a fee.
    ReceiptId
);
uuid_identifier!(
    /// Unique identifier for a fee line item.
    LineItemId
);
uuid_identifier!(
    /// Unique identifier for a line item type in the catalog.
    ItemTypeId
);
uuid_identifier!(
    /// Unique identifier for an activity.
    ActivityId
);
uuid_identifier!(
    /// Unique identifier for a staff-entered manual adjustment.
    AdjustmentId
);
uuid_identifier!(
    /// Unique identifier for a dues exemption.
    ExemptionId
);
uuid_identifier!(
    /// Unique identifier for an automatic discount rule.
    RuleId
);
uuid_identifier!(
    /// Unique identifier for a rule application audit row.
    RuleApplicationId
);
uuid_identifier!(
    /// Unique identifier for a fee history entry.
    HistoryEntryId
);
