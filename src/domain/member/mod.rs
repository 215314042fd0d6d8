//! Member module.
//!
//! Read-only views of members, categories, activity enrollments and family
//! links. These are owned by external catalogs and only consumed here.

mod enrollment;
mod family;
mod profile;

pub use enrollment::{ActivityEnrollment, ActivityStatus};
pub use family::{FamilyDiscount, FamilyLink};
pub use profile::{Category, MemberProfile};
