//! Fee module.
//!
//! The fee aggregate, its line items and item types, and the pure composer
//! that turns catalog data into base and activity charges.

mod composer;
mod errors;
#[allow(clippy::module_inception)]
mod fee;
mod item_type;
mod line_item;
mod snapshot;
mod status;

pub use composer::{ActivityCharge, BaseAmountSource, FeeComposer, FeeComposition};
pub use errors::FeeError;
pub use fee::Fee;
pub use item_type::{
    FormulaInput, ItemCategory, ItemFormula, ItemType, SystemItemTypes, ACTIVITY_FEE_CODE,
    AUTOMATIC_DISCOUNT_CODE, BASE_FEE_CODE, EXEMPTION_CODE, MANUAL_ADJUSTMENT_CODE,
};
pub use line_item::LineItem;
pub use snapshot::{FeeDeltas, FeeSnapshot};
pub use status::{FeeStatus, ReceiptStatus};
