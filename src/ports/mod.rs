//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the fee engine and the outside world. Adapters implement these ports.
//!
//! ## Catalog Ports (read-only, owned elsewhere)
//!
//! - `MemberCatalog` - Members, categories and family links
//! - `ActivityCatalog` - Activity enrollments and their prices
//! - `ItemTypeCatalog` - Line item types
//! - `ConfigStore` - Operator-maintained key/value settings
//!
//! ## Reader Ports
//!
//! - `AdjustmentReader` - Staff-entered adjustments
//! - `ExemptionReader` - Exemptions in effect
//! - `DiscountRuleReader` - Discount configuration and rules
//! - `FeeReader` - Persisted fees
//!
//! ## Write Ports
//!
//! - `UnitOfWork` / `FeeTransaction` - Transactional receipt, fee and history writes
//!
//! ## Infrastructure Ports
//!
//! - `Clock` - Current time

mod activity_catalog;
mod adjustment_reader;
mod clock;
mod config_store;
mod discount_rule_reader;
mod exemption_reader;
mod fee_reader;
mod item_type_catalog;
mod member_catalog;
mod unit_of_work;

pub use activity_catalog::ActivityCatalog;
pub use adjustment_reader::AdjustmentReader;
pub use clock::Clock;
pub use config_store::ConfigStore;
pub use discount_rule_reader::DiscountRuleReader;
pub use exemption_reader::ExemptionReader;
pub use fee_reader::{FeeReader, FeeScope};
pub use item_type_catalog::ItemTypeCatalog;
pub use member_catalog::MemberCatalog;
pub use unit_of_work::{FeeTransaction, FeeWriter, HistoryRecorder, ReceiptLedger, UnitOfWork};
